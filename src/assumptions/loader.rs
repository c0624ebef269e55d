//! CSV-based mortality table loader
//!
//! Table files have a header row and three columns: `age,female,male`.
//! Every age from 0 to the last age present must appear exactly once.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::mortality::is_valid_rate;
use crate::error::{EngineResult, ValuationError};

/// Load (female, male) annual rates indexed by age from a CSV file
pub fn load_table_rates(code: &str, path: &Path) -> EngineResult<(Vec<f64>, Vec<f64>)> {
    let file = File::open(path)?;
    load_table_rates_from_reader(code, file)
}

/// Load (female, male) annual rates from any CSV reader
pub fn load_table_rates_from_reader<R: Read>(code: &str, reader: R) -> EngineResult<(Vec<f64>, Vec<f64>)> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows: Vec<(usize, f64, f64)> = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        let parse = |idx: usize| -> EngineResult<f64> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>().map_err(|_| ValuationError::MalformedTable {
                code: code.to_string(),
                reason: format!("cannot parse '{}' in column {}", raw, idx),
            })
        };

        let age = parse(0)?;
        if age < 0.0 || age.fract() != 0.0 {
            return Err(ValuationError::MalformedTable {
                code: code.to_string(),
                reason: format!("age {} is not a whole number", age),
            });
        }
        rows.push((age as usize, parse(1)?, parse(2)?));
    }

    if rows.is_empty() {
        return Err(ValuationError::MalformedTable {
            code: code.to_string(),
            reason: "no rows".to_string(),
        });
    }

    let last_age = rows.iter().map(|r| r.0).max().unwrap_or(0);
    let mut female = vec![f64::NAN; last_age + 1];
    let mut male = vec![f64::NAN; last_age + 1];
    let mut seen = vec![false; last_age + 1];

    for (age, f, m) in rows {
        if seen[age] {
            return Err(ValuationError::MalformedTable {
                code: code.to_string(),
                reason: format!("age {} appears twice", age),
            });
        }
        seen[age] = true;
        female[age] = f;
        male[age] = m;
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(ValuationError::MalformedTable {
            code: code.to_string(),
            reason: format!("age {} is missing", missing),
        });
    }

    let out_of_range = female
        .iter()
        .chain(male.iter())
        .filter(|q| !is_valid_rate(**q))
        .count();
    if out_of_range > 0 {
        log::warn!(
            "Table {} has {} rates outside [0, 1]; projections treat them as zero mortality",
            code,
            out_of_range
        );
    }

    Ok((female, male))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_table_from_csv() {
        let data = "age,female,male\n0,0.001,0.002\n1,0.0005,0.0007\n2,1.0,1.0\n";
        let (female, male) = load_table_rates_from_reader("TINY", data.as_bytes()).unwrap();

        assert_eq!(female.len(), 3);
        assert_eq!(male[1], 0.0007);
        assert_eq!(female[2], 1.0);
    }

    #[test]
    fn test_rows_may_be_unordered() {
        let data = "age,female,male\n1,0.2,0.3\n0,0.1,0.15\n";
        let (female, _) = load_table_rates_from_reader("SHUFFLED", data.as_bytes()).unwrap();
        assert_eq!(female, vec![0.1, 0.2]);
    }

    #[test]
    fn test_missing_age_is_rejected() {
        let data = "age,female,male\n0,0.1,0.1\n2,0.2,0.2\n";
        let err = load_table_rates_from_reader("GAP", data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("age 1 is missing"));
    }

    #[test]
    fn test_unparseable_rate_is_rejected() {
        let data = "age,female,male\n0,abc,0.1\n";
        let err = load_table_rates_from_reader("BAD", data.as_bytes()).unwrap_err();
        assert!(matches!(err, ValuationError::MalformedTable { .. }));
    }

    #[test]
    fn test_out_of_range_rates_are_kept() {
        let data = "age,female,male\n0,1.5,0.1\n";
        let (female, _) = load_table_rates_from_reader("ODD", data.as_bytes()).unwrap();
        assert_eq!(female[0], 1.5);
    }
}
