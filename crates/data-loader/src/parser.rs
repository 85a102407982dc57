//! Parser for the ratings CSV file.
//!
//! Expected format: a header line naming at least the four required columns
//! `user_id,product_id,rating,timestamp`, followed by one record per line.
//! Columns are located by header name, so extra columns and arbitrary column
//! order are tolerated.
//!
//! Rows with missing required fields or unparseable numeric values are
//! skipped; schema problems (missing file, missing column) abort the load.

use crate::error::{DataLoadError, Result};
use crate::types::RatingRecord;
use rayon::prelude::*;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Required header columns, in no particular order.
const REQUIRED_COLUMNS: [&str; 4] = ["user_id", "product_id", "rating", "timestamp"];

/// Column positions resolved from the header line.
struct ColumnMap {
    user_id: usize,
    product_id: usize,
    rating: usize,
    timestamp: usize,
}

impl ColumnMap {
    fn from_header(header: &str, path: &Path) -> Result<Self> {
        let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();
        let position = |name: &str| -> Result<usize> {
            columns.iter().position(|c| *c == name).ok_or_else(|| {
                DataLoadError::MissingColumn {
                    column: name.to_string(),
                    path: path.display().to_string(),
                }
            })
        };

        Ok(Self {
            user_id: position(REQUIRED_COLUMNS[0])?,
            product_id: position(REQUIRED_COLUMNS[1])?,
            rating: position(REQUIRED_COLUMNS[2])?,
            timestamp: position(REQUIRED_COLUMNS[3])?,
        })
    }
}

/// Load all rating records from a CSV file.
///
/// Returns the parseable records in file order. Rows that cannot be parsed
/// are dropped here; rows that parse but carry invalid values (out-of-range
/// rating, non-positive timestamp) are kept for the preparation pipeline to
/// repair.
pub fn load_ratings(path: &Path) -> Result<Vec<RatingRecord>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;

    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| DataLoadError::EmptyFile {
        path: path.display().to_string(),
    })?;
    let columns = ColumnMap::from_header(header, path)?;

    // Parse record lines in parallel; collect preserves file order.
    let body: Vec<&str> = lines.collect();
    let records: Vec<RatingRecord> = body
        .par_iter()
        .filter_map(|line| parse_line(line, &columns))
        .collect();

    Ok(records)
}

/// Parse one record line; None for blank or malformed rows.
fn parse_line(line: &str, columns: &ColumnMap) -> Option<RatingRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
    let field = |idx: usize| -> Option<&str> {
        match fields.get(idx) {
            Some(v) if !v.is_empty() => Some(*v),
            _ => None,
        }
    };

    let user_id = field(columns.user_id)?;
    let product_id = field(columns.product_id)?;
    let rating: f64 = field(columns.rating)?.parse().ok()?;
    let timestamp: i64 = field(columns.timestamp)?.parse().ok()?;

    Some(RatingRecord::new(user_id, product_id, rating, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ratings-parser-test-{}-{}.csv",
            std::process::id(),
            content.len()
        ));
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_csv() {
        let path = write_temp(
            "user_id,product_id,rating,timestamp\n\
             1,101,5,2\n\
             2,101,-1,0\n",
        );

        let records = load_ratings(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_id, "1");
        assert_eq!(records[0].rating, 5.0);
        // Invalid values survive the load; the preparer repairs them.
        assert_eq!(records[1].rating, -1.0);
        assert_eq!(records[1].timestamp, 0);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_column_order_is_flexible() {
        let path = write_temp(
            "timestamp,rating,product_id,user_id\n\
             100,4.5,p9,u7\n",
        );

        let records = load_ratings(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "u7");
        assert_eq!(records[0].product_id, "p9");
        assert_eq!(records[0].rating, 4.5);
        assert_eq!(records[0].timestamp, 100);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let path = write_temp(
            "user_id,product_id,rating,timestamp\n\
             u1,p1,4.0,100\n\
             ,p2,3.0,100\n\
             u2,,3.0,100\n\
             u3,p3,not-a-number,100\n\
             u4,p4,2.0,not-a-number\n\
             \n\
             u5,p5,1.0,50\n",
        );

        let records = load_ratings(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_id, "u1");
        assert_eq!(records[1].user_id, "u5");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = load_ratings(Path::new("definitely/missing.csv"));
        assert!(matches!(result, Err(DataLoadError::FileNotFound { .. })));
    }

    #[test]
    fn test_missing_column() {
        let path = write_temp("user_id,product_id,rating\nu1,p1,4.0\n");

        let result = load_ratings(&path);
        match result {
            Err(DataLoadError::MissingColumn { column, .. }) => {
                assert_eq!(column, "timestamp")
            }
            other => panic!("expected MissingColumn, got {:?}", other.map(|r| r.len())),
        }

        std::fs::remove_file(path).ok();
    }
}
