// loadchain-core/src/infrastructure/staging.rs
//
// CSV staging files: header record first, then one record per row.

use csv::{QuoteStyle, WriterBuilder};
use std::path::Path;

use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write_with;
use crate::ports::source::TableSnapshot;

/// Writes the snapshot to `path`, replacing any previous file. NULL becomes an empty field.
pub fn write_snapshot(path: &Path, snapshot: &TableSnapshot) -> Result<(), InfrastructureError> {
    atomic_write_with(path, |file| {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file);

        writer.write_record(&snapshot.columns)?;
        for row in &snapshot.rows {
            writer.write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_header_then_rows_with_quoting() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data/orders_data.csv");
        let snapshot = TableSnapshot {
            columns: vec!["id".into(), "note".into()],
            rows: vec![
                vec![Some("1".into()), Some("plain".into())],
                vec![Some("2".into()), Some("has, comma \"quoted\"".into())],
                vec![Some("3".into()), None],
            ],
        };

        write_snapshot(&path, &snapshot)?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "id,note\n1,plain\n2,\"has, comma \"\"quoted\"\"\"\n3,\n"
        );
        Ok(())
    }

    #[test]
    fn test_empty_table_writes_header_only() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty_data.csv");
        let snapshot = TableSnapshot {
            columns: vec!["id".into(), "amount".into()],
            rows: vec![],
        };

        write_snapshot(&path, &snapshot)?;

        assert_eq!(std::fs::read_to_string(&path)?, "id,amount\n");
        Ok(())
    }

    #[test]
    fn test_ragged_row_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad_data.csv");
        let snapshot = TableSnapshot {
            columns: vec!["id".into(), "amount".into()],
            rows: vec![vec![Some("1".into())]],
        };

        assert!(matches!(
            write_snapshot(&path, &snapshot),
            Err(InfrastructureError::Csv(_))
        ));
        assert!(!path.exists());
        Ok(())
    }
}
