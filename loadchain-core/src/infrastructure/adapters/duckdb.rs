// loadchain-core/src/infrastructure/adapters/duckdb.rs
//
// Local engines for development and tests: a DuckDB file as the source database
// and a DuckDB file as the warehouse.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use duckdb::types::{TimeUnit, Value};
use duckdb::{AccessMode, Config, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::domain::settings::{ConnectionString, WriteMode};
use crate::domain::table::{ColumnSpec, FieldType, TableRef};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::sql::{quote_ident, quote_literal, quote_qualified, quote_table_ref};
use crate::ports::source::{SourceDatabase, TableSnapshot};
use crate::ports::warehouse::{LoadSummary, ProvisionOutcome, Warehouse};

const URI_PREFIX: &str = "duckdb://";

/// `duckdb:///tmp/x.duckdb` and `/tmp/x.duckdb` both name the same file.
pub fn database_path(uri: &str) -> &str {
    uri.strip_prefix(URI_PREFIX).unwrap_or(uri)
}

fn open(path: &str, access: AccessMode) -> Result<Connection, InfrastructureError> {
    let config = Config::default().access_mode(access)?;
    let conn = if path == ":memory:" {
        Connection::open_in_memory_with_flags(config)?
    } else {
        Connection::open_with_flags(path, config)?
    };
    Ok(conn)
}

// --- SOURCE ---

/// Reads tables out of a DuckDB file. A connection is opened per read and dropped before returning.
#[derive(Debug, Default, Clone)]
pub struct DuckDbSource;

impl DuckDbSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceDatabase for DuckDbSource {
    #[instrument(skip(self), fields(engine = "duckdb"))]
    async fn read_table(
        &self,
        connection: &ConnectionString,
        table_name: &str,
    ) -> Result<TableSnapshot, InfrastructureError> {
        // Read-only so concurrent chains can share the source file.
        let conn = open(database_path(connection.expose()), AccessMode::ReadOnly)?;
        let query = format!("SELECT * FROM {}", quote_qualified(table_name));
        debug!(%query, "Reading source table");

        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query([])?;
        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut snapshot = TableSnapshot {
            columns,
            rows: Vec::new(),
        };

        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(snapshot.columns.len());
            for (idx, column) in snapshot.columns.iter().enumerate() {
                let value: Value = row.get(idx)?;
                record.push(render_value(column, value)?);
            }
            snapshot.rows.push(record);
        }

        info!(rows = snapshot.rows.len(), "Source table read");
        Ok(snapshot)
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn render_value(column: &str, value: Value) -> Result<Option<String>, InfrastructureError> {
    let out_of_range = || InfrastructureError::Decode {
        column: column.to_string(),
        message: "temporal value out of range".to_string(),
    };

    let text = match value {
        Value::Null => return Ok(None),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::HugeInt(v) => v.to_string(),
        Value::UTinyInt(v) => v.to_string(),
        Value::USmallInt(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::UBigInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Text(s) | Value::Enum(s) => s,
        Value::Blob(bytes) => BASE64.encode(bytes),
        Value::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .ok_or_else(out_of_range)?
            .format("%Y-%m-%d")
            .to_string(),
        Value::Timestamp(unit, v) => chrono::DateTime::from_timestamp_micros(to_micros(unit, v))
            .ok_or_else(out_of_range)?
            .format("%Y-%m-%d %H:%M:%S%.f")
            .to_string(),
        Value::Time64(unit, v) => {
            let micros = to_micros(unit, v);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).map_err(|_| out_of_range())?;
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000)
                .map_err(|_| out_of_range())?;
            chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .ok_or_else(out_of_range)?
                .format("%H:%M:%S%.f")
                .to_string()
        }
        other => {
            return Err(InfrastructureError::Decode {
                column: column.to_string(),
                message: format!("no CSV rendering for {:?}", other),
            });
        }
    };
    Ok(Some(text))
}

// --- WAREHOUSE ---

/// DuckDB stand-in for BigQuery. `dataset` maps to a schema, the project part is ignored.
pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbWarehouse {
    /// Accepts `duckdb://path`, a plain path, or `:memory:`.
    pub fn new(uri: &str) -> Result<Self, InfrastructureError> {
        let conn = open(database_path(uri), AccessMode::Automatic)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned")))
    }

    /// Column names of `destination` in ordinal order. Empty when the table does not exist.
    pub fn existing_columns(&self, destination: &TableRef) -> Result<Vec<String>, InfrastructureError> {
        let conn = self.lock()?;
        existing_columns(&conn, destination)
    }

    /// Number of rows currently in `destination`.
    pub fn row_count(&self, destination: &TableRef) -> Result<u64, InfrastructureError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_table_ref(destination)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn existing_columns(
    conn: &Connection,
    destination: &TableRef,
) -> Result<Vec<String>, InfrastructureError> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
    )?;
    let names = stmt
        .query_map(
            duckdb::params![destination.dataset.as_str(), destination.table.as_str()],
            |row| row.get::<_, String>(0),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// BigQuery type token to the closest DuckDB column type.
pub fn duckdb_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String | FieldType::Geography | FieldType::Json => "VARCHAR",
        FieldType::Bytes => "BLOB",
        FieldType::Integer | FieldType::Int64 => "BIGINT",
        FieldType::Float | FieldType::Float64 => "DOUBLE",
        FieldType::Numeric | FieldType::BigNumeric => "DECIMAL(38, 9)",
        FieldType::Boolean | FieldType::Bool => "BOOLEAN",
        FieldType::Timestamp => "TIMESTAMPTZ",
        FieldType::Date => "DATE",
        FieldType::Time => "TIME",
        FieldType::DateTime => "TIMESTAMP",
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    #[instrument(skip(self, schema), fields(engine = "duckdb", destination = %destination))]
    async fn ensure_table(
        &self,
        destination: &TableRef,
        schema: &[ColumnSpec],
    ) -> Result<ProvisionOutcome, InfrastructureError> {
        let conn = self.lock()?;

        let existing = existing_columns(&conn, destination)?;
        if !existing.is_empty() {
            let declared: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
            if !existing.iter().map(String::as_str).eq(declared.iter().copied()) {
                warn!(
                    existing = ?existing,
                    declared = ?declared,
                    "Destination exists with different columns, leaving it untouched"
                );
            }
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        let columns = schema
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), duckdb_type(c.field_type)))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}; CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(&destination.dataset),
            quote_table_ref(destination),
            columns
        ))?;

        info!("Destination table created");
        Ok(ProvisionOutcome::Created)
    }

    #[instrument(skip(self, schema), fields(engine = "duckdb", destination = %destination))]
    async fn load_csv(
        &self,
        object_uri: &str,
        destination: &TableRef,
        schema: &[ColumnSpec],
        write_mode: WriteMode,
    ) -> Result<LoadSummary, InfrastructureError> {
        let path = object_uri
            .strip_prefix("file://")
            .ok_or_else(|| InfrastructureError::UnsupportedUri {
                uri: object_uri.to_string(),
                expected: "file://",
            })?;

        let target = quote_table_ref(destination);
        let column_list = schema
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        // BYTES are staged as base64 text, the BigQuery CSV encoding.
        let column_types = schema
            .iter()
            .map(|c| {
                let csv_type = match c.field_type {
                    FieldType::Bytes => "VARCHAR",
                    other => duckdb_type(other),
                };
                format!("{}: {}", quote_literal(&c.name), quote_literal(csv_type))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let projection = schema
            .iter()
            .map(|c| match c.field_type {
                FieldType::Bytes => format!("from_base64({})", quote_ident(&c.name)),
                _ => quote_ident(&c.name),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if write_mode == WriteMode::Truncate {
            tx.execute(&format!("DELETE FROM {}", target), [])?;
        }
        let inserted = tx.execute(
            &format!(
                "INSERT INTO {} ({}) SELECT {} FROM read_csv({}, header = true, delim = ',', quote = '\"', escape = '\"', columns = {{{}}})",
                target,
                column_list,
                projection,
                quote_literal(path),
                column_types
            ),
            [],
        )?;
        tx.commit()?;

        info!(rows = inserted, "CSV loaded");
        Ok(LoadSummary {
            rows_loaded: Some(inserted as u64),
        })
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}
