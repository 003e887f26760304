// loadchain-core/src/infrastructure/adapters/postgres.rs

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sqlx::postgres::{PgConnection, PgRow, PgStatement};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, Connection, Decode, Executor, Postgres, Row, Statement, Type, TypeInfo};
use tracing::{debug, info, instrument, warn};

use crate::domain::settings::ConnectionString;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::sql::{quote_folded, quote_ident};
use crate::ports::source::{SourceDatabase, TableSnapshot};

/// Production source: one short-lived connection per table read.
#[derive(Debug, Default, Clone)]
pub struct PostgresSource;

impl PostgresSource {
    pub fn new() -> Self {
        Self
    }
}

/// Types `render` decodes from the binary protocol. Every other column is cast to
/// text on the server, which is the only place that knows how to print it.
const DECODED_TYPES: &[&str] = &[
    "BOOL", "INT2", "INT4", "INT8", "FLOAT4", "FLOAT8", "NUMERIC", "DATE", "TIME",
    "TIMESTAMP", "TIMESTAMPTZ", "UUID", "JSON", "JSONB", "BYTEA", "TEXT", "VARCHAR",
    "BPCHAR", "NAME",
];

/// Unquoted names fold to lower case in Postgres; folding before quoting keeps that.
pub(crate) fn select_all(table_name: &str) -> String {
    format!("SELECT * FROM {}", quote_folded(table_name))
}

/// Same columns as `SELECT *`, with `::text` on the ones `render` cannot decode.
pub(crate) fn select_as_text(table_name: &str, columns: &[(String, String)]) -> String {
    let projection = columns
        .iter()
        .map(|(name, type_name)| {
            let ident = quote_ident(name);
            if DECODED_TYPES.contains(&type_name.as_str()) {
                ident
            } else {
                format!("{}::text AS {}", ident, ident)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", projection, quote_folded(table_name))
}

#[async_trait]
impl SourceDatabase for PostgresSource {
    #[instrument(skip(self), fields(engine = "postgres"))]
    async fn read_table(
        &self,
        connection: &ConnectionString,
        table_name: &str,
    ) -> Result<TableSnapshot, InfrastructureError> {
        let mut conn = PgConnection::connect(connection.expose()).await?;

        let result = read_all(&mut conn, table_name).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Closing the source connection failed");
        }

        let snapshot = result?;
        info!(rows = snapshot.rows.len(), "Source table read");
        Ok(snapshot)
    }

    fn engine_name(&self) -> &str {
        "postgres"
    }
}

fn describe(stmt: &PgStatement<'_>) -> Vec<(String, String)> {
    stmt.columns()
        .iter()
        .map(|c| (c.name().to_string(), c.type_info().name().to_string()))
        .collect()
}

async fn read_all(conn: &mut PgConnection, table_name: &str) -> Result<TableSnapshot, InfrastructureError> {
    // Prepared first so headers exist even for an empty table.
    let star_query = select_all(table_name);
    let source_columns = describe(&(&mut *conn).prepare(&star_query).await?);

    let query = if source_columns.is_empty() {
        star_query
    } else {
        select_as_text(table_name, &source_columns)
    };
    debug!(%query, "Reading source table");

    let stmt = (&mut *conn).prepare(&query).await?;
    let columns = describe(&stmt);
    let rows = stmt.query().fetch_all(&mut *conn).await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut record = Vec::with_capacity(columns.len());
        for (idx, (name, type_name)) in columns.iter().enumerate() {
            record.push(render(row, idx, type_name).map_err(|e| InfrastructureError::Decode {
                column: name.clone(),
                message: e.to_string(),
            })?);
        }
        records.push(record);
    }

    Ok(TableSnapshot {
        columns: columns.into_iter().map(|(name, _)| name).collect(),
        rows: records,
    })
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn render(row: &PgRow, idx: usize, type_name: &str) -> Result<Option<String>, sqlx::Error> {
    let text = match type_name {
        "BOOL" => get::<bool>(row, idx)?.map(|v| v.to_string()),
        "INT2" => get::<i16>(row, idx)?.map(|v| v.to_string()),
        "INT4" => get::<i32>(row, idx)?.map(|v| v.to_string()),
        "INT8" => get::<i64>(row, idx)?.map(|v| v.to_string()),
        "FLOAT4" => get::<f32>(row, idx)?.map(|v| v.to_string()),
        "FLOAT8" => get::<f64>(row, idx)?.map(|v| v.to_string()),
        "NUMERIC" => get::<BigDecimal>(row, idx)?.map(|v| v.to_string()),
        "DATE" => get::<NaiveDate>(row, idx)?.map(|v| v.format("%Y-%m-%d").to_string()),
        "TIME" => get::<NaiveTime>(row, idx)?.map(|v| v.format("%H:%M:%S%.f").to_string()),
        "TIMESTAMP" => get::<NaiveDateTime>(row, idx)?
            .map(|v| v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx)?
            .map(|v| v.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()),
        "UUID" => get::<Uuid>(row, idx)?.map(|v| v.hyphenated().to_string()),
        "JSON" | "JSONB" => get::<serde_json::Value>(row, idx)?.map(|v| v.to_string()),
        "BYTEA" => get::<Vec<u8>>(row, idx)?.map(|v| BASE64.encode(v)),
        // Everything else arrives as `::text`; a mismatch is a decode error, never raw bytes.
        _ => get::<String>(row, idx)?,
    };
    Ok(text)
}
