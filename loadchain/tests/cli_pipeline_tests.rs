use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway root with a DuckDB source file and a tables config.
/// Runs use the local store and a DuckDB warehouse, so nothing leaves the machine.
struct LoadchainTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl LoadchainTestEnv {
    fn new(config: &str) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("etl");
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("config.json"), config)?;

        let source = duckdb::Connection::open(root.join("source.duckdb"))?;
        source.execute_batch(
            "CREATE TABLE orders (id INTEGER, customer VARCHAR, amount DOUBLE);
             INSERT INTO orders VALUES (1, 'ada', 12.5), (2, 'grace', 40.0), (3, NULL, 7.25);
             CREATE TABLE refunds (id INTEGER, amount DOUBLE);",
        )?;

        Ok(Self { _tmp: tmp, root })
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn loadchain(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("loadchain"));
        cmd.current_dir(&self.root)
            .env_remove("RUST_LOG")
            .env("LOADCHAIN_HOME", &self.root)
            .env(
                "PG_CONNECTION",
                format!("duckdb://{}", self.path("source.duckdb").display()),
            )
            .env("GCS_BUCKET", "bucket")
            .env("LOADCHAIN_STORE", "local")
            .env(
                "LOADCHAIN_WAREHOUSE",
                format!("duckdb://{}", self.path("warehouse.duckdb").display()),
            )
            .env("LOADCHAIN_RETRY_DELAY_SECS", "0");
        cmd
    }
}

const TWO_TABLES: &str = r#"{
  "tables": [
    {
      "table_name": "orders",
      "schema": [
        {"name": "id", "type": "INTEGER"},
        {"name": "customer", "type": "STRING"},
        {"name": "amount", "type": "FLOAT"}
      ],
      "bigquery_table": "analytics.orders"
    },
    {
      "table_name": "refunds",
      "schema": [
        {"name": "id", "type": "INTEGER"},
        {"name": "amount", "type": "FLOAT"}
      ],
      "bigquery_table": "analytics.refunds"
    }
  ]
}"#;

fn warehouse_rows(path: &Path, table: &str) -> Result<Vec<(i32, Option<String>, f64)>> {
    let conn = duckdb::Connection::open(path)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, customer, amount FROM \"analytics\".\"{}\" ORDER BY id",
        table
    ))?;
    let rows = stmt
        .query_map([], |row| -> duckdb::Result<(i32, Option<String>, f64)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[test]
fn test_run_loads_every_table_end_to_end() -> Result<()> {
    let env = LoadchainTestEnv::new(TWO_TABLES)?;

    env.loadchain()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("load_data_from_gcs_to_bq_table_orders"))
        .stdout(predicate::str::contains("SUCCESS"));

    // Staging files and uploaded objects follow the naming conventions
    assert!(env.path("data/orders_data.csv").exists());
    assert!(env.path("data/refunds_data.csv").exists());
    assert!(env.path("bucket/orders_data.csv").exists());
    assert_eq!(
        std::fs::read_to_string(env.path("data/refunds_data.csv"))?.trim_end(),
        "id,amount"
    );

    let rows = warehouse_rows(&env.path("warehouse.duckdb"), "orders")?;
    assert_eq!(
        rows,
        vec![
            (1, Some("ada".to_string()), 12.5),
            (2, Some("grace".to_string()), 40.0),
            (3, None, 7.25),
        ]
    );

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.path("target/run_results.json"))?)?;
    assert_eq!(report["graph"], "dynamic_dag");
    assert_eq!(report["success"], true);
    assert_eq!(report["units"].as_array().map(Vec::len), Some(8));
    Ok(())
}

#[test]
fn test_rerun_in_truncate_mode_keeps_the_same_rows() -> Result<()> {
    let env = LoadchainTestEnv::new(TWO_TABLES)?;

    env.loadchain().args(["run", "-t", "orders"]).assert().success();
    env.loadchain()
        .args(["run", "-t", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table already exists"));

    assert_eq!(warehouse_rows(&env.path("warehouse.duckdb"), "orders")?.len(), 3);
    assert!(!env.path("data/refunds_data.csv").exists());
    Ok(())
}

#[test]
fn test_missing_source_table_fails_only_its_chain() -> Result<()> {
    let config = TWO_TABLES.replace("\"refunds\"", "\"ghost\"");
    let env = LoadchainTestEnv::new(&config)?;

    env.loadchain()
        .args(["run", "--retries", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("FAILURE"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.path("target/run_results.json"))?)?;
    let units = report["units"].as_array().cloned().unwrap_or_default();
    let status = |id: &str| {
        units
            .iter()
            .find(|u| u["unit"] == id)
            .map(|u| (u["status"].clone(), u["attempts"].clone()))
    };

    assert_eq!(
        status("extract_data_to_csv_ghost"),
        Some(("failed".into(), 2.into()))
    );
    assert_eq!(
        status("upload_to_gcs_ghost"),
        Some(("upstream_failed".into(), 0.into()))
    );
    assert_eq!(
        status("load_data_from_gcs_to_bq_table_orders"),
        Some(("succeeded".into(), 1.into()))
    );
    assert_eq!(warehouse_rows(&env.path("warehouse.duckdb"), "orders")?.len(), 3);
    Ok(())
}

#[test]
fn test_duplicate_table_aborts_before_any_unit_runs() -> Result<()> {
    let config = TWO_TABLES.replace("\"refunds\"", "\"orders\"");
    let env = LoadchainTestEnv::new(&config)?;

    env.loadchain()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("orders"));

    assert!(!env.path("data").exists());
    assert!(!env.path("target/run_results.json").exists());
    Ok(())
}

#[test]
fn test_plan_mermaid_for_selected_table() -> Result<()> {
    let env = LoadchainTestEnv::new(TWO_TABLES)?;

    let output = env
        .loadchain()
        .args(["plan", "--format", "mermaid", "-t", "orders"])
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    insta::assert_snapshot!(stdout.trim_end(), @r#"
    graph LR
        subgraph orders
            create_bq_table_orders["create_bq_table_orders"]
            extract_data_to_csv_orders["extract_data_to_csv_orders"]
            upload_to_gcs_orders["upload_to_gcs_orders"]
            load_data_from_gcs_to_bq_table_orders["load_data_from_gcs_to_bq_table_orders"]
        end
        create_bq_table_orders --> extract_data_to_csv_orders
        extract_data_to_csv_orders --> upload_to_gcs_orders
        upload_to_gcs_orders --> load_data_from_gcs_to_bq_table_orders
    "#);

    // Planning touches nothing
    assert!(!env.path("data").exists());
    assert!(!env.path("warehouse.duckdb").exists());
    Ok(())
}

#[test]
fn test_plan_json_hides_source_password() -> Result<()> {
    let env = LoadchainTestEnv::new(TWO_TABLES)?;

    env.loadchain()
        .args(["plan", "--format", "json"])
        .env("PG_CONNECTION", "postgres://etl:hunter2@db:5432/shop")
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres://etl:***@db:5432/shop"))
        .stdout(predicate::str::contains("hunter2").not());
    Ok(())
}

#[test]
fn test_clean_removes_staging_and_reports() -> Result<()> {
    let env = LoadchainTestEnv::new(TWO_TABLES)?;
    env.loadchain().arg("run").assert().success();

    env.loadchain()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 3 item(s)"));

    assert!(!env.path("data/orders_data.csv").exists());
    assert!(!env.path("target").exists());
    assert!(env.path("config.json").exists());
    assert!(env.path("bucket/orders_data.csv").exists());
    Ok(())
}
