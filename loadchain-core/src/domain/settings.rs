// loadchain-core/src/domain/settings.rs

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Object-store backend the graph targets. Decides the URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreScheme {
    #[default]
    Gcs,
    Local,
}

impl StoreScheme {
    pub fn scheme(&self) -> &'static str {
        match self {
            StoreScheme::Gcs => "gs",
            StoreScheme::Local => "file",
        }
    }
}

/// How the load stage treats rows already present in the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the table contents. Re-running a load yields the same final state.
    #[default]
    Truncate,
    /// Append rows. A retried load may insert the same rows twice.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_secs(60),
        }
    }
}

/// Source database connection string. The password never shows up in logs or plans.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ConnectionString(String);

impl ConnectionString {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once("://").map(|(scheme, _)| scheme)
    }

    pub fn redacted(&self) -> String {
        let Some((scheme, rest)) = self.0.split_once("://") else {
            return self.0.clone();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return self.0.clone();
        };
        match credentials.split_once(':') {
            Some((user, _password)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.0.clone(),
        }
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl Serialize for ConnectionString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.redacted())
    }
}

/// Process-wide configuration, resolved once at startup and shared read-only by every unit.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSettings {
    pub graph_name: String,
    pub root_dir: PathBuf,
    pub source_connection: ConnectionString,
    pub container: String,
    pub store: StoreScheme,
    pub write_mode: WriteMode,
    pub retry_policy: RetryPolicy,
}

impl PipelineSettings {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        source_connection: ConnectionString,
        container: impl Into<String>,
    ) -> Self {
        Self {
            graph_name: "dynamic_dag".to_string(),
            root_dir: root_dir.into(),
            source_connection,
            container: container.into(),
            store: StoreScheme::default(),
            write_mode: WriteMode::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_store(mut self, store: StoreScheme) -> Self {
        self.store = store;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Container as the object store addresses it.
    /// A local container is a directory, resolved against the root when relative.
    pub fn container_location(&self) -> String {
        match self.store {
            StoreScheme::Gcs => self.container.clone(),
            StoreScheme::Local => {
                let path = Path::new(&self.container);
                if path.is_absolute() {
                    path.display().to_string()
                } else {
                    self.root_dir.join(path).display().to_string()
                }
            }
        }
    }
}
