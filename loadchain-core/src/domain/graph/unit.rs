// loadchain-core/src/domain/graph/unit.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::error::DomainError;
use crate::domain::naming;
use crate::domain::settings::{ConnectionString, PipelineSettings, WriteMode};
use crate::domain::table::{ColumnSpec, TableDescriptor, TableRef};

/// The four operations of a table chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Provision,
    Extract,
    Upload,
    Load,
}

impl Stage {
    pub const CHAIN: [Stage; 4] = [Stage::Provision, Stage::Extract, Stage::Upload, Stage::Load];

    /// Prefix of the unit id. Kept stable: run reports and dashboards key on it.
    pub fn verb(&self) -> &'static str {
        match self {
            Stage::Provision => "create_bq_table",
            Stage::Extract => "extract_data_to_csv",
            Stage::Upload => "upload_to_gcs",
            Stage::Load => "load_data_from_gcs_to_bq_table",
        }
    }

    pub fn unit_id(&self, table_name: &str) -> UnitId {
        UnitId(format!("{}_{}", self.verb(), table_name))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Provision => "provision",
            Stage::Extract => "extract",
            Stage::Upload => "upload",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stage-specific arguments, bound once at compile time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum UnitInputs {
    Provision {
        destination: TableRef,
        schema: Vec<ColumnSpec>,
    },
    Extract {
        table_name: String,
        source_connection: ConnectionString,
        staging_path: PathBuf,
    },
    Upload {
        staging_path: PathBuf,
        container: String,
        key: String,
    },
    Load {
        object_uri: String,
        destination: TableRef,
        schema: Vec<ColumnSpec>,
        write_mode: WriteMode,
    },
}

impl UnitInputs {
    pub fn stage(&self) -> Stage {
        match self {
            UnitInputs::Provision { .. } => Stage::Provision,
            UnitInputs::Extract { .. } => Stage::Extract,
            UnitInputs::Upload { .. } => Stage::Upload,
            UnitInputs::Load { .. } => Stage::Load,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitOfWork {
    id: UnitId,
    table_name: String,
    stage: Stage,
    inputs: UnitInputs,
    upstream: Vec<UnitId>,
}

impl UnitOfWork {
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn inputs(&self) -> &UnitInputs {
        &self.inputs
    }

    pub fn upstream(&self) -> &[UnitId] {
        &self.upstream
    }
}

/// Builds the units of one table from its descriptor and the shared settings.
pub struct UnitBuilder<'a> {
    settings: &'a PipelineSettings,
    descriptor: &'a TableDescriptor,
    destination: TableRef,
}

impl<'a> UnitBuilder<'a> {
    pub fn new(
        settings: &'a PipelineSettings,
        descriptor: &'a TableDescriptor,
    ) -> Result<Self, DomainError> {
        let destination = TableRef::parse(&descriptor.destination_identifier)?;
        Ok(Self {
            settings,
            descriptor,
            destination,
        })
    }

    pub fn build(&self, stage: Stage, upstream: Option<&UnitId>) -> UnitOfWork {
        let table_name = &self.descriptor.table_name;
        let key = naming::object_key(table_name);
        let staging_path = naming::staging_path(&self.settings.root_dir, table_name);
        let container = self.settings.container_location();

        let inputs = match stage {
            Stage::Provision => UnitInputs::Provision {
                destination: self.destination.clone(),
                schema: self.descriptor.schema.clone(),
            },
            Stage::Extract => UnitInputs::Extract {
                table_name: table_name.clone(),
                source_connection: self.settings.source_connection.clone(),
                staging_path,
            },
            Stage::Upload => UnitInputs::Upload {
                staging_path,
                container,
                key,
            },
            Stage::Load => UnitInputs::Load {
                object_uri: naming::object_uri(self.settings.store, &container, &key),
                destination: self.destination.clone(),
                schema: self.descriptor.schema.clone(),
                write_mode: self.settings.write_mode,
            },
        };

        UnitOfWork {
            id: stage.unit_id(table_name),
            table_name: table_name.clone(),
            stage,
            inputs,
            upstream: upstream.into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::settings::StoreScheme;
    use crate::domain::table::FieldType;

    fn settings() -> PipelineSettings {
        PipelineSettings::new(
            "/opt/etl",
            ConnectionString::new("postgres://etl:pw@db/shop"),
            "landing",
        )
    }

    fn orders() -> TableDescriptor {
        TableDescriptor::new(
            "orders",
            vec![ColumnSpec::new("id", FieldType::Integer)],
            "proj.ds.orders",
        )
    }

    #[test]
    fn test_unit_ids_follow_verb_convention() {
        assert_eq!(
            Stage::Load.unit_id("orders").as_str(),
            "load_data_from_gcs_to_bq_table_orders"
        );
        assert_eq!(
            Stage::Provision.unit_id("orders").as_str(),
            "create_bq_table_orders"
        );
    }

    #[test]
    fn test_builder_binds_naming_conventions() {
        let settings = settings();
        let desc = orders();
        let builder = UnitBuilder::new(&settings, &desc).unwrap();

        let upload = builder.build(Stage::Upload, None);
        match upload.inputs() {
            UnitInputs::Upload {
                staging_path,
                container,
                key,
            } => {
                assert_eq!(staging_path, &PathBuf::from("/opt/etl/data/orders_data.csv"));
                assert_eq!(container, "landing");
                assert_eq!(key, "orders_data.csv");
            }
            other => panic!("unexpected inputs {:?}", other),
        }

        let load = builder.build(Stage::Load, Some(upload.id()));
        assert_eq!(load.upstream(), &[upload.id().clone()]);
        match load.inputs() {
            UnitInputs::Load { object_uri, .. } => {
                assert_eq!(object_uri, "gs://landing/orders_data.csv")
            }
            other => panic!("unexpected inputs {:?}", other),
        }
    }

    #[test]
    fn test_local_store_binds_file_uri() {
        let settings = settings().with_store(StoreScheme::Local);
        let desc = orders();
        let builder = UnitBuilder::new(&settings, &desc).unwrap();
        match builder.build(Stage::Load, None).inputs() {
            UnitInputs::Load { object_uri, .. } => {
                assert_eq!(object_uri, "file:///opt/etl/landing/orders_data.csv")
            }
            other => panic!("unexpected inputs {:?}", other),
        }
    }

    #[test]
    fn test_serialized_inputs_hide_password() {
        let settings = settings();
        let desc = orders();
        let builder = UnitBuilder::new(&settings, &desc).unwrap();
        let json = serde_json::to_string(&builder.build(Stage::Extract, None)).unwrap();
        assert!(json.contains("postgres://etl:***@db/shop"));
        assert!(!json.contains(":pw@"));
    }
}
