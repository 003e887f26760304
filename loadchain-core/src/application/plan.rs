// loadchain-core/src/application/plan.rs
//
// Human and machine views of a compiled graph, without running anything.

use comfy_table::{ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::graph::{DependencyGraph, UnitId, UnitInputs, UnitOfWork};
use crate::domain::settings::WriteMode;
use crate::error::LoadchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanFormat {
    #[default]
    Table,
    Mermaid,
    Json,
}

impl FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(PlanFormat::Table),
            "mermaid" => Ok(PlanFormat::Mermaid),
            "json" => Ok(PlanFormat::Json),
            other => Err(format!(
                "unknown plan format '{}' (expected table, mermaid or json)",
                other
            )),
        }
    }
}

impl fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanFormat::Table => "table",
            PlanFormat::Mermaid => "mermaid",
            PlanFormat::Json => "json",
        })
    }
}

pub fn render_plan(graph: &DependencyGraph, format: PlanFormat) -> Result<String, LoadchainError> {
    match format {
        PlanFormat::Table => Ok(render_table(graph)),
        PlanFormat::Mermaid => Ok(render_mermaid(graph)),
        PlanFormat::Json => serde_json::to_string_pretty(graph)
            .map_err(|e| LoadchainError::InternalError(format!("Serialization: {}", e))),
    }
}

fn describe_inputs(unit: &UnitOfWork) -> String {
    match unit.inputs() {
        UnitInputs::Provision {
            destination,
            schema,
        } => format!("{} ({} columns)", destination, schema.len()),
        UnitInputs::Extract {
            table_name,
            staging_path,
            ..
        } => format!("{} -> {}", table_name, staging_path.display()),
        UnitInputs::Upload {
            staging_path,
            container,
            key,
        } => format!("{} -> {}/{}", staging_path.display(), container, key),
        UnitInputs::Load {
            object_uri,
            destination,
            write_mode,
            ..
        } => {
            let mode = match write_mode {
                WriteMode::Truncate => "truncate",
                WriteMode::Append => "append",
            };
            format!("{} -> {} ({})", object_uri, destination, mode)
        }
    }
}

/// Layer of each unit. Units sharing a layer have no dependency between them.
fn layer_index(graph: &DependencyGraph) -> HashMap<UnitId, usize> {
    graph
        .execution_layers()
        .into_iter()
        .enumerate()
        .flat_map(|(layer, ids)| ids.into_iter().map(move |id| (id, layer)))
        .collect()
}

pub fn render_table(graph: &DependencyGraph) -> String {
    let layer_of = layer_index(graph);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Layer", "Unit", "Stage", "Upstream", "Inputs"]);

    for unit in graph.units() {
        let upstream = unit
            .upstream()
            .iter()
            .map(UnitId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let layer = layer_of
            .get(unit.id())
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            layer,
            unit.id().to_string(),
            unit.stage().to_string(),
            if upstream.is_empty() {
                "-".to_string()
            } else {
                upstream
            },
            describe_inputs(unit),
        ]);
    }

    table.to_string()
}

fn mermaid_id(id: &UnitId) -> String {
    id.as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn render_mermaid(graph: &DependencyGraph) -> String {
    let mut lines = vec!["graph LR".to_string()];

    for chain in graph.chains() {
        lines.push(format!("    subgraph {}", chain.table_name()));
        for unit in chain.units() {
            lines.push(format!("        {}[\"{}\"]", mermaid_id(unit.id()), unit.id()));
        }
        lines.push("    end".to_string());
    }

    for (from, to) in graph.edges() {
        lines.push(format!("    {} --> {}", mermaid_id(from), mermaid_id(to)));
    }

    lines.join("\n")
}
