use postgres::model::{DIMENSIONAL_MODEL, find_table};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::TableKind;

/// Ordered list of tables loaded by a full load.
///
/// A valid plan lists every dimension before every fact, and every table after the tables it
/// references. Dependencies left out of the plan are assumed to be loaded already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    tables: Vec<String>,
}

impl LoadPlan {
    /// Validates and builds a plan from an ordered list of table names.
    pub fn new(tables: Vec<String>) -> EtlResult<Self> {
        let mut seen_fact: Option<&str> = None;

        for (position, table) in tables.iter().enumerate() {
            let Some(kind) = TableKind::from_table_name(table) else {
                bail!(
                    ErrorKind::ConfigError,
                    "Load plan contains a table of unknown kind",
                    format!("Table {table} has neither the dim_ nor the fact_ prefix")
                );
            };

            if tables[..position].contains(table) {
                bail!(
                    ErrorKind::ConfigError,
                    "Load plan lists a table twice",
                    format!("Table {table} appears more than once")
                );
            }

            match (kind, seen_fact) {
                (TableKind::Fact, None) => seen_fact = Some(table.as_str()),
                (TableKind::Dimension, Some(fact)) => bail!(
                    ErrorKind::ConfigError,
                    "Load plan lists a dimension after a fact",
                    format!("Dimension {table} is listed after fact {fact}")
                ),
                _ => {}
            }

            let Some(definition) = find_table(table) else {
                continue;
            };
            for dependency in definition.dependencies() {
                if tables[position + 1..].iter().any(|later| later == dependency) {
                    bail!(
                        ErrorKind::ConfigError,
                        "Load plan lists a table before its dependency",
                        format!("Table {table} references {dependency}, which is loaded later")
                    );
                }
            }
        }

        Ok(Self { tables })
    }

    /// Builds the plan from configuration, falling back to the full dimensional model.
    pub fn from_config(tables: Option<&[String]>) -> EtlResult<Self> {
        match tables {
            Some(tables) => Self::new(tables.to_vec()),
            None => Ok(Self::default()),
        }
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for LoadPlan {
    /// Every table of the dimensional model, in dependency order.
    fn default() -> Self {
        Self {
            tables: DIMENSIONAL_MODEL
                .iter()
                .map(|table| table.name.to_owned())
                .collect(),
        }
    }
}
