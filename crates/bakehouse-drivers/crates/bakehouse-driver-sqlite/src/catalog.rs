//! Procedure catalog: named SQL statements standing in for stored procedures

use bakehouse_core::{BakehouseError, ProcedureName, Result, is_identifier};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// On-disk layout of a catalog file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    setup: Option<String>,
    #[serde(default)]
    procedures: BTreeMap<String, ProcedureEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcedureEntry {
    sql: String,
    #[serde(default)]
    description: Option<String>,
}

/// One catalog procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProcedure {
    /// Name as written in the catalog
    pub name: String,
    /// A single SQL statement, parameters written as `@Name`
    pub sql: String,
    pub description: Option<String>,
}

/// Procedures keyed by name, looked up ignoring ASCII case.
///
/// ```toml
/// setup = """
/// CREATE TABLE IF NOT EXISTS Products (ProductId INTEGER PRIMARY KEY, Name TEXT NOT NULL);
/// """
///
/// [procedures.GetProductById]
/// sql = "SELECT ProductId, Name FROM Products WHERE ProductId = @ProductId"
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProcedureCatalog {
    setup: Option<String>,
    procedures: HashMap<String, CatalogProcedure>,
}

impl ProcedureCatalog {
    /// Parse a catalog from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text).map_err(|e| {
            BakehouseError::Configuration(format!("invalid procedure catalog: {}", e))
        })?;

        let mut procedures = HashMap::with_capacity(file.procedures.len());
        for (name, entry) in file.procedures {
            if !is_identifier(&name) {
                return Err(BakehouseError::Configuration(format!(
                    "invalid procedure name '{}' in catalog",
                    name
                )));
            }
            if entry.sql.trim().is_empty() {
                return Err(BakehouseError::Configuration(format!(
                    "procedure '{}' has no SQL",
                    name
                )));
            }
            let key = name.to_ascii_lowercase();
            if procedures.contains_key(&key) {
                return Err(BakehouseError::Configuration(format!(
                    "procedure '{}' is defined more than once (names ignore case)",
                    name
                )));
            }
            procedures.insert(
                key,
                CatalogProcedure {
                    name,
                    sql: entry.sql,
                    description: entry.description,
                },
            );
        }

        let setup = file.setup.filter(|s| !s.trim().is_empty());
        Ok(Self { setup, procedures })
    }

    /// Read and parse a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BakehouseError::Configuration(format!(
                "failed to read procedure catalog '{}': {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            procedures = catalog.len(),
            "procedure catalog loaded"
        );
        Ok(catalog)
    }

    /// Look up a procedure. The schema part of a qualified name is ignored
    /// since SQLite has a single namespace.
    pub fn get(&self, procedure: ProcedureName) -> Result<&CatalogProcedure> {
        self.procedures
            .get(&procedure.object_name().to_ascii_lowercase())
            .ok_or_else(|| {
                BakehouseError::Procedure(format!(
                    "procedure '{}' is not defined in the catalog",
                    procedure
                ))
            })
    }

    /// Script run once per database before the first procedure call
    pub fn setup(&self) -> Option<&str> {
        self.setup.as_deref()
    }

    /// Procedure names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.procedures.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}
