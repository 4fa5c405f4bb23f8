//! Procedure call description: a constant procedure name plus named parameters

use crate::{BakehouseError, Result, Value};
use std::fmt;

/// Name of a server-side procedure, optionally schema-qualified (`dbo.GetProducts`).
///
/// Only constructible from a `&'static str`, so a procedure name can never be
/// assembled from runtime input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcedureName(&'static str);

impl ProcedureName {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Schema and object parts, e.g. `(Some("dbo"), "GetProducts")`
    pub fn parts(&self) -> (Option<&'static str>, &'static str) {
        match self.0.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, self.0),
        }
    }

    /// Object name without the schema qualifier
    pub fn object_name(&self) -> &'static str {
        self.parts().1
    }

    /// Reject empty names and anything that is not a plain (schema.)identifier
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(BakehouseError::Procedure(
                "procedure name must not be empty".into(),
            ));
        }
        let parts: Vec<&str> = self.0.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(BakehouseError::Procedure(format!(
                "invalid procedure name '{}'",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ProcedureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Storage type tag for an outgoing parameter.
///
/// Untagged parameters let the driver infer the storage type from the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// Calendar date without time of day
    Date,
    /// Date and time of day without offset
    DateTime,
}

/// A single named parameter bound to a procedure input
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name without the `@` prefix
    pub name: &'static str,
    pub value: Value,
    pub sql_type: Option<SqlType>,
}

impl Parameter {
    pub fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            value,
            sql_type: None,
        }
    }

    pub fn typed(name: &'static str, value: Value, sql_type: SqlType) -> Self {
        Self {
            name,
            value,
            sql_type: Some(sql_type),
        }
    }

    /// Whether this parameter binds to the given procedure input name
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim_start_matches(['@', ':', '$']);
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A fully described procedure invocation, built fresh for every call
#[derive(Debug, Clone)]
pub struct ProcedureCall {
    pub procedure: ProcedureName,
    pub params: Vec<Parameter>,
}

impl ProcedureCall {
    pub fn new(procedure: ProcedureName, params: Vec<Parameter>) -> Self {
        Self { procedure, params }
    }

    /// Find a parameter by name, ignoring ASCII case and any `@`/`:`/`$` prefix
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.matches(name))
    }

    /// Check the procedure name, every parameter name, and that no parameter
    /// is supplied twice
    pub fn validate(&self) -> Result<()> {
        self.procedure.validate()?;
        for (idx, param) in self.params.iter().enumerate() {
            if !is_identifier(param.name) {
                return Err(BakehouseError::Procedure(format!(
                    "invalid parameter name '{}' for {}",
                    param.name, self.procedure
                )));
            }
            if self.params[..idx].iter().any(|p| p.matches(param.name)) {
                return Err(BakehouseError::Procedure(format!(
                    "parameter '{}' supplied more than once for {}",
                    param.name, self.procedure
                )));
            }
        }
        Ok(())
    }
}
