//! SQLite connection implementation

use async_trait::async_trait;
use bakehouse_core::{
    BakehouseError, ColumnMeta, Connection, ProcedureCall, ProcedureName, QueryResult, Result,
    Row, StatementResult,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, ErrorCode, OpenFlags, Statement};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::ProcedureCatalog;
use crate::values::{Affinity, param_to_sqlite, read_value};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite connection that runs catalog procedures
pub struct SqliteConnection {
    conn: Arc<Mutex<Option<RusqliteConnection>>>,
    catalog: Arc<ProcedureCatalog>,
}

impl SqliteConnection {
    /// Open a SQLite database, resolving procedures through `catalog`
    pub fn open(path: &str, catalog: Arc<ProcedureCatalog>) -> Result<Self> {
        tracing::debug!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                BakehouseError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(BakehouseError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                BakehouseError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| {
            BakehouseError::Connection(format!("Failed to set busy timeout: {}", e))
        })?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            BakehouseError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(|e| {
            BakehouseError::Connection(format!("Failed to set journal mode: {}", e))
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(|e| {
            BakehouseError::Connection(format!("Failed to set synchronous mode: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            catalog,
        })
    }

    /// Expand `~/` and make relative paths absolute
    pub(crate) fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match std::env::var_os("HOME") {
                Some(home) => std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string(),
                None => {
                    return Err(BakehouseError::Configuration(
                        "Unable to determine HOME directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(BakehouseError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        if path_buf.is_relative() {
            Ok(std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string())
        } else {
            Ok(expanded)
        }
    }

    /// Run a multi-statement script, such as the catalog setup
    pub fn run_script(&self, sql: &str) -> Result<()> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or_else(closed)?;
        conn.execute_batch(sql)
            .map_err(|e| BakehouseError::Procedure(format!("Failed to run script: {}", e)))
    }

    /// Run `f` against the open connection on the blocking pool
    async fn with_conn<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&RusqliteConnection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let conn = guard.as_ref().ok_or_else(closed)?;
            f(conn)
        })
        .await
        .map_err(|e| BakehouseError::Connection(format!("SQLite worker task failed: {}", e)))?
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip_all, fields(procedure = %call.procedure))]
    async fn call_procedure(&self, call: &ProcedureCall) -> Result<QueryResult> {
        call.validate()?;
        let sql = self.catalog.get(call.procedure)?.sql.clone();
        let call = call.clone();
        let start = Instant::now();

        let mut result = self.with_conn(move |conn| query(conn, &sql, &call)).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            row_count = result.row_count(),
            execution_time_ms = result.execution_time_ms,
            "catalog procedure returned"
        );
        Ok(result)
    }

    #[tracing::instrument(skip_all, fields(procedure = %call.procedure))]
    async fn execute_procedure(&self, call: &ProcedureCall) -> Result<StatementResult> {
        call.validate()?;
        let sql = self.catalog.get(call.procedure)?.sql.clone();
        let call = call.clone();

        let result = self.with_conn(move |conn| execute(conn, &sql, &call)).await?;
        tracing::debug!(
            affected_rows = result.affected_rows,
            "catalog procedure executed"
        );
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take();
        match conn {
            Some(conn) => {
                tracing::trace!("closing SQLite connection");
                conn.close().map_err(|(_, e)| {
                    BakehouseError::Connection(format!("Failed to close SQLite connection: {}", e))
                })
            }
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

fn closed() -> BakehouseError {
    BakehouseError::Connection("SQLite connection is closed".into())
}

fn query(conn: &RusqliteConnection, sql: &str, call: &ProcedureCall) -> Result<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| classify(call.procedure, e))?;
    bind_params(&mut stmt, call)?;

    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnMeta::new(col.name(), col.decl_type().unwrap_or("DYNAMIC"), idx))
        .collect();
    let affinities: Vec<Affinity> = stmt
        .columns()
        .iter()
        .map(|col| Affinity::from_decl_type(col.decl_type()))
        .collect();
    let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();

    let mut rows = Vec::new();
    let mut query_rows = stmt.raw_query();
    while let Some(row) = query_rows
        .next()
        .map_err(|e| classify(call.procedure, e))?
    {
        let mut values = Vec::with_capacity(affinities.len());
        for (idx, affinity) in affinities.iter().enumerate() {
            let value = row
                .get_ref(idx)
                .map_err(|e| classify(call.procedure, e))?;
            values.push(read_value(value, *affinity));
        }
        rows.push(Row::new(Arc::clone(&names), values));
    }

    let mut result = QueryResult::empty();
    result.columns = columns;
    result.rows = rows;
    Ok(result)
}

fn execute(conn: &RusqliteConnection, sql: &str, call: &ProcedureCall) -> Result<StatementResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| classify(call.procedure, e))?;
    bind_params(&mut stmt, call)?;

    // Drain rows so statements with RETURNING run to completion
    let mut rows = stmt.raw_query();
    while rows
        .next()
        .map_err(|e| classify(call.procedure, e))?
        .is_some()
    {}
    drop(rows);

    let affected_rows = if stmt.readonly() {
        0
    } else {
        conn.changes() as u64
    };
    Ok(StatementResult { affected_rows })
}

/// Bind every `@Name` in the statement from the call's parameters.
///
/// Each statement parameter must be supplied, and each supplied parameter
/// must appear in the statement.
fn bind_params(stmt: &mut Statement<'_>, call: &ProcedureCall) -> Result<()> {
    let mut used = vec![false; call.params.len()];

    for idx in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(idx)
            .map(str::to_string)
            .ok_or_else(|| {
                BakehouseError::Procedure(format!(
                    "procedure '{}' uses a positional parameter; catalog statements must name every parameter",
                    call.procedure
                ))
            })?;
        let pos = call
            .params
            .iter()
            .position(|p| p.matches(&name))
            .ok_or_else(|| {
                BakehouseError::Procedure(format!(
                    "procedure '{}' expects parameter {} which was not supplied",
                    call.procedure, name
                ))
            })?;
        used[pos] = true;
        stmt.raw_bind_parameter(idx, param_to_sqlite(&call.params[pos]))
            .map_err(|e| classify(call.procedure, e))?;
    }

    if let Some((param, _)) = call.params.iter().zip(&used).find(|(_, used)| !**used) {
        return Err(BakehouseError::Procedure(format!(
            "procedure '{}' has no parameter named '{}'",
            call.procedure, param.name
        )));
    }
    Ok(())
}

/// Sort a SQLite failure into the data-access taxonomy
pub(crate) fn classify(procedure: ProcedureName, err: rusqlite::Error) -> BakehouseError {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked,
        ) => BakehouseError::Connection(format!("{}: {}", procedure, err)),
        _ => BakehouseError::Procedure(format!("{} failed: {}", procedure, err)),
    }
}
