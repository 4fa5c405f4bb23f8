//! MS SQL Server connection implementation using tiberius

use async_trait::async_trait;
use bakehouse_core::{
    BakehouseError, ColumnMeta, Connection, ConnectionConfig, Parameter, ProcedureCall,
    ProcedureName, QueryResult, Result, Row, SqlType, StatementResult, Value,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

pub(crate) const DEFAULT_PORT: u16 = 1433;

/// MS SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Tiberius error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlConnectionError> for BakehouseError {
    fn from(err: MssqlConnectionError) -> Self {
        BakehouseError::Connection(err.to_string())
    }
}

/// MS SQL Server connection using tiberius
pub struct MssqlConnection {
    client: Mutex<Option<Client<Compat<TcpStream>>>>,
    closed: AtomicBool,
    database: Option<String>,
}

impl MssqlConnection {
    /// Connect with a prepared tiberius config, following one server redirect
    #[tracing::instrument(skip(config), fields(addr = %config.get_addr()))]
    pub async fn connect(
        mut config: Config,
        database: Option<String>,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        tracing::debug!("connecting to MS SQL Server");

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true)?;

        let client = match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => client,
            // Azure SQL gateways answer the login with a redirect
            Err(tiberius::error::Error::Routing { host, port }) => {
                tracing::debug!(host = %host, port, "following server redirect");
                config.host(&host);
                config.port(port);
                let tcp = TcpStream::connect(config.get_addr())
                    .await
                    .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;
                tcp.set_nodelay(true)?;
                Client::connect(config, tcp.compat_write())
                    .await
                    .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?
            }
            Err(e) => return Err(MssqlConnectionError::ConnectionFailed(e.to_string())),
        };

        tracing::debug!("connected to MS SQL Server");
        Ok(Self {
            client: Mutex::new(Some(client)),
            closed: AtomicBool::new(false),
            database,
        })
    }

    /// Create connection from config with standard keys
    pub async fn from_config(
        config: &ConnectionConfig,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        let tiberius_config = tiberius_config(config)?;
        Self::connect(tiberius_config, config.get_string("database")).await
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

/// Translate a connection config into a tiberius config.
///
/// An ADO.NET string in the `connection_string` parameter takes precedence
/// over the individual fields.
pub(crate) fn tiberius_config(
    config: &ConnectionConfig,
) -> std::result::Result<Config, MssqlConnectionError> {
    if let Some(ado) = config.get_string("connection_string") {
        return Ok(Config::from_ado_string(&ado)?);
    }

    let mut tiberius_config = Config::new();
    tiberius_config.host(
        config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string()),
    );
    tiberius_config.port(if config.port > 0 {
        config.port
    } else {
        DEFAULT_PORT
    });

    if let Some(db) = config.get_string("database") {
        tiberius_config.database(db);
    }
    if let Some(app) = config.get_string("application_name") {
        tiberius_config.application_name(app);
    }
    if config.get_flag("trust_cert") || config.get_flag("trust_certificate") {
        tiberius_config.trust_cert();
    }

    let encryption = match config.get_string("encrypt").as_deref() {
        Some("off") | Some("false") => EncryptionLevel::Off,
        Some("not_supported") => EncryptionLevel::NotSupported,
        _ => EncryptionLevel::Required,
    };
    tiberius_config.encryption(encryption);

    let username = config.get_string("username").ok_or_else(|| {
        MssqlConnectionError::AuthenticationFailed(
            "SQL Server authentication requires a username".to_string(),
        )
    })?;
    let password = config.get_string("password").unwrap_or_default();
    tiberius_config.authentication(AuthMethod::sql_server(username, password));

    Ok(tiberius_config)
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    #[tracing::instrument(skip_all, fields(procedure = %call.procedure))]
    async fn call_procedure(&self, call: &ProcedureCall) -> Result<QueryResult> {
        let sql = crate::statement::exec_statement(call)?;
        let params = params_to_tiberius(&call.params);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let start = std::time::Instant::now();

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(MssqlConnectionError::ConnectionClosed)?;

        let mut stream = client
            .query(sql, &param_refs[..])
            .await
            .map_err(|e| classify(call.procedure, e))?;

        let columns: Vec<ColumnMeta> = stream
            .columns()
            .await
            .map_err(|e| classify(call.procedure, e))?
            .map(|cols| {
                cols.iter()
                    .enumerate()
                    .map(|(idx, col)| tiberius_column_to_meta(col, idx))
                    .collect()
            })
            .unwrap_or_default();

        let tib_rows = stream
            .into_first_result()
            .await
            .map_err(|e| classify(call.procedure, e))?;

        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        let mut rows = Vec::with_capacity(tib_rows.len());
        for tib_row in tib_rows {
            let values = tib_row
                .into_iter()
                .map(column_data_to_value)
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::new(Arc::clone(&names), values));
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            duration_ms = execution_time_ms,
            "procedure returned"
        );

        let mut result = QueryResult::empty();
        result.columns = columns;
        result.rows = rows;
        result.execution_time_ms = execution_time_ms;
        Ok(result)
    }

    #[tracing::instrument(skip_all, fields(procedure = %call.procedure))]
    async fn execute_procedure(&self, call: &ProcedureCall) -> Result<StatementResult> {
        let sql = crate::statement::exec_statement(call)?;
        let params = params_to_tiberius(&call.params);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let start = std::time::Instant::now();

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(MssqlConnectionError::ConnectionClosed)?;

        let exec_result = client
            .execute(sql, &param_refs[..])
            .await
            .map_err(|e| classify(call.procedure, e))?;
        let affected_rows = exec_result.rows_affected().iter().sum::<u64>();

        tracing::debug!(
            affected_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "procedure executed"
        );
        Ok(StatementResult { affected_rows })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let client = self.client.lock().await.take();
        if let Some(client) = client {
            client.close().await.map_err(|e| {
                BakehouseError::Connection(format!("Failed to close connection: {}", e))
            })?;
            tracing::trace!("MS SQL Server connection closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Sort a tiberius failure into the data-access taxonomy
pub(crate) fn classify(procedure: ProcedureName, err: tiberius::error::Error) -> BakehouseError {
    use tiberius::error::Error;
    match err {
        Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } | Error::Protocol(_) => {
            tracing::error!(error = %err, "connection lost during procedure call");
            BakehouseError::Connection(format!("{}: {}", procedure, err))
        }
        Error::Server(token) => BakehouseError::Procedure(format!(
            "{} failed: {} (error {}, state {})",
            procedure,
            token.message(),
            token.code(),
            token.state()
        )),
        other => BakehouseError::Procedure(format!("{} failed: {}", procedure, other)),
    }
}

/// Convert a tiberius column to ColumnMeta
fn tiberius_column_to_meta(col: &tiberius::Column, ordinal: usize) -> ColumnMeta {
    ColumnMeta::new(col.name(), format!("{:?}", col.column_type()), ordinal)
}

/// Convert tiberius ColumnData to a Bakehouse Value
pub(crate) fn column_data_to_value(col_data: ColumnData<'_>) -> Result<Value> {
    let value = match col_data {
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::U8(v) => v.map(|v| Value::Int16(i16::from(v))),
        ColumnData::I16(v) => v.map(Value::Int16),
        ColumnData::I32(v) => v.map(Value::Int32),
        ColumnData::I64(v) => v.map(Value::Int64),
        ColumnData::F32(v) => v.map(Value::Float32),
        ColumnData::F64(v) => v.map(Value::Float64),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(Value::Uuid),
        ColumnData::Binary(v) => v.map(|b| Value::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| Value::Decimal(n.to_string())),
        ColumnData::Xml(v) => v.map(|x| Value::String(x.into_owned().into_string())),
        temporal => temporal_value(&temporal)?,
    };
    Ok(value.unwrap_or(Value::Null))
}

fn temporal_value(col_data: &ColumnData<'_>) -> Result<Option<Value>> {
    // tiberius' FromSql requires `&ColumnData<'static>`; temporal variants borrow nothing.
    let col_data: &ColumnData<'static> = &match col_data {
        ColumnData::Date(v) => ColumnData::Date(*v),
        ColumnData::Time(v) => ColumnData::Time(*v),
        ColumnData::DateTime(v) => ColumnData::DateTime(*v),
        ColumnData::SmallDateTime(v) => ColumnData::SmallDateTime(*v),
        ColumnData::DateTime2(v) => ColumnData::DateTime2(*v),
        ColumnData::DateTimeOffset(v) => ColumnData::DateTimeOffset(*v),
        other => {
            return Err(BakehouseError::Mapping(format!(
                "unreadable temporal value: {:?}",
                other
            )));
        }
    };
    let converted = match col_data {
        ColumnData::Date(_) => NaiveDate::from_sql(col_data).map(|d| d.map(Value::Date)),
        ColumnData::Time(_) => NaiveTime::from_sql(col_data).map(|t| t.map(Value::Time)),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(col_data).map(|dt| dt.map(Value::DateTimeUtc))
        }
        _ => NaiveDateTime::from_sql(col_data).map(|dt| dt.map(Value::DateTime)),
    };
    converted.map_err(|e| BakehouseError::Mapping(format!("unreadable temporal value: {}", e)))
}

/// Container for tiberius parameter values
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TiberiusParam {
    /// Untyped NULL, sent as NVARCHAR so the server converts it to any column type
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(Option<NaiveDate>),
    Time(NaiveTime),
    DateTime(Option<NaiveDateTime>),
    DateTimeUtc(DateTime<Utc>),
}

impl ToSql for TiberiusParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            TiberiusParam::Null => ColumnData::String(None),
            TiberiusParam::Bool(v) => ColumnData::Bit(Some(*v)),
            TiberiusParam::I16(v) => ColumnData::I16(Some(*v)),
            TiberiusParam::I32(v) => ColumnData::I32(Some(*v)),
            TiberiusParam::I64(v) => ColumnData::I64(Some(*v)),
            TiberiusParam::F32(v) => ColumnData::F32(Some(*v)),
            TiberiusParam::F64(v) => ColumnData::F64(Some(*v)),
            TiberiusParam::String(v) => {
                ColumnData::String(Some(std::borrow::Cow::Borrowed(v.as_str())))
            }
            TiberiusParam::Bytes(v) => {
                ColumnData::Binary(Some(std::borrow::Cow::Borrowed(v.as_slice())))
            }
            TiberiusParam::Uuid(v) => ColumnData::Guid(Some(*v)),
            TiberiusParam::Date(Some(d)) => d.to_sql(),
            TiberiusParam::Date(None) => ColumnData::Date(None),
            TiberiusParam::Time(t) => t.to_sql(),
            TiberiusParam::DateTime(Some(dt)) => dt.to_sql(),
            TiberiusParam::DateTime(None) => ColumnData::DateTime2(None),
            TiberiusParam::DateTimeUtc(dt) => dt.to_sql(),
        }
    }
}

/// Convert call parameters to tiberius parameters, honoring type tags
pub(crate) fn params_to_tiberius(params: &[Parameter]) -> Vec<TiberiusParam> {
    params.iter().map(param_to_tiberius).collect()
}

fn param_to_tiberius(param: &Parameter) -> TiberiusParam {
    match (param.sql_type, &param.value) {
        (Some(SqlType::Date), Value::Null) => TiberiusParam::Date(None),
        (Some(SqlType::Date), Value::Date(d)) => TiberiusParam::Date(Some(*d)),
        (Some(SqlType::Date), Value::DateTime(dt)) => TiberiusParam::Date(Some(dt.date())),
        (Some(SqlType::Date), Value::DateTimeUtc(dt)) => {
            TiberiusParam::Date(Some(dt.date_naive()))
        }
        (Some(SqlType::DateTime), Value::Null) => TiberiusParam::DateTime(None),
        (_, value) => value_to_tiberius(value),
    }
}

fn value_to_tiberius(value: &Value) -> TiberiusParam {
    match value {
        Value::Null => TiberiusParam::Null,
        Value::Bool(b) => TiberiusParam::Bool(*b),
        Value::Int16(i) => TiberiusParam::I16(*i),
        Value::Int32(i) => TiberiusParam::I32(*i),
        Value::Int64(i) => TiberiusParam::I64(*i),
        Value::Float32(f) => TiberiusParam::F32(*f),
        Value::Float64(f) => TiberiusParam::F64(*f),
        Value::Decimal(d) => TiberiusParam::String(d.clone()),
        Value::String(s) => TiberiusParam::String(s.clone()),
        Value::Bytes(b) => TiberiusParam::Bytes(b.clone()),
        Value::Uuid(u) => TiberiusParam::Uuid(*u),
        Value::Date(d) => TiberiusParam::Date(Some(*d)),
        Value::Time(t) => TiberiusParam::Time(*t),
        Value::DateTime(dt) => TiberiusParam::DateTime(Some(*dt)),
        Value::DateTimeUtc(dt) => TiberiusParam::DateTimeUtc(*dt),
    }
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("database", &self.database)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
