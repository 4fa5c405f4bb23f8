//! The typed procedure gateway

use crate::mapping::{FromRow, FromValue, map_rows};
use crate::params::ToParams;
use crate::procedure_row;
use bakehouse_core::{
    Connection, ConnectionConfig, ConnectionFactory, DatabaseDriver, DriverConnectionFactory,
    ProcedureCall, ProcedureName, QueryResult, Result,
};
use std::sync::Arc;
use std::time::Instant;

/// Generated identity returned by insert procedures as a column named `Id`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
}

procedure_row!(Identity { id => "Id" });

/// Invokes named procedures and maps their rows to typed values.
///
/// Every call acquires its own connection from the factory and closes it
/// before returning, whether the call succeeded or not. The gateway keeps no
/// state between calls, so clones can be shared freely across tasks.
///
/// Errors from the factory, the driver, and row mapping are returned exactly
/// as produced: nothing is retried, translated, or replaced with a default.
#[derive(Clone)]
pub struct ProcedureGateway {
    factory: Arc<dyn ConnectionFactory>,
}

impl ProcedureGateway {
    /// Create a gateway over any connection factory
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self { factory }
    }

    /// Create a gateway that opens connections through `driver`
    pub fn from_driver(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self::new(Arc::new(DriverConnectionFactory::new(driver, config)))
    }

    /// Invoke `procedure` and map every row of its first result set to `T`,
    /// in the order the backing store returned them
    #[tracing::instrument(skip_all, fields(procedure = %procedure))]
    pub async fn load_many<T, P>(&self, procedure: ProcedureName, params: &P) -> Result<Vec<T>>
    where
        T: FromRow,
        P: ToParams + Sync + ?Sized,
    {
        let result = self.query(procedure, params).await?;
        let rows = map_rows::<T>(result)?;
        tracing::debug!(row_count = rows.len(), "rows mapped");
        Ok(rows)
    }

    /// `load_many`, then the first row or `T::default()` when there is none.
    ///
    /// An absent row and a row that maps to the default value are
    /// indistinguishable here; use [`load_first`](Self::load_first) when that
    /// matters.
    pub async fn load_first_or_default<T, P>(
        &self,
        procedure: ProcedureName,
        params: &P,
    ) -> Result<T>
    where
        T: FromRow,
        P: ToParams + Sync + ?Sized,
    {
        Ok(self.load_first(procedure, params).await?.unwrap_or_default())
    }

    /// `load_many`, then the first row, or `None` when the result set is empty
    pub async fn load_first<T, P>(&self, procedure: ProcedureName, params: &P) -> Result<Option<T>>
    where
        T: FromRow,
        P: ToParams + Sync + ?Sized,
    {
        Ok(self.load_many(procedure, params).await?.into_iter().next())
    }

    /// First column of the first row, for procedures that return a single
    /// unnamed value such as `SELECT SCOPE_IDENTITY()`
    #[tracing::instrument(skip_all, fields(procedure = %procedure))]
    pub async fn load_scalar<V, P>(&self, procedure: ProcedureName, params: &P) -> Result<Option<V>>
    where
        V: FromValue,
        P: ToParams + Sync + ?Sized,
    {
        let result = self.query(procedure, params).await?;
        match result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next())
        {
            Some(value) if !value.is_null() => V::from_value(value).map(Some),
            _ => Ok(None),
        }
    }

    /// Invoke `procedure` for its side effects. Any rows it produces are
    /// discarded; use `load_many` to read a generated identity.
    #[tracing::instrument(skip_all, fields(procedure = %procedure))]
    pub async fn execute<P>(&self, procedure: ProcedureName, params: &P) -> Result<()>
    where
        P: ToParams + Sync + ?Sized,
    {
        let call = ProcedureCall::new(procedure, params.to_params());
        let start = Instant::now();

        let conn = self.factory.create().await?;
        let outcome = conn.execute_procedure(&call).await;
        let outcome = release(conn, outcome).await?;

        tracing::debug!(
            affected_rows = outcome.affected_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "procedure executed"
        );
        Ok(())
    }

    async fn query<P>(&self, procedure: ProcedureName, params: &P) -> Result<QueryResult>
    where
        P: ToParams + Sync + ?Sized,
    {
        let call = ProcedureCall::new(procedure, params.to_params());
        let start = Instant::now();

        let conn = self.factory.create().await?;
        let outcome = conn.call_procedure(&call).await;
        let result = release(conn, outcome).await?;

        tracing::debug!(
            row_count = result.row_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "procedure returned"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for ProcedureGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureGateway").finish_non_exhaustive()
    }
}

/// Close `conn`, then hand back the call outcome unchanged.
///
/// A failure to close after a successful call is logged rather than returned:
/// the call's work is already done and its result fully buffered.
async fn release<R>(conn: Arc<dyn Connection>, outcome: Result<R>) -> Result<R> {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, driver = conn.driver_name(), "failed to close connection");
    }
    outcome
}
