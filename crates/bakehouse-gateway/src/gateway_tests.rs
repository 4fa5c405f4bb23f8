//! Tests for the procedure gateway against a scripted in-memory connection

use crate::{Identity, NoParams, ProcedureGateway, procedure_params, procedure_row};
use async_trait::async_trait;
use bakehouse_core::{
    BakehouseError, Connection, ConnectionFactory, ProcedureCall, ProcedureName, QueryResult,
    Result, StatementResult, Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

type Script = Arc<dyn Fn(&ProcedureCall) -> Result<QueryResult> + Send + Sync>;

/// Shared bookkeeping for every connection a factory hands out
#[derive(Default)]
struct MockState {
    scripts: Mutex<HashMap<&'static str, Script>>,
    calls: Mutex<Vec<ProcedureCall>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    executed: AtomicUsize,
    fail_connect: AtomicBool,
}

impl MockState {
    fn script(
        &self,
        procedure: ProcedureName,
        f: impl Fn(&ProcedureCall) -> Result<QueryResult> + Send + Sync + 'static,
    ) {
        self.scripts.lock().insert(procedure.as_str(), Arc::new(f));
    }

    fn run(&self, call: &ProcedureCall) -> Result<QueryResult> {
        self.calls.lock().push(call.clone());
        let script = self.scripts.lock().get(call.procedure.as_str()).cloned();
        match script {
            Some(script) => script(call),
            None => Err(BakehouseError::Procedure(format!(
                "Could not find stored procedure '{}'",
                call.procedure
            ))),
        }
    }
}

/// Mock connection for testing
struct MockConnection {
    state: Arc<MockState>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn call_procedure(&self, call: &ProcedureCall) -> Result<QueryResult> {
        tokio::task::yield_now().await;
        self.state.run(call)
    }

    async fn execute_procedure(&self, call: &ProcedureCall) -> Result<StatementResult> {
        tokio::task::yield_now().await;
        self.state.run(call)?;
        self.state.executed.fetch_add(1, Ordering::SeqCst);
        Ok(StatementResult { affected_rows: 1 })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockConnectionFactory {
    state: Arc<MockState>,
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(BakehouseError::Connection("Login failed for user 'pos'".into()));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

fn gateway() -> (ProcedureGateway, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let factory = MockConnectionFactory {
        state: Arc::clone(&state),
    };
    (ProcedureGateway::new(Arc::new(factory)), state)
}

const GET_PRODUCTS: ProcedureName = ProcedureName::new("dbo.GetProducts");
const GET_PRODUCT_BY_ID: ProcedureName = ProcedureName::new("dbo.GetProductById");
const INSERT_PRODUCT: ProcedureName = ProcedureName::new("dbo.InsertProduct");

#[derive(Debug, Default, Clone, PartialEq)]
struct Product {
    id: i32,
    name: String,
    active: bool,
}

procedure_row!(Product {
    id => "ProductId",
    name => "Name",
    active => "IsActive",
});

struct ProductById {
    id: i32,
}

procedure_params!(ProductById { id => "ProductId" });

struct NewProduct<'a> {
    name: &'a str,
    price: f64,
}

procedure_params!(NewProduct<'_> {
    name => "Name",
    price => "Price",
});

fn product_rows(rows: &[(i32, &str)]) -> QueryResult {
    QueryResult::from_rows(
        vec!["ProductId".into(), "Name".into(), "IsActive".into()],
        rows.iter()
            .map(|(id, name)| vec![Value::Int32(*id), Value::String(name.to_string()), Value::Bool(true)])
            .collect(),
    )
}

#[tokio::test]
async fn test_load_many_empty_result() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCTS, |_| Ok(product_rows(&[])));

    let products: Vec<Product> = gateway.load_many(GET_PRODUCTS, &NoParams).await.unwrap();
    assert!(products.is_empty());

    let first: Product = gateway
        .load_first_or_default(GET_PRODUCTS, &NoParams)
        .await
        .unwrap();
    assert_eq!(first, Product::default());

    let maybe: Option<Product> = gateway.load_first(GET_PRODUCTS, &NoParams).await.unwrap();
    assert_eq!(maybe, None);
}

#[tokio::test]
async fn test_load_many_preserves_store_order() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCTS, |_| {
        Ok(product_rows(&[(3, "Rye"), (1, "Baguette"), (2, "Croissant")]))
    });

    let products: Vec<Product> = gateway.load_many(GET_PRODUCTS, &()).await.unwrap();
    let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert_eq!(products[1].name, "Baguette");
    assert!(products.iter().all(|p| p.active));
}

#[tokio::test]
async fn test_load_first_takes_first_row() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCTS, |_| Ok(product_rows(&[(5, "Scone"), (6, "Bun")])));

    let first: Option<Product> = gateway.load_first(GET_PRODUCTS, &NoParams).await.unwrap();
    assert_eq!(first.map(|p| p.id), Some(5));
}

#[tokio::test]
async fn test_parameters_are_forwarded_by_name() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCT_BY_ID, |call| {
        let id = call
            .param("productid")
            .and_then(|p| p.value.as_i64())
            .unwrap_or_default() as i32;
        Ok(product_rows(&[(id, "Echo")]))
    });

    let product: Option<Product> = gateway
        .load_first(GET_PRODUCT_BY_ID, &ProductById { id: 42 })
        .await
        .unwrap();
    assert_eq!(product.map(|p| p.id), Some(42));

    let calls = state.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].procedure, GET_PRODUCT_BY_ID);
    assert_eq!(calls[0].params.len(), 1);
    assert_eq!(calls[0].params[0].name, "ProductId");
}

#[tokio::test]
async fn test_connection_released_after_success() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCTS, |_| Ok(product_rows(&[(1, "Rye")])));

    let _: Vec<Product> = gateway.load_many(GET_PRODUCTS, &NoParams).await.unwrap();
    gateway.execute(GET_PRODUCTS, &NoParams).await.unwrap();

    assert_eq!(state.opened.load(Ordering::SeqCst), 2);
    assert_eq!(state.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_procedure_error_propagates_and_releases() {
    let (gateway, state) = gateway();

    let err = gateway
        .load_many::<Product, _>(ProcedureName::new("dbo.Missing"), &NoParams)
        .await
        .unwrap_err();
    assert!(matches!(err, BakehouseError::Procedure(ref msg) if msg.contains("dbo.Missing")));

    let err = gateway
        .execute(ProcedureName::new("dbo.Missing"), &NoParams)
        .await
        .unwrap_err();
    assert!(matches!(err, BakehouseError::Procedure(_)));

    assert_eq!(state.opened.load(Ordering::SeqCst), 2);
    assert_eq!(state.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_failure_propagates_unchanged() {
    let (gateway, state) = gateway();
    state.fail_connect.store(true, Ordering::SeqCst);

    let err = gateway
        .load_many::<Product, _>(GET_PRODUCTS, &NoParams)
        .await
        .unwrap_err();
    match err {
        BakehouseError::Connection(msg) => assert_eq!(msg, "Login failed for user 'pos'"),
        other => panic!("expected connection error, got {other:?}"),
    }
    assert!(state.calls.lock().is_empty());
    assert_eq!(state.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mapping_failure_is_not_defaulted() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCTS, |_| {
        Ok(QueryResult::from_rows(
            vec!["ProductId".into()],
            vec![vec![Value::String("not a number".into())]],
        ))
    });

    let err = gateway
        .load_many::<Product, _>(GET_PRODUCTS, &NoParams)
        .await
        .unwrap_err();
    assert!(matches!(err, BakehouseError::Mapping(ref msg) if msg.contains("ProductId")));
    assert_eq!(state.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execute_discards_returned_rows() {
    let (gateway, state) = gateway();
    state.script(INSERT_PRODUCT, |_| {
        Ok(QueryResult::from_rows(vec!["Id".into()], vec![vec![Value::Int64(11)]]))
    });

    let params = NewProduct {
        name: "Focaccia",
        price: 4.25,
    };
    gateway.execute(INSERT_PRODUCT, &params).await.unwrap();
    assert_eq!(state.executed.load(Ordering::SeqCst), 1);

    let identity: Identity = gateway
        .load_first_or_default(INSERT_PRODUCT, &params)
        .await
        .unwrap();
    assert_eq!(identity.id, 11);
}

#[tokio::test]
async fn test_identity_from_numeric_column() {
    let (gateway, state) = gateway();
    state.script(INSERT_PRODUCT, |_| {
        Ok(QueryResult::from_rows(
            vec!["id".into()],
            vec![vec![Value::Decimal("1024".into())]],
        ))
    });

    let identity: Identity = gateway
        .load_first_or_default(INSERT_PRODUCT, &NoParams)
        .await
        .unwrap();
    assert_eq!(identity, Identity { id: 1024 });
}

#[tokio::test]
async fn test_load_scalar_reads_first_column() {
    let (gateway, state) = gateway();
    state.script(INSERT_PRODUCT, |_| {
        Ok(QueryResult::from_rows(
            vec![String::new()],
            vec![vec![Value::Decimal("77".into())]],
        ))
    });
    state.script(GET_PRODUCTS, |_| Ok(product_rows(&[])));

    let id: Option<i64> = gateway.load_scalar(INSERT_PRODUCT, &NoParams).await.unwrap();
    assert_eq!(id, Some(77));

    let none: Option<i64> = gateway.load_scalar(GET_PRODUCTS, &NoParams).await.unwrap();
    assert_eq!(none, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_do_not_interfere() {
    let (gateway, state) = gateway();
    state.script(GET_PRODUCT_BY_ID, |call| {
        let id = call
            .param("ProductId")
            .and_then(|p| p.value.as_i64())
            .unwrap_or_default() as i32;
        let name = format!("Product {id}");
        Ok(product_rows(&[(id, name.as_str())]))
    });

    let handles: Vec<_> = (0..32)
        .map(|id| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway
                    .load_first::<Product, _>(GET_PRODUCT_BY_ID, &ProductById { id })
                    .await
            })
        })
        .collect();

    for (id, handle) in handles.into_iter().enumerate() {
        let product = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(product.id, id as i32);
        assert_eq!(product.name, format!("Product {id}"));
    }

    assert_eq!(state.opened.load(Ordering::SeqCst), 32);
    assert_eq!(state.closed.load(Ordering::SeqCst), 32);
}
