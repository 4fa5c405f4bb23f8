//! Wiring from settings to data modules, plus the back-office views

use anyhow::Context;
use bakehouse_core::DatabaseDriver;
use bakehouse_data::{
    Bakehouse, DailySalesTotal, Order, SQLITE_CATALOG, SalesReportLine, SessionSigner, StockItem,
};
use bakehouse_drivers::DriverRegistry;
use bakehouse_drivers::sqlite::{ProcedureCatalog, SqliteDriver};
use bakehouse_gateway::ProcedureGateway;
use bakehouse_settings::{Backend, BakehouseSettings, DatabaseSettings, SessionSettings};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

/// Drivers for the configured backend. Without a catalog file, SQLite is
/// served from the bundled procedure catalog.
pub fn driver_registry(settings: &DatabaseSettings) -> anyhow::Result<DriverRegistry> {
    let mut registry = DriverRegistry::with_defaults();
    if settings.backend == Backend::Sqlite && settings.catalog_path.is_none() {
        let catalog = ProcedureCatalog::from_toml_str(SQLITE_CATALOG)
            .context("Bundled procedure catalog is invalid")?;
        registry.register(Arc::new(SqliteDriver::with_catalog(catalog)));
    }
    Ok(registry)
}

fn resolve_driver(
    settings: &BakehouseSettings,
) -> anyhow::Result<(Arc<dyn DatabaseDriver>, bakehouse_core::ConnectionConfig)> {
    let config = settings.connection_config()?;
    let registry = driver_registry(&settings.database)?;
    let driver = registry.for_config(&config)?;
    Ok((driver, config))
}

/// Build every data module over a gateway for the configured store
pub fn open_store(settings: &BakehouseSettings) -> anyhow::Result<Bakehouse> {
    let (driver, config) = resolve_driver(settings)?;
    tracing::info!(
        backend = settings.database.backend.display_name(),
        driver = driver.display_name(),
        "opening store"
    );
    Ok(Bakehouse::new(ProcedureGateway::from_driver(driver, config)))
}

/// Open and close one connection to prove the store is reachable
pub async fn check_connection(settings: &BakehouseSettings) -> anyhow::Result<()> {
    let (driver, config) = resolve_driver(settings)?;
    driver
        .test_connection(&config)
        .await
        .with_context(|| format!("Could not reach the {} store", driver.display_name()))?;
    Ok(())
}

pub fn session_signer(settings: &SessionSettings) -> anyhow::Result<SessionSigner> {
    match &settings.secret {
        Some(secret) => Ok(SessionSigner::new(secret.as_bytes())?),
        None => {
            tracing::warn!("no session secret configured; sessions end when the app exits");
            Ok(SessionSigner::random()?)
        }
    }
}

/// What the shop needs to know at the start of a day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub takings: DailySalesTotal,
    pub deliveries: Vec<Order>,
    pub low_stock: Vec<StockItem>,
}

#[tracing::instrument(skip(data))]
pub async fn daily_summary(data: &Bakehouse, date: NaiveDate) -> anyhow::Result<DailySummary> {
    let (takings, deliveries, low_stock) = tokio::try_join!(
        data.sales.daily_total(date),
        data.orders.for_delivery(date),
        data.inventory.low_stock(),
    )?;
    Ok(DailySummary {
        date,
        takings,
        deliveries,
        low_stock,
    })
}

impl fmt::Display for DailySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary for {}", self.date)?;
        writeln!(
            f,
            "  Takings: {} from {} sale(s)",
            money(&self.takings.total),
            self.takings.sale_count
        )?;

        if self.deliveries.is_empty() {
            writeln!(f, "  No deliveries due")?;
        } else {
            writeln!(f, "  Deliveries due: {}", self.deliveries.len())?;
            for order in &self.deliveries {
                writeln!(
                    f,
                    "    #{} {} ({}) {}",
                    order.order_id,
                    order.customer_name,
                    order.status,
                    money(&order.total)
                )?;
            }
        }

        if self.low_stock.is_empty() {
            writeln!(f, "  Stock levels OK")?;
        } else {
            writeln!(f, "  Low stock:")?;
            for item in &self.low_stock {
                writeln!(
                    f,
                    "    {}: {} {} (reorder at {})",
                    item.name,
                    item.quantity.normalized(),
                    item.unit,
                    item.reorder_level.normalized()
                )?;
            }
        }
        Ok(())
    }
}

/// Render a sales report as aligned text lines
pub fn render_sales_report(from: NaiveDate, to: NaiveDate, lines: &[SalesReportLine]) -> String {
    let mut out = format!("Sales {} to {}\n", from, to);
    if lines.is_empty() {
        out.push_str("  No sales\n");
        return out;
    }

    let width = lines
        .iter()
        .map(|l| l.product_name.len())
        .max()
        .unwrap_or(0);
    let mut total = BigDecimal::from(0);
    for line in lines {
        out.push_str(&format!(
            "  {:<width$}  {:>5}  {:>10}\n",
            line.product_name,
            line.quantity_sold,
            money(&line.revenue),
            width = width
        ));
        total += &line.revenue;
    }
    out.push_str(&format!(
        "  {:<width$}  {:>5}  {:>10}\n",
        "Total",
        "",
        money(&total),
        width = width
    ));
    out
}

/// Two decimal places, the way amounts appear on receipts.
///
/// Formatted from whole cents: `BigDecimal`'s `Display` drops the scale of zero.
pub fn money(amount: &BigDecimal) -> String {
    let rounded = amount.with_scale_round(2, RoundingMode::HalfUp);
    match (&rounded * BigDecimal::from(100)).to_i64() {
        Some(cents) => {
            let sign = if cents < 0 { "-" } else { "" };
            let cents = cents.unsigned_abs();
            format!("{}{}.{:02}", sign, cents / 100, cents % 100)
        }
        None => rounded.to_string(),
    }
}
