//! Binary entry point for the Bakehouse back office.

use anyhow::Context;
use bakehouse_app::{app, logging};
use bakehouse_data::DateRange;
use bakehouse_settings::BakehouseSettings;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Bakehouse - back-office tools for the shop's point-of-sale store.
#[derive(Parser)]
#[command(name = "bakehouse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the settings file.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Takings, deliveries and low stock for one day.
    Summary {
        /// Day to summarise (default: today).
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Orders due for delivery on a day.
    Deliveries {
        /// Delivery day (default: today).
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Per-product sales over a date range.
    Report {
        /// First day, inclusive.
        #[arg(long)]
        from: NaiveDate,

        /// Last day, inclusive (default: today).
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// List the price list.
    Products,

    /// Check that the configured store is reachable.
    Check,

    /// Write the default settings file if none exists.
    InitSettings,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = match cli.settings {
        Some(path) => path,
        None => bakehouse_settings::settings_file()?,
    };

    if let Commands::InitSettings = cli.command {
        return init_settings(&settings_path);
    }

    let mut settings = BakehouseSettings::load_from(&settings_path)?;
    settings.apply_overrides(|key| std::env::var(key).ok());

    let mut log_config = logging::LoggingConfig::from_settings(&settings.logging)?;
    if cli.verbose {
        log_config = log_config.verbose();
    }
    let _log_guard = logging::init(&log_config)?;

    let today = Local::now().date_naive();
    match cli.command {
        Commands::Summary { date } => {
            let data = app::open_store(&settings)?;
            let summary = app::daily_summary(&data, date.unwrap_or(today)).await?;
            print!("{}", summary);
        }
        Commands::Deliveries { date } => {
            let data = app::open_store(&settings)?;
            let date = date.unwrap_or(today);
            let orders = data.orders.for_delivery(date).await?;
            println!("Deliveries for {}: {}", date, orders.len());
            for order in orders {
                println!(
                    "  #{} {} ({}) {}",
                    order.order_id,
                    order.customer_name,
                    order.status,
                    app::money(&order.total)
                );
                for item in data.orders.items(order.order_id).await? {
                    println!("      {} x {}", item.quantity, item.product_name);
                }
            }
        }
        Commands::Report { from, to } => {
            let data = app::open_store(&settings)?;
            let range = DateRange::new(from, to.unwrap_or(today))?;
            let lines = data.reports.sales(range).await?;
            print!("{}", app::render_sales_report(range.from, range.to, &lines));
        }
        Commands::Products => {
            let data = app::open_store(&settings)?;
            for product in data.products.list().await? {
                let marker = if product.is_active { "" } else { " (withdrawn)" };
                println!(
                    "  {:>4}  {:<12} {:<24} {:>8}{}",
                    product.product_id,
                    product.category,
                    product.name,
                    app::money(&product.price),
                    marker
                );
            }
        }
        Commands::Check => {
            app::check_connection(&settings).await?;
            println!(
                "{} store is reachable",
                settings.database.backend.display_name()
            );
        }
        // Handled before settings are loaded.
        Commands::InitSettings => {}
    }
    Ok(())
}

fn init_settings(path: &std::path::Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Settings already exist at {}", path.display());
        return Ok(());
    }
    BakehouseSettings::default()
        .save_to(path)
        .with_context(|| format!("Could not create settings at {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}
