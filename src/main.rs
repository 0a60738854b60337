use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use kpi_pipeline::cleaner::{clean_customers, clean_orders};
use kpi_pipeline::config::Config;
use kpi_pipeline::db::SqliteSource;
use kpi_pipeline::domain::{CleanWarning, Customer, Order};
use kpi_pipeline::error::Result;
use kpi_pipeline::loader::{load_customers, load_orders};
use kpi_pipeline::logging;
use kpi_pipeline::report::{print_summary, ReportSink};
use kpi_pipeline::source::{InMemorySource, KpiSet};

#[derive(Parser)]
#[command(name = "kpi_pipeline")]
#[command(about = "Customer/order KPI reporting pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the in-memory pipeline: load, clean, compute KPIs, write reports
    Run,
    /// Run the relational variant: mirror cleaned data into SQLite and
    /// compute the same KPIs in SQL
    Db,
    /// Print the resolved configuration
    ShowConfig,
}

/// Load and clean both sources; the only stage allowed to abort the run.
fn load_canonical(config: &Config) -> Result<(Vec<Customer>, Vec<Order>)> {
    let customers_raw = load_customers(&config.customers_csv)?;
    let orders_raw = load_orders(&config.orders_xml)?;

    let (customers, customer_warnings) = clean_customers(customers_raw);
    let (orders, order_warnings) = clean_orders(orders_raw, config.zone);
    log_warnings(&customer_warnings);
    log_warnings(&order_warnings);

    info!("Customers after cleaning: {} rows", customers.len());
    info!("Orders after cleaning: {} rows", orders.len());
    Ok((customers, orders))
}

fn log_warnings(warnings: &[CleanWarning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

fn run_in_memory(config: &Config) -> Result<()> {
    info!("Starting in-memory KPI pipeline");
    let (customers, orders) = load_canonical(config)?;

    let source = InMemorySource::new(customers, orders, config.zone);
    let kpis = KpiSet::compute(&source, config.top_n)?;

    ReportSink::new(&config.reports_dir, "kpi").write_all(&kpis)?;
    print_summary(&kpis, "KPI RESULTS");
    info!("Pipeline completed successfully");
    Ok(())
}

fn run_db(config: &Config) -> Result<()> {
    info!("Starting SQLite KPI pipeline");
    let (customers, orders) = load_canonical(config)?;

    // Connection lives for this scope only; it closes on every exit path.
    let mut source = SqliteSource::open(&config.db_path, config.zone)?;
    source.load(&customers, &orders)?;
    let kpis = KpiSet::compute(&source, config.top_n)?;

    ReportSink::new(&config.reports_dir, "db").write_all(&kpis)?;
    print_summary(&kpis, "DATABASE APPROACH - KPI RESULTS");
    info!("Database pipeline completed successfully");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    match cli.command {
        Commands::Run => run_in_memory(&config),
        Commands::Db => run_db(&config),
        Commands::ShowConfig => {
            println!("customers_csv: {}", config.customers_csv.display());
            println!("orders_xml:    {}", config.orders_xml.display());
            println!("reports_dir:   {}", config.reports_dir.display());
            println!("db_path:       {}", config.db_path.display());
            println!("zone:          {}", config.zone.name());
            println!("top_n:         {}", config.top_n);
            Ok(())
        }
    }
}

fn main() {
    logging::init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("Pipeline failed: {e}");
        std::process::exit(1);
    }
}
