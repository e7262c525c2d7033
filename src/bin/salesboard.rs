use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use salesboard::analytics::{
    available_categories, category_counts, detail_rows, sales_by_category, sentiment_breakdown,
    top_discounts, top_products, SalesFilter, SalesSummary,
};
use salesboard::auth::{AuthGate, InMemoryCredentialStore};
use salesboard::config::{AppConfig, ConfigManager};
use salesboard::dataset::{CleanRecord, DatasetLoader};
use salesboard::diagnostics::Diagnostic;
use salesboard::logging;
use salesboard::service::DashboardService;
use salesboard::PipelineError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "salesboard", about = "Sales dataset loader and dashboard")]
struct Cli {
    /// Config file (defaults to the XDG config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a source file and print its diagnostics and KPIs
    Load {
        source: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clean a source file and make it the stored table
    Sync { source: PathBuf },
    /// Print the dashboard for the stored table
    Show {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Write a config file with the default settings
    InitConfig,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config()?;
    let _log_guard = logging::init_logging(&config.log)?;

    match cli.command {
        Command::Load { source, json } => load(&config, &source, json),
        Command::Sync { source } => sync(&config, &source),
        Command::Show {
            category,
            top,
            user,
            password,
        } => show(&config, category, top, &user, &password),
        Command::InitConfig => {
            if config_manager.config_exists() {
                bail!(
                    "Config file already exists: {}",
                    config_manager.config_file_path().display()
                );
            }
            config_manager.save_config(&AppConfig::default())?;
            println!("Wrote {}", config_manager.config_file_path().display());
            Ok(())
        }
    }
}

fn load(config: &AppConfig, source: &Path, json: bool) -> Result<()> {
    let loader = DatasetLoader::new().with_delimiter(config.data.delimiter_byte()?);
    let outcome = loader.load_path(source).map_err(report)?;
    let rows: Vec<&CleanRecord> = outcome.table.iter().collect();
    let summary = SalesSummary::from_records(&rows);

    if json {
        let report = serde_json::json!({
            "source": source.display().to_string(),
            "fingerprint": outcome.fingerprint,
            "diagnostics": outcome.diagnostics,
            "summary": summary,
            "categories": available_categories(&outcome.table),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_diagnostics(&outcome.diagnostics);
    print_summary(&summary);
    Ok(())
}

fn sync(config: &AppConfig, source: &Path) -> Result<()> {
    let mut service = DashboardService::open(config)?;
    let outcome = service.import(source).map_err(report)?;

    print_diagnostics(&outcome.view.diagnostics);
    println!("{}", outcome.ack.message);
    Ok(())
}

fn show(
    config: &AppConfig,
    category: Option<String>,
    top: usize,
    user: &str,
    password: &str,
) -> Result<()> {
    let store = InMemoryCredentialStore::from_config(&config.credentials)
        .context("Invalid credentials configuration")?;
    let gate = AuthGate::new(Arc::new(store));
    let session = gate.login(user, password)?;

    let mut service = DashboardService::open(config)?;
    let view = service.current_table().map_err(report)?;
    print_diagnostics(&view.diagnostics);

    let categories = available_categories(&view.table);
    if let Some(selected) = &category {
        if !categories.contains(selected) {
            bail!(
                "Unknown category '{}'. Available: {}",
                selected,
                categories.join(", ")
            );
        }
    }
    let filter = SalesFilter { category };
    let rows = filter.apply(&view.table);

    println!("Logged in as {} ({})", session.username, session.role);
    print_summary(&SalesSummary::from_records(&rows));

    println!("\nSales by category:");
    for entry in sales_by_category(&rows) {
        println!(
            "  {:<30} {:>14.2}  ({} rows)",
            entry.category, entry.total_sales, entry.product_count
        );
    }

    println!("\nMost frequent categories:");
    for (name, count) in category_counts(&rows).into_iter().take(top) {
        println!("  {:<30} {:>6}", name, count);
    }

    println!("\nTop {} products:", top);
    for product in top_products(&rows, top) {
        println!(
            "  {:<50} {:>14.2}",
            truncate(&product.product_name, 50),
            product.total_sales
        );
    }

    println!("\nBiggest discounts:");
    for record in top_discounts(&rows, top) {
        println!(
            "  {:<50} {:>5.0}%",
            truncate(&record.product_name, 50),
            record.discount_percent.unwrap_or_default()
        );
    }

    println!("\nRatings:");
    for (sentiment, count) in sentiment_breakdown(&rows) {
        println!("  {:<10} {:>6}", sentiment.as_str(), count);
    }

    match detail_rows(&session, &rows) {
        Ok(details) => {
            println!("\nDetails:");
            for record in details {
                println!(
                    "  {:<20} {:<40} {:>12.2} {:>5} {}",
                    truncate(&record.category, 20),
                    truncate(&record.product_name, 40),
                    record.price,
                    record
                        .rating
                        .map(|r| format!("{:.1}", r))
                        .unwrap_or_else(|| "-".to_string()),
                    record.sentiment.as_str()
                );
            }
        }
        Err(e) => println!("\n{}", e),
    }

    Ok(())
}

/// Print the diagnostics of a failed operation and pass the error on
fn report(err: PipelineError) -> anyhow::Error {
    print_diagnostics(&err.diagnostics());
    err.into()
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn print_summary(summary: &SalesSummary) {
    println!("Total sales:    {:.2}", summary.total_sales);
    println!("Average ticket: {:.2}", summary.average_ticket);
    println!("Transactions:   {}", summary.transactions);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
