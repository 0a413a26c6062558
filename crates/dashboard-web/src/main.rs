//! KRX stock price dashboard
//!
//! # Usage
//!
//! ```bash
//! # Web dashboard on http://127.0.0.1:8501
//! stock-dashboard serve
//!
//! # One query in the terminal, saved as xlsx
//! stock-dashboard query --companies "삼성전자, 035720" --start 2024-01-01 --output prices.xlsx
//! ```

mod form;
mod messages;
mod server;
mod terminal;
mod view;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dashboard_stock::{DashboardConfig, StockDashboard};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stock-dashboard")]
#[command(about = "KRX stock price dashboard", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web dashboard
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8501")]
        bind: SocketAddr,
    },
    /// Run one query and print the result
    Query {
        /// Company names or six-digit codes, comma separated
        #[arg(short, long)]
        companies: String,
        /// First date (YYYY-MM-DD), defaults to January 1st of this year
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Write the result to this xlsx file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = dashboard_utils::Config::from_env();
    dashboard_utils::init_tracing_with(&app.log_filter);

    let args = Args::parse();
    info!(app = %app.app_name, environment = %app.environment, "Starting");

    let dashboard = Arc::new(StockDashboard::from_config(DashboardConfig::from_env()?)?);

    match args.command {
        Command::Serve { bind } => {
            let state = server::AppState::new(app, dashboard)?;
            server::serve(state, bind).await
        }
        Command::Query {
            companies,
            start,
            end,
            output,
        } => terminal::run_query(&dashboard, &companies, start, end, output.as_deref()).await,
    }
}
