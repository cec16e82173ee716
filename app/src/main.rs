use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod mcp;

use crate::cli::{SearchArgs, init_tracing_cli, init_tracing_server, run_search};
use crate::mcp::run_server;

#[derive(Subcommand, Debug)]
enum Command {
    /// Page through grep.app results for a query and export matched lines to CSV
    Search(SearchArgs),
    /// Run MCP server over stdio
    Server {
        /// Directory that receives exported CSV files
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Search endpoint (defaults to GREPVAULT_ENDPOINT or grep.app)
        #[arg(long)]
        endpoint: Option<String>,
        /// Delay between page requests in milliseconds
        #[arg(long = "delay-ms")]
        delay_ms: Option<u64>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "gv",
    about = "grepvault: aggregate grep.app code search hits into a CSV",
    version,
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Command::Search(search) => {
            init_tracing_cli();
            run_search(search).await?;
        }
        Command::Server {
            output_dir,
            endpoint,
            delay_ms,
        } => {
            // stdout carries JSON-RPC; logs only go to GREPVAULT_LOG_PATH.
            init_tracing_server();
            run_server(output_dir, endpoint, delay_ms).await?;
        }
    }

    Ok(())
}
