use clap::Parser;

use clio_mcp::cli::{self, Cli};
use clio_mcp::utils::user_paths::exe_dir;

#[tokio::main]
async fn main() {
    // Neither file overrides variables that are already set.
    dotenvy::dotenv().ok();
    if let Some(dir) = exe_dir() {
        dotenvy::from_path(dir.join(".env")).ok();
    }

    if let Err(err) = cli::run(Cli::parse()).await {
        eprintln!("clio-mcp: {}", err);
        std::process::exit(1);
    }
}
