/// Treeline CLI
///
/// Runs and checks function definitions from the command line.
use treeline_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
