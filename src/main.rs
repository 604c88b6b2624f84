use clap::Parser;

use zerver::cli::Cli;
use zerver::config::ConfigSnapshot;
use zerver::supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ConfigSnapshot::resolve(&cli);

    // Outside debug mode the watcher and console are bypassed entirely:
    // the server runs once and its exit ends the supervisor too.
    let code = if config.debug {
        supervisor::run_debug(config).await?
    } else {
        supervisor::run_once(config).await?
    };
    std::process::exit(code);
}
