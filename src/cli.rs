use clap::{ArgAction, Parser};

/// Zerver - development supervisor for a local zerver server
#[derive(Parser, Debug, Default)]
#[command(name = "zerver")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
#[command(disable_version_flag = true)]
#[command(about = "Run and supervise a local zerver server")]
#[command(long_about = "Zerver launches the server as a child process and keeps it alive.

In debug mode it also watches the working directory: changes under the
API directory restart the server, any other change sends the running
server a live-refresh notification. With logging enabled, Tab opens an
interactive command console multiplexed into the server process.")]
pub struct Cli {
    /// Print version and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Enable debug mode (file watcher and restart-on-crash)
    #[arg(short, long)]
    pub debug: bool,

    /// Notify connected clients on asset changes (implies debug)
    #[arg(short, long)]
    pub refresh: bool,

    /// Enable request logging and the command console (implies debug)
    #[arg(short, long)]
    pub logging: bool,

    /// Verbose server output
    #[arg(short = 'b', long)]
    pub verbose: bool,

    /// Production mode: disables debug, refresh and logging
    #[arg(short, long)]
    pub production: bool,

    /// Port to serve on
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// API host override forwarded to the server
    #[arg(long)]
    pub host: Option<String>,

    /// Directory containing server-side scripts, relative to <DIR>
    #[arg(long = "zerver-dir", value_name = "DIR")]
    pub zerver_dir: Option<String>,

    /// Cache manifest to manage (repeatable)
    #[arg(long = "manifest", value_name = "NAME", action = ArgAction::Append)]
    pub manifests: Vec<String>,

    /// Working directory to serve from (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<String>,
}
