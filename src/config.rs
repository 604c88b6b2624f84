use std::path::PathBuf;

use crate::cli::Cli;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_API_DIR: &str = "zerver";

/// Immutable run configuration, resolved once at startup and passed
/// explicitly to every component that needs it.
///
/// Precedence, lowest to highest: built-in defaults, the `PORT`
/// environment variable, `ZERVER` environment pairs, command-line
/// flags, the positional directory argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub port: u16,
    pub api_dir: String,
    pub debug: bool,
    pub refresh: bool,
    pub logging: bool,
    pub verbose: bool,
    pub production: bool,
    pub manifests: Vec<String>,
    pub api_host: Option<String>,
    /// Resolved working directory the server runs in.
    pub root: PathBuf,
}

impl ConfigSnapshot {
    pub fn resolve(cli: &Cli) -> Self {
        let env_config = std::env::var("ZERVER").ok();
        let env_port = std::env::var("PORT").ok();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve_from(cli, env_config.as_deref(), env_port.as_deref(), cwd)
    }

    /// Merge all configuration sources. Invalid environment values are
    /// warned about and skipped; flag validation happened in clap.
    pub fn resolve_from(
        cli: &Cli,
        env_config: Option<&str>,
        env_port: Option<&str>,
        cwd: PathBuf,
    ) -> Self {
        let mut port = DEFAULT_PORT;
        let mut api_dir = DEFAULT_API_DIR.to_string();
        let mut debug = false;
        let mut refresh = false;
        let mut logging = false;
        let mut verbose = false;
        let mut production = false;
        let mut manifests: Vec<String> = Vec::new();
        let mut api_host: Option<String> = None;

        if let Some(raw) = env_port {
            match raw.parse::<u16>() {
                Ok(p) if p > 0 => port = p,
                _ => eprintln!("[WARNING] ignoring invalid PORT={raw}"),
            }
        }

        if let Some(raw) = env_config {
            for pair in raw.split(',').filter(|p| !p.is_empty()) {
                let Some((key, value)) = pair.split_once('=') else {
                    eprintln!("[WARNING] ignoring malformed env entry {pair}");
                    continue;
                };
                match key {
                    "d" | "debug" => apply_env_bool("debug", value, &mut debug),
                    "r" | "refresh" => apply_env_bool("refresh", value, &mut refresh),
                    "l" | "logging" => apply_env_bool("logging", value, &mut logging),
                    "b" | "verbose" => apply_env_bool("verbose", value, &mut verbose),
                    "p" | "production" => apply_env_bool("production", value, &mut production),
                    "port" => match value.parse::<u16>() {
                        Ok(p) if p > 0 => port = p,
                        _ => eprintln!("[WARNING] ignoring invalid env port={value}"),
                    },
                    "host" => api_host = Some(value.to_string()),
                    _ => eprintln!("[WARNING] ignoring invalid env {key}={value}"),
                }
            }
        }

        // Flags only ever turn things on or override values.
        if cli.debug {
            debug = true;
        }
        if cli.refresh {
            refresh = true;
        }
        if cli.logging {
            logging = true;
        }
        if cli.verbose {
            verbose = true;
        }
        if cli.production {
            production = true;
        }
        if let Some(p) = cli.port {
            port = p;
        }
        if let Some(host) = &cli.host {
            api_host = Some(host.clone());
        }
        if let Some(dir) = &cli.zerver_dir {
            api_dir = dir.clone();
        }
        manifests.extend(cli.manifests.iter().cloned());

        // Production wins over every debug-family flag; otherwise any
        // debug-family flag pulls debug on.
        if production {
            debug = false;
            refresh = false;
            logging = false;
        } else if debug || refresh || logging {
            debug = true;
            production = false;
        }

        let root = match &cli.dir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        Self {
            port,
            api_dir,
            debug,
            refresh,
            logging,
            verbose,
            production,
            manifests,
            api_host,
            root,
        }
    }

    /// Positional argument vector handed to the server process, booleans
    /// encoded as the literal strings "1"/"0".
    pub fn child_args(&self) -> Vec<String> {
        vec![
            self.port.to_string(),
            self.api_dir.clone(),
            bool_arg(self.debug),
            bool_arg(self.refresh),
            bool_arg(self.logging),
            bool_arg(self.verbose),
            self.manifests.join(","),
            bool_arg(self.production),
            self.api_host.clone().unwrap_or_default(),
        ]
    }

    /// Absolute boundary for change classification: paths under it are
    /// server-source changes.
    pub fn api_root(&self) -> PathBuf {
        self.root.join(&self.api_dir)
    }
}

fn apply_env_bool(name: &str, value: &str, slot: &mut bool) {
    match value {
        "true" => *slot = true,
        "false" => *slot = false,
        _ => eprintln!("[WARNING] ignoring invalid env {name}={value}"),
    }
}

fn bool_arg(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
