//! Command-line interface for docsh
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Mode selection (interactive, `--eval`, `--file`, piped stdin)
//! - Subcommands (`version`, `completion`, `config`)

pub mod completion;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::backend::mongo::sanitize_uri;
use crate::config::{Config, LogLevel, OutputFormat};
use crate::error::Result;

/// Extract the database name from a connection URI
///
/// # Arguments
/// * `uri` - Connection URI, `mongodb://[user:pass@]host[:port][/database][?options]`
///
/// # Returns
/// * `Option<String>` - Database name if the URI has a path
fn extract_database_from_uri(uri: &str) -> Option<String> {
    let after_scheme = uri.split("://").nth(1)?;
    let path = after_scheme.split_once('/')?.1;
    let name = path.split('?').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

/// docsh - interactive console for document databases
#[derive(Parser, Debug)]
#[command(
    name = "docsh",
    version,
    about = "Interactive console for document databases",
    long_about = "An interactive query console speaking the familiar shell syntax
(db.collection.find(...), use, show, var) against a live deployment or an
in-memory offline backend."
)]
pub struct CliArgs {
    /// Connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    /// Database to start in
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Output format (shell, json, json-pretty)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Use the in-memory backend instead of connecting
    #[arg(long)]
    pub offline: bool,

    /// Evaluate statements and exit
    #[arg(long, value_name = "STATEMENTS", conflicts_with = "file")]
    pub eval: Option<String>,

    /// Run statements from a script file and exit
    #[arg(short = 'f', long, value_name = "SCRIPT")]
    pub file: Option<PathBuf>,

    /// Timeout for a single backend operation in milliseconds
    #[arg(long = "timeout-ms", value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,

    /// Quiet mode (minimal output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for docsh
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// Where statements come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Line editor on a terminal
    Interactive,
    /// `--eval` text
    Eval(String),
    /// `--file` script
    Script(PathBuf),
    /// Statements piped on stdin
    Stdin,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration (file, environment, then CLI overrides)
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration and apply CLI overrides
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Override configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_display_args(config, args);
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
    }

    fn apply_display_args(config: &mut Config, args: &CliArgs) {
        if let Some(format_str) = &args.format {
            config.display.format = format_str.parse().unwrap_or_else(|_| {
                eprintln!("Warning: Unknown format '{}', using shell", format_str);
                OutputFormat::Shell
            });
        }

        if args.no_color {
            config.display.color_output = false;
        }
    }

    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(timeout) = args.timeout_ms {
            config.connection.operation_timeout_ms = timeout;
        }
    }

    /// Connection URI after CLI, environment and file precedence
    pub fn connection_uri(&self) -> &str {
        &self.config.connection.uri
    }

    /// Get the database name to start in
    ///
    /// Priority:
    /// 1. `--database` argument
    /// 2. Database path of the connection URI
    /// 3. Configured default database
    ///
    /// # Returns
    /// * `String` - Database name
    pub fn database(&self) -> String {
        if let Some(db) = &self.args.database {
            return db.clone();
        }
        if let Some(db) = extract_database_from_uri(self.connection_uri()) {
            return db;
        }
        self.config.connection.default_database.clone()
    }

    pub fn operation_timeout(&self) -> Duration {
        self.config.operation_timeout()
    }

    /// Decide where statements are read from
    pub fn run_mode(&self) -> RunMode {
        if let Some(eval) = &self.args.eval {
            RunMode::Eval(eval.clone())
        } else if let Some(file) = &self.args.file {
            RunMode::Script(file.clone())
        } else if std::io::stdin().is_terminal() {
            RunMode::Interactive
        } else {
            RunMode::Stdin
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if a subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn show_version(&self) {
        println!("docsh version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults are in effect");
            return;
        }

        match Config::from_file(&path).and_then(|config| config.validate()) {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => println!("Configuration is invalid: {}", e),
        }
    }

    fn show_config(&self) -> Result<()> {
        println!("# Configuration file: {}", self.get_config_path().display());
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }

    /// Print banner with version and connection target
    pub fn print_banner(&self) {
        if self.args.quiet {
            return;
        }
        if self.args.offline {
            println!("Connecting to: memory:// (offline)");
        } else {
            println!("Connecting to: {}", sanitize_uri(self.connection_uri()));
        }
        println!("Using docsh: {}", env!("CARGO_PKG_VERSION"));
    }

    /// Print server version after connecting
    pub fn print_connection_info(&self, server_version: &str) {
        if !self.args.quiet {
            println!("Using server: {}", server_version);
        }
    }
}
