//! docsh - document database console
//!
//! An interactive console for a document database. Statements such as
//! `use`, `show dbs` and `db.inventory.find({ status: 'D' })` are parsed,
//! dispatched to the backend and rendered in shell or JSON notation.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode
//! docsh mongodb://localhost:27017
//!
//! # Without a server
//! docsh --offline
//!
//! # Run a script
//! docsh --offline --file session.js
//! ```

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use docsh::backend::Backend;
use docsh::backend::memory::MemoryBackend;
use docsh::backend::mongo::MongoBackend;
use docsh::cli::{CliInterface, RunMode};
use docsh::console::{Console, Outcome, ScriptSummary};
use docsh::error::Result;
use docsh::executor::Dispatcher;
use docsh::formatter::Formatter;
use docsh::parser::buffer::split_statements;
use docsh::repl::{ReadOutcome, ReplEngine, ShellPrompt};
use docsh::script::{self, ScriptLoader};
use docsh::session::SessionContext;

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or start the console
///
/// # Returns
/// * `Result<ExitCode>` - Process exit code or a startup error
async fn run() -> Result<ExitCode> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(ExitCode::SUCCESS);
    }

    let mode = cli.run_mode();
    let interactive = mode == RunMode::Interactive;
    if interactive {
        cli.print_banner();
    }

    let (backend, server_version) = setup_backend(&cli).await?;
    if let (true, Some(version)) = (interactive, &server_version) {
        cli.print_connection_info(version);
    }

    let mut console = create_console(&cli, backend)?;

    match mode {
        RunMode::Interactive => {
            run_repl_loop(&cli, &mut console).await?;
            println!("Goodbye!");
            Ok(ExitCode::SUCCESS)
        }
        RunMode::Eval(source) => finish_script(script::run_script(&mut console, &source).await?),
        RunMode::Script(path) => {
            let source = ScriptLoader::new().load_file(&path)?;
            finish_script(script::run_script(&mut console, &source).await?)
        }
        RunMode::Stdin => {
            let source = ScriptLoader::new().load_reader(io::stdin().lock())?;
            finish_script(script::run_script(&mut console, &source).await?)
        }
    }
}

/// Create the backend: in-memory when offline, otherwise a server connection
async fn setup_backend(cli: &CliInterface) -> Result<(Arc<dyn Backend>, Option<String>)> {
    if cli.args().offline {
        info!("Using in-memory backend");
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        return Ok((backend, None));
    }

    let backend = MongoBackend::connect(cli.connection_uri(), &cli.config().connection).await?;
    let server_version = match backend.server_version().await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!("Could not read server version: {}", e);
            None
        }
    };

    let backend: Arc<dyn Backend> = Arc::new(backend);
    Ok((backend, server_version))
}

fn create_console(cli: &CliInterface, backend: Arc<dyn Backend>) -> Result<Console> {
    let session = SessionContext::with_database(&cli.database())?;
    let dispatcher = Dispatcher::new(backend, cli.operation_timeout());

    let mut display = cli.config().display.clone();
    if !io::stdout().is_terminal() {
        display.color_output = false;
    }

    Ok(Console::new(
        dispatcher,
        session,
        Formatter::from_config(&display),
    ))
}

/// Read, run and print statements until `exit` or end of input
async fn run_repl_loop(cli: &CliInterface, console: &mut Console) -> Result<()> {
    let mut repl = ReplEngine::new(
        &cli.config().history,
        cli.config().display.color_output,
    );

    loop {
        let prompt = ShellPrompt::new(console.session().current_database(), cli.args().offline);

        let input = match repl.read_line(&prompt)? {
            ReadOutcome::Input(input) => input,
            ReadOutcome::Interrupted => continue,
            ReadOutcome::Eof => break,
        };

        for statement in split_statements(&input) {
            match console.run_interruptible(&statement).await {
                Outcome::Printed(Some(output)) => println!("{}", output),
                Outcome::Printed(None) => {}
                Outcome::Failed(error) => eprintln!("{}", error),
                Outcome::Exit => return Ok(()),
            }
        }
    }

    Ok(())
}

/// Exit code for a finished script
fn finish_script(summary: ScriptSummary) -> Result<ExitCode> {
    debug!("Script summary: {:?}", summary);
    if script_failed(&summary) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// A script fails when a statement errored and it did not end with `exit`.
fn script_failed(summary: &ScriptSummary) -> bool {
    summary.errors > 0 && !summary.exited
}

/// Initialize logging system based on verbosity level
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Arguments
/// * `cli` - CLI interface with the effective logging configuration
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_exit_codes() {
        let clean = ScriptSummary {
            statements: 3,
            errors: 0,
            exited: false,
        };
        assert!(!script_failed(&clean));

        let failed = ScriptSummary { errors: 1, ..clean };
        assert!(script_failed(&failed));

        let exited = ScriptSummary {
            exited: true,
            ..failed
        };
        assert!(!script_failed(&exited));
    }
}
