//! Script execution for docsh
//!
//! Non-interactive input (`--file`, `--eval` and piped stdin) is read in full
//! and run through the console the same way interactive input is, line by
//! line with the same continuation rules.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::console::{Console, ScriptSummary};
use crate::error::Result;

/// Largest script accepted, in bytes.
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Script loader for reading script files
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    /// Maximum script size in bytes
    max_size_bytes: u64,
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE,
        }
    }

    /// Set maximum script size
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Load script from file
    ///
    /// # Arguments
    /// * `path` - Path to script file
    ///
    /// # Returns
    /// * `Result<String>` - Script content or error
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();

        let metadata = fs::metadata(path).map_err(|e| annotate(path, e))?;
        if metadata.len() > self.max_size_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{}: script too large ({} bytes, max {} bytes)",
                    path.display(),
                    metadata.len(),
                    self.max_size_bytes
                ),
            )
            .into());
        }

        let content = fs::read_to_string(path).map_err(|e| annotate(path, e))?;
        debug!("Loaded script {} ({} bytes)", path.display(), content.len());
        Ok(content)
    }

    /// Read the whole of `reader` as a script
    pub fn load_reader(&self, reader: impl Read) -> Result<String> {
        let mut content = String::new();
        reader
            .take(self.max_size_bytes + 1)
            .read_to_string(&mut content)?;
        if content.len() as u64 > self.max_size_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("script too large (max {} bytes)", self.max_size_bytes),
            )
            .into());
        }
        Ok(content)
    }
}

fn annotate(path: &Path, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {}", path.display(), err))
}

/// Run `source` through the console, printing to stdout and stderr
///
/// # Arguments
/// * `console` - Console holding the session
/// * `source` - Script text
///
/// # Returns
/// * `Result<ScriptSummary>` - Totals for the run
pub async fn run_script(console: &mut Console, source: &str) -> Result<ScriptSummary> {
    let mut out = io::stdout();
    let mut err = io::stderr();
    let summary = console.run_source(source, &mut out, &mut err).await?;
    out.flush()?;

    info!(
        "Script finished: {} statements, {} errors",
        summary.statements, summary.errors
    );
    Ok(summary)
}
