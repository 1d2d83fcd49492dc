//! Shell completion generation for docsh
//!
//! Generates completion scripts for bash, zsh, fish, PowerShell and elvish
//! from the clap command definition.

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::{ConfigError, DocshError, Result};

/// Binary name used in generated scripts.
const BIN_NAME: &str = "docsh";

/// Generate a shell completion script on stdout
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish, powershell, elvish)
///
/// # Returns
/// * `Result<()>` - Success or error
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    let mut stdout = io::stdout().lock();
    write_completion(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

/// Write the completion script for `shell` into `out`.
pub fn write_completion(shell: Shell, out: &mut impl Write) {
    let mut cmd = CliArgs::command();
    generate(shell, &mut cmd, BIN_NAME, out);
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" | "pwsh" => Ok(Shell::PowerShell),
        "elvish" => Ok(Shell::Elvish),
        _ => Err(DocshError::Config(ConfigError::Generic(format!(
            "Unsupported shell: {}. Supported shells: bash, zsh, fish, powershell, elvish",
            shell_name
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell() {
        assert!(matches!(parse_shell("bash"), Ok(Shell::Bash)));
        assert!(matches!(parse_shell("Zsh"), Ok(Shell::Zsh)));
        assert!(matches!(parse_shell("FISH"), Ok(Shell::Fish)));
        assert!(matches!(parse_shell("pwsh"), Ok(Shell::PowerShell)));
        assert!(parse_shell("tcsh").is_err());
    }

    #[test]
    fn test_bash_script_mentions_flags() {
        let mut buffer = Vec::new();
        write_completion(Shell::Bash, &mut buffer);
        let script = String::from_utf8(buffer).unwrap();
        assert!(script.contains("docsh"));
        assert!(script.contains("--offline"));
    }
}
