//! VPN Client Commands
//!
//! The VPN client is driven through its CLI. [`CommandRunner`] is the
//! seam: [`MullvadCli`] spawns the real binary, tests substitute a
//! scripted runner.

use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::debug;

/// Command execution errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Home directory unavailable")]
    NoHomeDir,

    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Executes VPN client commands
pub trait CommandRunner {
    /// Run a read command and capture its standard output
    fn output(&self, args: &[&str]) -> Result<String, CommandError>;

    /// Run an action command, requiring a zero exit code
    fn run(&self, args: &[&str]) -> Result<(), CommandError>;
}

/// Runs the installed `mullvad` binary
#[derive(Debug, Clone)]
pub struct MullvadCli {
    /// Program name or path
    program: String,
}

impl MullvadCli {
    /// Create a runner for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn execute(&self, args: &[&str]) -> Result<Output, CommandError> {
        let home: PathBuf = dirs::home_dir().ok_or(CommandError::NoHomeDir)?;
        let command = self.command_line(args);

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(home)
            .output()
            .map_err(|source| CommandError::Launch {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::Exit {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("ran {}", command);
        Ok(output)
    }
}

impl Default for MullvadCli {
    fn default() -> Self {
        Self::new("mullvad")
    }
}

impl CommandRunner for MullvadCli {
    fn output(&self, args: &[&str]) -> Result<String, CommandError> {
        let output = self.execute(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run(&self, args: &[&str]) -> Result<(), CommandError> {
        self.execute(args).map(|_| ())
    }
}
