use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use tracing::{debug, info, warn};

use super::{has_uri_scheme, plan, HostOs, LaunchAction, UriLauncher};
use crate::error::LaunchError;

/// OS side effects needed to start a game. Every call returns once the OS
/// accepted the start request; nothing waits for the game itself.
pub trait Executor {
    /// Start an executable with administrator rights.
    fn run_elevated(&self, path: &str) -> io::Result<()>;
    /// Hand a URI to the shell's protocol handler.
    fn shell_open(&self, uri: &str) -> io::Result<()>;
    /// Start a file with the program associated to it by the OS.
    fn os_open(&self, path: &str) -> io::Result<()>;
    /// Run `program path`.
    fn generic_open(&self, program: &str, path: &str) -> io::Result<()>;
    /// Whether a filesystem path exists.
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

/// [`Executor`] spawning real, detached processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_elevated(&self, path: &str) -> io::Result<()> {
        spawn_detached(elevated_command(path))
    }

    fn shell_open(&self, uri: &str) -> io::Result<()> {
        spawn_detached(explorer_command(uri))
    }

    fn os_open(&self, path: &str) -> io::Result<()> {
        spawn_detached(explorer_command(path))
    }

    fn generic_open(&self, program: &str, path: &str) -> io::Result<()> {
        let mut command = Command::new(program);
        command.arg(path);
        spawn_detached(command)
    }
}

fn elevated_command(path: &str) -> Command {
    let script = format!(
        "Start-Process -FilePath '{}' -Verb RunAs",
        path.replace('\'', "''")
    );
    let mut command = Command::new("powershell");
    command.arg("-NoProfile").arg("-Command").arg(script);
    command
}

// explorer resolves the file association itself; the path never reaches cmd.exe
fn explorer_command(target: &str) -> Command {
    let mut command = Command::new("explorer");
    command.arg(target);
    command
}

fn spawn_detached(mut command: Command) -> io::Result<()> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = command.spawn()?;
    let pid = child.id();
    debug!(pid, program = ?command.get_program(), "Spawned launcher process");
    thread::Builder::new()
        .name("launch-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(pid, %status, "Launcher process exited"),
            Err(err) => warn!(pid, "Failed to wait for launcher process: {err}"),
        })?;
    Ok(())
}

/// Whether the elevation prompt was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Run with administrator rights.
    Confirmed,
    /// Run normally.
    Declined,
}

/// Mechanism that ended up starting the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMethod {
    /// Elevated start.
    Elevated,
    /// Launcher URI handed to the shell.
    ShellUri(UriLauncher),
    /// OS file association.
    OsOpen,
    /// Desktop open command.
    GenericOpen(&'static str),
}

/// Start request accepted by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// How the game was started.
    pub method: LaunchMethod,
    /// Path or URI that was started.
    pub target: String,
    /// Set when an elevated start failed and a standard start was used instead.
    pub fell_back: bool,
}

/// Runs [`LaunchAction`]s against an [`Executor`].
#[derive(Debug, Clone, Default)]
pub struct Dispatcher<E = SystemExecutor> {
    executor: E,
}

impl Dispatcher<SystemExecutor> {
    /// Dispatcher spawning real processes.
    pub fn system() -> Self {
        Self::new(SystemExecutor)
    }
}

impl<E: Executor> Dispatcher<E> {
    /// Dispatcher using a custom executor.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Executor in use.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Plan and run in one go. `confirm` is only asked for actions that need it.
    pub fn launch(
        &self,
        path: &str,
        host: HostOs,
        confirm: impl FnOnce(&LaunchAction) -> bool,
    ) -> Result<LaunchOutcome, LaunchError> {
        let action = plan(path, host)?;
        let elevation = if action.needs_confirmation() && confirm(&action) {
            Elevation::Confirmed
        } else {
            Elevation::Declined
        };
        self.execute(&action, elevation)
    }

    /// Run a planned action.
    ///
    /// A declined [`LaunchAction::Elevate`] runs as a standard start. A failed
    /// elevated start falls back to a standard start before reporting an error.
    pub fn execute(
        &self,
        action: &LaunchAction,
        elevation: Elevation,
    ) -> Result<LaunchOutcome, LaunchError> {
        let outcome = match action {
            LaunchAction::Elevate { path } => match elevation {
                Elevation::Declined => self.os_open(path)?,
                Elevation::Confirmed => match self.executor.run_elevated(path) {
                    Ok(()) => LaunchOutcome {
                        method: LaunchMethod::Elevated,
                        target: path.clone(),
                        fell_back: false,
                    },
                    Err(refused) => {
                        warn!(path = %path, "Elevated launch failed, falling back to standard launch: {refused}");
                        let mut outcome = self.os_open(path).map_err(|fallback| {
                            LaunchError::ElevationFallback {
                                elevation: refused,
                                fallback: Box::new(fallback),
                            }
                        })?;
                        outcome.fell_back = true;
                        outcome
                    }
                },
            },
            LaunchAction::ShellOpenUri { uri, launcher } => {
                self.executor
                    .shell_open(uri)
                    .map_err(|source| LaunchError::UriHandler {
                        uri: uri.clone(),
                        launcher: launcher.label(),
                        source,
                    })?;
                LaunchOutcome {
                    method: LaunchMethod::ShellUri(*launcher),
                    target: uri.clone(),
                    fell_back: false,
                }
            }
            LaunchAction::OsOpen { path } => self.os_open(path)?,
            LaunchAction::GenericOpen { program, path } => {
                self.ensure_exists(path)?;
                self.executor
                    .generic_open(program, path)
                    .map_err(|source| spawn_error(path, source))?;
                LaunchOutcome {
                    method: LaunchMethod::GenericOpen(*program),
                    target: path.clone(),
                    fell_back: false,
                }
            }
        };
        info!(launch_target = %outcome.target, method = ?outcome.method, fell_back = outcome.fell_back, "Launch requested");
        Ok(outcome)
    }

    fn os_open(&self, path: &str) -> Result<LaunchOutcome, LaunchError> {
        self.ensure_exists(path)?;
        self.executor
            .os_open(path)
            .map_err(|source| spawn_error(path, source))?;
        Ok(LaunchOutcome {
            method: LaunchMethod::OsOpen,
            target: path.to_string(),
            fell_back: false,
        })
    }

    fn ensure_exists(&self, path: &str) -> Result<(), LaunchError> {
        if has_uri_scheme(path) || self.executor.exists(path) {
            Ok(())
        } else {
            Err(LaunchError::NotFound(PathBuf::from(path)))
        }
    }
}

fn spawn_error(path: &str, source: io::Error) -> LaunchError {
    LaunchError::Spawn {
        target: path.to_string(),
        source,
    }
}
