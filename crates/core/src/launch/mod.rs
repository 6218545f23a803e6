//! Launch dispatch.
//!
//! A launch path is classified into a [`PathShape`], and the pair
//! `(HostOs, PathShape)` selects a [`LaunchAction`]. Running the action is left
//! to a [`Dispatcher`], which talks to the OS through an [`Executor`].

mod executor;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::LaunchError;

pub use executor::{Dispatcher, Elevation, Executor, LaunchMethod, LaunchOutcome, SystemExecutor};

/// Operating system family the launch is planned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Linux and the BSDs.
    OtherUnix,
}

impl HostOs {
    /// Host this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::OtherUnix
        }
    }
}

/// Game launchers that register a URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriLauncher {
    /// `steam://`
    Steam,
    /// `epicgames://`
    Epic,
}

impl UriLauncher {
    /// URI prefix owned by the launcher.
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Steam => "steam://",
            Self::Epic => "epicgames://",
        }
    }

    /// Human readable launcher name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Steam => "Steam",
            Self::Epic => "Epic Games Launcher",
        }
    }
}

/// What a launch path looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    /// Nothing to launch.
    Empty,
    /// A Windows executable (`*.exe`, any case).
    Executable,
    /// A URI owned by a known launcher.
    LauncherUri(UriLauncher),
    /// Any other `scheme://` URI.
    OtherUri,
    /// A plain filesystem path.
    Plain,
}

static URI_SCHEME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("invalid uri scheme regex")
});

impl PathShape {
    /// Classify a launch path. Leading and trailing whitespace is ignored.
    pub fn classify(path: &str) -> Self {
        let path = path.trim();
        if path.is_empty() {
            return Self::Empty;
        }
        if path.to_lowercase().ends_with(".exe") {
            return Self::Executable;
        }
        for launcher in [UriLauncher::Steam, UriLauncher::Epic] {
            if path.starts_with(launcher.scheme()) {
                return Self::LauncherUri(launcher);
            }
        }
        if has_uri_scheme(path) {
            return Self::OtherUri;
        }
        Self::Plain
    }
}

pub(crate) fn has_uri_scheme(path: &str) -> bool {
    URI_SCHEME_RE.is_match(path)
}

/// OS-level mechanism chosen for a launch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchAction {
    /// Ask for administrator rights, then start the executable.
    Elevate {
        /// Executable path.
        path: String,
    },
    /// Hand a launcher URI to the shell.
    ShellOpenUri {
        /// URI to open.
        uri: String,
        /// Launcher owning the scheme.
        launcher: UriLauncher,
    },
    /// Let the OS start the file with its associated program.
    OsOpen {
        /// File path.
        path: String,
    },
    /// Run the desktop's generic open command on the path.
    GenericOpen {
        /// `open` or `xdg-open`.
        program: &'static str,
        /// Path or URI to open.
        path: String,
    },
}

impl LaunchAction {
    /// Whether the user must be asked before running the action.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::Elevate { .. })
    }

    /// Path or URI the action starts.
    pub fn target(&self) -> &str {
        match self {
            Self::Elevate { path } | Self::OsOpen { path } | Self::GenericOpen { path, .. } => {
                path
            }
            Self::ShellOpenUri { uri, .. } => uri,
        }
    }
}

/// Decide how to start `path` on `host`.
pub fn plan(path: &str, host: HostOs) -> Result<LaunchAction, LaunchError> {
    let shape = PathShape::classify(path);
    let path = path.trim().to_string();
    let action = match (host, shape) {
        (_, PathShape::Empty) => return Err(LaunchError::NoPath),
        (HostOs::Windows, PathShape::Executable) => LaunchAction::Elevate { path },
        (HostOs::Windows, PathShape::LauncherUri(launcher)) => LaunchAction::ShellOpenUri {
            uri: path,
            launcher,
        },
        (HostOs::Windows, _) => LaunchAction::OsOpen { path },
        (HostOs::MacOs, _) => LaunchAction::GenericOpen {
            program: "open",
            path,
        },
        (HostOs::OtherUnix, _) => LaunchAction::GenericOpen {
            program: "xdg-open",
            path,
        },
    };
    debug!(?host, ?shape, ?action, "Launch planned");
    Ok(action)
}
