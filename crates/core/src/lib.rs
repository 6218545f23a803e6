#![warn(clippy::all, missing_docs)]

//! Core domain logic for Game Vault.
//!
//! This crate hosts the game record model, the JSON-backed record store,
//! configuration handling and the platform launch dispatcher used by the
//! terminal UI and any future frontends.

pub mod catalog;
pub mod config;
pub mod error;
pub mod launch;
pub mod models;
pub mod store;

pub use catalog::{Catalog, Committed, FormTarget, Removed};
pub use config::{AppConfig, ThemeConfig};
pub use error::{LaunchError, RecordError, StoreError, ValidationError};
pub use launch::{Dispatcher, HostOs, LaunchAction, LaunchOutcome};
pub use models::{GameForm, GameRecord, RecordId, RecordPatch};
pub use store::{Library, LibraryStore, LoadSummary};
