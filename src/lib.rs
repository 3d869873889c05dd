//! Core of the Launchpad desktop launcher.
//!
//! - `store`: tool records on disk, one JSON file per tool, plus copied icons
//! - `registry`: one live pty session per tool name, with output and exit events
//! - `output`: image files a tool has written to its output folder
//!
//! The Tauri shell in `src-tauri/` exposes these to the frontend.

pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod registry;
pub mod shell;
pub mod store;
pub mod tool;

pub use config::LauncherConfig;
pub use error::{Error, Result};
pub use events::{SessionBus, SessionData, SessionEvent, SessionEventSink, SessionExit};
pub use registry::{KillOutcome, ProcessRegistry, StartOutcome};
pub use store::ConfigStore;
pub use tool::ToolRecord;
