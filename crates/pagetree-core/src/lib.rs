//! pagetree-core library.
//!
//! In-memory page tree with expansion, search, drag-and-drop validation
//! and inline creation, plus the persistence ports it talks to.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums with a stable [`error::ErrorCode`];
//!   `anyhow::Result` where files or databases are opened.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod db;
pub mod error;
pub mod expansion;
pub mod export;
pub mod interaction;
pub mod model;
pub mod navigator;
pub mod port;
pub mod render;
pub mod satellite;
pub mod tree;

pub use navigator::{NavError, NavEvent, Navigator, Notice, NoticeLevel};
