//! # CLI Layer
//!
//! This module is **one possible UI client** for jotter; it is not the application itself.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Persists the session between runs
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! A [`jotterapp::commands::Redirect::Login`] on any result means the
//! service rejected the credential: the session file is removed and the user
//! is told to log in again.

mod commands;
mod render;
mod session_file;
pub mod setup;
mod styles;

pub use commands::run;
