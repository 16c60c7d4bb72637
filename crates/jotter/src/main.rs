//! # Jotter CLI Architecture
//!
//! Jotter ships with a command-line client, but the binary is intentionally thin:
//! the CLI lives in `src/cli/`, while this file only starts the runtime, invokes
//! `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/jotterapp/`: Client library: store, lifecycle engine, REST boundary
//! - `crates/jotter/`: This CLI tool, depends on the `jotterapp` library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/jotter/src/cli/)                         │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Session file + dispatch to the facade (commands.rs)      │
//! │  - Terminal rendering with console styles (render.rs)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/jotterapp/src/api.rs)                    │
//! │  - Holds the session, folds every failure into a CmdResult  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands + Store + Remote (crates/jotterapp/src/...)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each invocation is a fresh process, so the client store starts empty and
//! only the session survives between runs (see `cli::session_file`).
//!
//! ## Exit Codes
//!
//! A command whose result carries a failure prints its error messages to
//! stderr and exits with status 1. Everything else exits 0.
//!
//! ## Logging
//!
//! Diagnostics go through `tracing` to stderr. The filter comes from
//! `JOTTER_LOG` (or `RUST_LOG`), defaulting to `warn`; `--verbose` raises it
//! to `debug`.

mod cli;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
