//! # Jotter Architecture
//!
//! Jotter is a **UI-agnostic client library** for a notes and todos service.
//! The remote service owns the data; this crate keeps a local mirror of it
//! consistent while items are fetched page by page and moved through their
//! lifecycle. The `jotter` binary is one client of it.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (jotter crate)                                         │
//! │  - Parses arguments, renders results, persists the session  │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs, autosave.rs)                            │
//! │  - Thin facade over commands, owns the session              │
//! │  - Turns every outcome into one CmdResult                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Call the service, apply confirmed data to the store      │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                               │
//!                  ▼                               ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │  Client Store (store/)        │ │  Remote (remote/)         │
//! │  - Partitioned collections    │ │  - RemoteService trait    │
//! │  - Pinned, home, search       │ │  - HttpRemote, MemRemote  │
//! │  - Task sub-collection        │ │  - Response normalization │
//! └───────────────────────────────┘ └───────────────────────────┘
//! ```
//!
//! ## Key Principle: The Server Decides
//!
//! Nothing is flipped locally in anticipation of a response. A command sends
//! its request, and only the item the service returns is written to the
//! store. Where a moved item lands in a paginated view is left to the next
//! fetch of that view.
//!
//! ## Testing Strategy
//!
//! 1. **Store** (`store/*.rs`): consistency rules on plain values.
//! 2. **Commands** (`commands/*.rs`): business logic against [`remote::MemRemote`],
//!    an in-process service that answers in the real service's shapes.
//! 3. **API** (`api.rs`): session handling and failure folding.
//! 4. **Integration** (`tests/`): end-to-end scenarios through the facade.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`autosave`]: Debounced saving for editing views
//! - [`commands`]: Business logic for each operation
//! - [`store`]: The client-side mirror of the service's collections
//! - [`remote`]: Service contract, HTTP client, in-process service
//! - [`model`]: Notes, todos, tasks, users
//! - [`lifecycle`]: Item lifecycle states and the legal moves between them
//! - [`pagination`]: Page descriptors and how partial server data merges in
//! - [`ordering`]: Display order of list views
//! - [`session`]: The logged-in user's credential
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod autosave;
pub mod commands;
pub mod config;
mod de;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ordering;
pub mod pagination;
pub mod remote;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use api::JotterApi;
pub use error::{JotterError, Result};
