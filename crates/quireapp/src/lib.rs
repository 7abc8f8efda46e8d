//! # Quire Architecture
//!
//! Quire is a **UI-agnostic library** for paginated research documents kept
//! in a tree of folders, notes and objects. The `quire` binary is one client
//! of it; a browser or desktop shell would be another.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (quire crate)                                    │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Resolves names and id prefixes to UUIDs                  │
//! │  - Holds the loaded tree, reloads it after each mutation    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Tree edits, note editing, export, resources, settings    │
//! │  - Built on doc/, editor/, pagination/, tree.rs             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - TreeBackend and ResourceBackend traits                   │
//! │  - LocalStore over files or memory, HttpBackend for a server│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<CmdResult>`)
//! - **Never** writes to stdout/stderr
//! - **Never** calls `std::process::exit`
//!
//! The document model, editor and paginator do no I/O at all. Text
//! measurement sits behind the [`pagination::Measure`] trait so a renderer
//! with real font metrics can replace the default estimate.
//!
//! ## Testing Strategy
//!
//! 1. **Core** (`doc/`, `editor/`, `pagination/`, `tree.rs`): unit tests of
//!    the model rules, commands and layout.
//! 2. **Commands** (`commands/*.rs`): run against `LocalStore<MemBackend>`,
//!    including failure paths.
//! 3. **API** (`api.rs`): dispatch, reference resolution, reload and banner.
//! 4. **CLI**: end-to-end runs of the binary against a temporary data dir.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Operations returning `CmdResult`
//! - [`doc`]: Document model, schema, HTML codec and export
//! - [`editor`]: Editor state, transactions, undo and the editing commands
//! - [`pagination`]: Page geometry, block measurement and page layout
//! - [`tree`]: The folder/note/object hierarchy and its rules
//! - [`references`]: Bibliography entries built on citation resources
//! - [`model`]: Stored records and resource payloads
//! - [`store`]: Backend traits and implementations
//! - [`config`]: Editor settings
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod doc;
pub mod editor;
pub mod error;
pub mod model;
pub mod pagination;
pub mod references;
pub mod store;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_utils;
