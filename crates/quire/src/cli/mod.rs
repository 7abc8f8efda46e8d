//! # CLI Behavior
//!
//! This is **one possible UI client** for quire, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and
//! output formatting.
//!
//! ## Referring to Nodes
//!
//! Every command that takes a node accepts its name (case-insensitive) or the
//! first characters of its id, as shown by `quire tree --ids`. A name shared
//! by several nodes has to be given as an id.
//!
//! ## Naked Execution
//!
//! Running `quire` with no arguments shows the tree.
//!
//! ## Deleting
//!
//! `quire rm` prints what would be removed, including the number of nested
//! items, and asks before deleting. `--yes` skips the question; without a
//! terminal the question cannot be asked and `--yes` is required.
//!
//! ## Output
//!
//! `--json` prints the full command result as JSON instead of styled text.
//! Logs go to stderr; `QUIRE_LOG` or `RUST_LOG` set the filter, `--verbose`
//! raises the default to debug.
//!
//! ## Module Structure
//!
//! - `commands`: Context setup and per-command handlers
//! - `logging`: tracing subscriber setup
//! - `render`: Output formatting
//! - `setup`: Argument parsing via clap
//! - `styles`: Terminal styles

mod commands;
mod logging;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
