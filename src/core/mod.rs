//! # Core Application Logic
//!
//! Everything pgdeck does apart from drawing: talking to the server,
//! rendering the configuration report, and handing the terminal to
//! external programs. It knows nothing about ratatui.
//!
//! ```text
//!   ┌──────────┐  query   ┌──────────┐  render  ┌──────────┐
//!   │  source  │ ───────► │  runner  │ ◄─────── │  render  │
//!   │ (psql)   │          │          │          └──────────┘
//!   └──────────┘          │          │  spawn   ┌──────────┐
//!                         │          │ ───────► │ external │
//!   ┌──────────┐  phase   │          │          └──────────┘
//!   │ session  │ ◄─────── │          │
//!   └──────────┘          └────┬─────┘
//!                              │ UiControl
//!                              ▼
//!                         TUI adapter
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct — state for one run of the UI loop
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`config`]: Layered configuration (file, env, CLI)
//! - [`source`]: Server queries through `psql`
//! - [`render`]: Plain-text table rendering for the pager
//! - [`external`]: Pager, editor and psql launching
//! - [`session`]: Connection origin, handoff phases, deferred errors
//! - [`runner`]: The terminal handoff itself

pub mod action;
pub mod config;
pub mod external;
pub mod render;
pub mod runner;
pub mod session;
pub mod source;
pub mod state;
