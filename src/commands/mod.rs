//! Type-safe tool argument modules.
//!
//! Each struct implements `ToolArgs` and maps Rust fields to the exact flags the
//! corresponding `hdcryptmgr` subcommand (or `lslv`) expects.

pub mod auth;
pub mod status;
