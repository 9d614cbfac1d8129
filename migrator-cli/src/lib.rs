//! migrator CLI - command-line front end for `migrator-engine`.
//!
//! Resolves configuration from `migrator.toml`, `.env`, the environment and
//! flags, installs logging, and dispatches `status`, `apply`, `rollback`,
//! `redo` and `create` to the engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
