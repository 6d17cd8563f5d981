//! Logger setup. Runtime code logs through the `log` facade only; this is the
//! one place `env_logger` is wired in.

mod init;

pub use init::{LoggingConfig, init_logging};
