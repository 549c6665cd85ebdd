//! aigate - OpenAI-compatible multi-provider AI gateway
//!
//! A single-process proxy that exposes an OpenAI-shaped HTTP API, validates
//! bearer tokens against a static allow-list, and forwards requests to the
//! upstream provider named by the `provider/model` prefix. Provider and
//! token tables are flat files, reloadable at runtime without a restart.

pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;

pub use config::Settings;
pub use error::{Error, Result};
