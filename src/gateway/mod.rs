//! HTTP gateway module.
//!
//! The OpenAI-compatible HTTP surface: request handlers, wire types, and
//! upstream provider calls.

mod handlers;
mod server;
pub mod types;
pub mod upstream;

pub use handlers::REQUEST_ID_HEADER;
pub use server::{create_router, run_server, AppState};
pub use types::{ChatCompletionRequest, Message, MessageContent, ModelEntry, ModelsResponse};
