//! Live adapters for real external interactions.

pub mod anthropic;
pub mod filesystem;
mod http;
pub mod openai;
