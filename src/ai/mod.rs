//! AI completion service client

mod openai;

pub use openai::{AiClientError, OpenAiClient};
