pub mod backends;
pub mod client;
pub mod config;
pub mod conversation;
pub mod prompt;

pub use backends::ModelBackend;
pub use client::ModelClient;
pub use config::{ModelConfig, ModelProvider};
pub use conversation::{Conversation, TurnRequest};
pub use prompt::compose_prompt;
