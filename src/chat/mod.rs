//! Chat agent client, used once the tunnel URL is known.

pub mod client;

pub use client::{ChatClient, ChatError, ChatMessage, ChatSession, Role};
