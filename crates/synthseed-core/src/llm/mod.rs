pub mod client;
pub mod parse;
pub mod prompt;

pub use client::{LlmProvider, TextGenerator};
