pub mod cache;
pub mod client;
pub mod gemini;
pub mod media;
pub mod openai;
pub mod prompts;
pub mod provider;

pub use cache::*;
pub use client::*;
pub use gemini::*;
pub use openai::*;
pub use prompts::*;
pub use provider::*;
