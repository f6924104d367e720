mod client;
mod responses;

pub use client::{OpenAIConfig, OpenAIProvider, OPENAI_API_BASE};
pub use responses::{build_responses_request, ResponseStreamEvent, ResponsesSseParser};
