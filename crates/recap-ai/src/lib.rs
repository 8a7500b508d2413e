//! Summary-email generation: prompt construction, the Gemini client and
//! parsing of the model's JSON-shaped reply.
//!
//! All calls to the external model go through [`TextGenerator`]; nothing
//! else in the workspace talks to the vendor API directly.

pub mod client;
pub mod extract;
pub mod generator;
pub mod prompts;

pub use client::{ClientError, GeminiClient, GeminiConfig, TextGenerator};
pub use generator::{EmailDraft, GenerationError, generate_monthly, generate_weekly};
