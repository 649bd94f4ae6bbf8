//! Prompt context construction
//!
//! Turns retrieved records into the numbered text blocks the answer
//! generation prompts cite against.

mod builder;

pub use builder::{build_context, build_rag_context, normalize_snippet, ContextMode};
