//! AI chat support: a report digest builder and the LLM provider seam.
//!
//! The providers are thin external collaborators — they only turn a
//! pre-computed textual digest of the cached reports into a prose answer.
//! No aggregation logic lives here.

pub mod digest;
pub mod provider;

pub use digest::{build_digest, ChatCategory};
pub use provider::{ChatError, ChatMessage, ChatProvider, OpenAiCompatProvider};

/// System prompt prepended to every provider call, ahead of the digest.
pub const SYSTEM_PROMPT: &str = "\
You are a data analyst for a small restaurant business. Answer questions \
using ONLY the report digest provided below; it is pre-aggregated from the \
point-of-sale exports. Quote concrete numbers, name the months you are \
referring to, and say so plainly when the digest does not cover a question. \
Keep answers short and practical.";
