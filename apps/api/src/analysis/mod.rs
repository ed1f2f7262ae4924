//! Analysis — the resume analysis pipeline and its HTTP surface.

pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
