//! CLI subcommand implementations
//!
//! Each stage is a separate invocation communicating only through the
//! persistent store; there is no in-process handoff between stages.

pub mod fetch;
pub mod render;
pub mod status;
pub mod summarize;
