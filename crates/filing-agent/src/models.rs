//! These models represent the objects passed around by the agent
//!
//! There are several related formats we need to interact with:
//! - gemini contents/function declarations, sent from the agent to the LLM
//! - tool calls, sent from the agent to the systems providing capabilities
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the internal models are not an exact match to any of these formats.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
