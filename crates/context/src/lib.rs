//! CiteGraph context library
//!
//! Assembles retrieved chunks into grounded prompts and drives the
//! answer/follow-up conversation loop.

pub mod prompts;
pub mod session;

pub use session::{RagSession, SessionOptions};
