//! Tools the model may request: the [`Tool`] trait, the ambient
//! [`ToolContext`] handed to every invocation, an explicitly constructed
//! [`ToolRegistry`], and the built-in memory and session tools.

pub mod memory;
pub mod registry;
pub mod session;
pub mod tool;

pub use memory::{RecallTool, SaveFactTool};
pub use registry::{ToolDispatch, ToolRegistry};
pub use session::SessionRecallTool;
pub use tool::{Tool, ToolContext, ToolOutput};
