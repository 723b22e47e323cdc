//! Tool execution seam
//!
//! The generation loop only knows about [`ToolExecutor`]; the merged MCP tool set
//! implements it.

pub mod executor;

pub use executor::{ToolError, ToolExecutor};
