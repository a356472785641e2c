//! # yargi-mcp
//!
//! MCP server exposing nine Turkish legal decision databases as a uniform
//! tool surface. The heavy lifting lives in `yargi-core`; this crate binds
//! each adapter capability to a named tool with a validated input schema and
//! serves the result over streamable HTTP and legacy SSE.

/// Mapping from adapter errors to MCP tool errors.
pub mod error;
/// The MCP server and its tool surface.
pub mod server;
/// Registry-level input validation.
pub mod validate;

pub use server::YargiMcpServer;
