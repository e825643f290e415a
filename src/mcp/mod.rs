//! MCP (Model Context Protocol) server: JSON-RPC over stdio.

pub mod handlers;
pub mod protocol;
pub mod reload;
pub mod server;
pub mod watcher;
