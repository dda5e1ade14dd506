//! MCP server surface

mod server;

pub use server::BakecalcService;
