pub mod app;
pub mod cli;
pub mod errors;
pub mod mcp;
pub mod services;
pub mod tools;
pub mod utils;
