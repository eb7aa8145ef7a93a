pub mod api_client;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod negotiate;
pub mod render;
pub mod server;
