pub mod ask;
pub mod chat;
pub mod config;
pub mod schema;
