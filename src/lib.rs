pub mod classify;
pub mod config;
pub mod error;
pub mod replace;
pub mod resolver;
pub mod schema;
pub mod search;
pub mod update;
