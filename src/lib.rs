pub mod app;
pub mod assemble;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod identity;
pub mod output;
pub mod store;
pub mod text;
