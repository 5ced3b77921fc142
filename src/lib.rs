// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod actions;
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod game;
pub mod protocol;
pub mod session;
