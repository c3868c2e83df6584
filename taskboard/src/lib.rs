//! `Taskboard`: personal task tracker library.

pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod export;
pub mod session;
pub mod tasks;
