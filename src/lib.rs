pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod deadline;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod idp;
pub mod messages;
pub mod middleware;
pub mod services;
