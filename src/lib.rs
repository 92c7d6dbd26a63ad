pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod grading;
pub mod handlers;
pub mod middleware;
pub mod promotion;
pub mod services;
pub mod types;
