pub mod app;
pub mod config;
pub mod models;
pub mod streaming;
pub mod tmdb;
