pub mod app;
pub mod catalog;
pub mod config;
pub mod reconcile;
pub mod text;
pub mod tmdb;
