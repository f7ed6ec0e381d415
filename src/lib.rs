pub mod app;
pub mod config;
pub mod db;
pub mod email;
pub mod format;
pub mod models;
pub mod notion;
pub mod prompt;
pub mod select;
