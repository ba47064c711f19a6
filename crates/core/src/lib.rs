//! dirsync core: configuration, models, error type and local user storage.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
