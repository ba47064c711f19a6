pub mod common;
pub mod directory;
pub mod mapping;
pub mod sync;
pub mod user;
