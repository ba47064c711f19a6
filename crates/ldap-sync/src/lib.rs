//! Directory user import for dirsync.
//!
//! Reads users from LDAP / Active Directory and merges them into the local
//! front-end and back-end user tables.

pub mod client;
pub mod mapper;
pub mod messages;
pub mod observer;
pub mod sync;
pub mod task;

#[cfg(test)]
mod testing;
