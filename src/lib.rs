//! XELIS stats bot library.
//!
//! Polls a XELIS node and a price ticker, formats the numbers and keeps them
//! in the names of Discord channels, one channel per metric. Channel ids are
//! stored in SQLite so restarts reuse the same channels.

pub mod catalog;
pub mod config;
pub mod database;
pub mod derive;
pub mod error;
pub mod platform;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod sources;
pub mod types;
