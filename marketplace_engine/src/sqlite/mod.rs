//! SQLite backend for the marketplace engine.
//!
//! The schema lives in `migrations/` and is embedded into the binary; call [`SqliteDatabase::migrate`] on startup.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
