/*!
 * Database module for persistent storage of the term cache.
 *
 * This module provides SQLite-based persistence for externally-fetched
 * term sets so they survive across jobs and processes.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
