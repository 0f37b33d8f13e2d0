//! Durable storage: SQLite schema, migrations, and the [`Store`] façade.

mod migrations;
mod sqlite;

pub use sqlite::{cosine_similarity, AccessRecord, Store, StorageError};
