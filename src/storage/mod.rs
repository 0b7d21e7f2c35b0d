// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Embedded persistence backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized [`StoredUser`]
//! - `users_by_username`: username → user id (unique index)
//! - `users_by_email`: lowercase email → user id (unique index)
//! - `clients`: client id → serialized [`StoredClient`]
//! - `sequences`: sequence name → last assigned id
//!
//! When no data directory is configured the database lives in memory and is
//! discarded on shutdown.

pub mod clients;
pub mod page_cache;
pub mod users;

use std::path::Path;

use redb::backends::InMemoryBackend;
use redb::{ReadableTable, TableDefinition, WriteTransaction};

pub use clients::{ClientRepository, NewClient, StoredClient};
pub use page_cache::ClientPageCache;
pub use users::{NewUser, StoredUser, UserRepository};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub(crate) const USERS_BY_USERNAME: TableDefinition<&str, u64> = TableDefinition::new("users_by_username");
pub(crate) const USERS_BY_EMAIL: TableDefinition<&str, u64> = TableDefinition::new("users_by_email");
pub(crate) const CLIENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("clients");

/// Sequence name → last id handed out.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Handle to the embedded database shared by all repositories.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        tracing::info!(path = %path.display(), "opened database");
        Self::initialize(db)
    }

    /// Create a volatile database held entirely in memory.
    pub fn in_memory() -> StorageResult<Self> {
        let db = redb::Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::initialize(db)
    }

    /// Pre-create all tables so later read transactions don't fail.
    fn initialize(db: redb::Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_USERNAME)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(CLIENTS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.db)
    }

    pub fn clients(&self) -> ClientRepository<'_> {
        ClientRepository::new(&self.db)
    }

    /// Cheap round trip used by the health check.
    pub fn ping(&self) -> StorageResult<()> {
        use redb::ReadableDatabase;

        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

/// Advance the named sequence inside `txn` and return the new id (starts at 1).
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn in_memory_database_is_usable() {
        let db = Database::in_memory().unwrap();
        db.ping().unwrap();
        assert!(db.clients().list().unwrap().is_empty());
        assert!(db.users().list().unwrap().is_empty());
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let db = Database::in_memory().unwrap();
        let txn = db.db.begin_write().unwrap();
        assert_eq!(next_id(&txn, "test").unwrap(), 1);
        assert_eq!(next_id(&txn, "test").unwrap(), 2);
        assert_eq!(next_id(&txn, "other").unwrap(), 1);
        txn.commit().unwrap();
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("registry.redb");

        {
            let db = Database::open(&path).unwrap();
            db.users()
                .create(NewUser {
                    username: "jdoe".into(),
                    email: "jdoe@example.com".into(),
                    password_hash: "hash".into(),
                    first_name: "John".into(),
                    last_name: "Doe".into(),
                    role: crate::auth::Role::User,
                })
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let user = db.users().find_by_username("jdoe").unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "jdoe@example.com");
    }
}
