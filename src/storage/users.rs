// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Username and email are unique. Both are enforced through index tables
//! written in the same transaction as the user record, so a collision aborts
//! the whole insert.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::{next_id, StorageError, StorageResult, USERS, USERS_BY_EMAIL, USERS_BY_USERNAME};
use crate::auth::Role;

const USER_SEQUENCE: &str = "users";

/// Registered account as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    /// "First Last", trimmed when either part is empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Fields supplied by the caller when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserRepository<'a> {
    db: &'a redb::Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a redb::Database) -> Self {
        Self { db }
    }

    /// Insert a new, enabled user and return it with its assigned id.
    ///
    /// Fails with [`StorageError::AlreadyExists`] when the username or email
    /// is taken; the username is checked first.
    pub fn create(&self, new_user: NewUser) -> StorageResult<StoredUser> {
        let email = email_key(&new_user.email);

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut by_username = write_txn.open_table(USERS_BY_USERNAME)?;
            if by_username.get(new_user.username.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "username {}",
                    new_user.username
                )));
            }
            let mut by_email = write_txn.open_table(USERS_BY_EMAIL)?;
            if by_email.get(email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("email {email}")));
            }

            let id = next_id(&write_txn, USER_SEQUENCE)?;
            let user = StoredUser {
                id,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                role: new_user.role,
                enabled: true,
                created_at: Utc::now(),
            };

            let json = serde_json::to_vec(&user)?;
            write_txn.open_table(USERS)?.insert(id, json.as_slice())?;
            by_username.insert(user.username.as_str(), id)?;
            by_email.insert(email.as_str(), id)?;
            user
        };
        write_txn.commit()?;

        Ok(user)
    }

    pub fn get(&self, id: u64) -> StorageResult<StoredUser> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("User {id}"))),
        }
    }

    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        let id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(USERS_BY_USERNAME)?;
            index.get(username)?.map(|v| v.value())
        };
        id.map(|id| self.get(id)).transpose()
    }

    /// Email lookups are case-insensitive.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let key = email_key(email);
        let id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(USERS_BY_EMAIL)?;
            index.get(key.as_str())?.map(|v| v.value())
        };
        id.map(|id| self.get(id)).transpose()
    }

    pub fn username_exists(&self, username: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USERS_BY_USERNAME)?;
        Ok(index.get(username)?.is_some())
    }

    pub fn email_exists(&self, email: &str) -> StorageResult<bool> {
        let key = email_key(email);
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USERS_BY_EMAIL)?;
        Ok(index.get(key.as_str())?.is_some())
    }

    /// All users ordered by id.
    pub fn list(&self) -> StorageResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }

    /// Enable or disable an account.
    pub fn set_enabled(&self, id: u64, enabled: bool) -> StorageResult<StoredUser> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut table = write_txn.open_table(USERS)?;
            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("User {id}")))?;
                existing.value().to_vec()
            };
            let mut user: StoredUser = serde_json::from_slice(&existing_bytes)?;
            user.enabled = enabled;
            let json = serde_json::to_vec(&user)?;
            table.insert(id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }
}
