// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client record repository.
//!
//! Clients are created once and read in bulk. Records are keyed by their
//! numeric id, so table iteration yields them in creation order.

use chrono::{DateTime, NaiveDate, Utc};
use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata};
use serde::{Deserialize, Serialize};

use super::{next_id, StorageError, StorageResult, CLIENTS};

const CLIENT_SEQUENCE: &str = "clients";

/// Client record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredClient {
    pub id: u64,
    pub name: String,
    pub last_name: String,
    /// Age as reported at creation time.
    pub age: i32,
    pub birth_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredClient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub last_name: String,
    pub age: i32,
    pub birth_date: NaiveDate,
}

pub struct ClientRepository<'a> {
    db: &'a redb::Database,
}

impl<'a> ClientRepository<'a> {
    pub fn new(db: &'a redb::Database) -> Self {
        Self { db }
    }

    pub fn create(&self, new_client: NewClient) -> StorageResult<StoredClient> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let client = {
            let id = next_id(&write_txn, CLIENT_SEQUENCE)?;
            let client = StoredClient {
                id,
                name: new_client.name,
                last_name: new_client.last_name,
                age: new_client.age,
                birth_date: new_client.birth_date,
                created_at: now,
                updated_at: now,
            };
            let json = serde_json::to_vec(&client)?;
            write_txn.open_table(CLIENTS)?.insert(id, json.as_slice())?;
            client
        };
        write_txn.commit()?;
        Ok(client)
    }

    pub fn get(&self, id: u64) -> StorageResult<StoredClient> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("Client {id}"))),
        }
    }

    /// All clients in creation order.
    pub fn list(&self) -> StorageResult<Vec<StoredClient>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        let mut clients = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            clients.push(serde_json::from_slice(value.value())?);
        }
        Ok(clients)
    }

    /// One page of clients in creation order plus the total record count.
    ///
    /// `page` is zero-based. A page past the end is empty.
    pub fn list_page(&self, page: u64, size: u64) -> StorageResult<(Vec<StoredClient>, u64)> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        let total = table.len()?;

        let offset = usize::try_from(page.saturating_mul(size)).unwrap_or(usize::MAX);
        let limit = usize::try_from(size).unwrap_or(usize::MAX);

        let mut clients = Vec::with_capacity(limit.min(128));
        for entry in table.iter()?.skip(offset).take(limit) {
            let (_, value) = entry?;
            clients.push(serde_json::from_slice(value.value())?);
        }
        Ok((clients, total))
    }

    /// Reported ages of every client, ascending.
    pub fn all_ages_sorted(&self) -> StorageResult<Vec<i32>> {
        let mut ages: Vec<i32> = self.list()?.into_iter().map(|c| c.age).collect();
        ages.sort_unstable();
        Ok(ages)
    }
}
