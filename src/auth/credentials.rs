// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification and account registration.
//!
//! Passwords are stored as Argon2id PHC strings. Hashing and verification are
//! CPU-bound; async callers should run these functions on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::error::CredentialError;
use super::roles::Role;
use crate::storage::{Database, NewUser, StorageError, StoredUser};

/// Fields needed to create an account. Input is expected to be validated.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored hash.
///
/// A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Resolve a username, or failing that an email address, to an account.
pub fn find_by_identifier(db: &Database, identifier: &str) -> Result<StoredUser, CredentialError> {
    let users = db.users();
    if let Some(user) = users.find_by_username(identifier)? {
        return Ok(user);
    }
    if let Some(user) = users.find_by_email(identifier)? {
        return Ok(user);
    }
    Err(CredentialError::NotFound(identifier.to_string()))
}

/// Verify an identifier/password pair.
///
/// Unknown identifiers and wrong passwords both yield
/// [`CredentialError::BadCredentials`].
pub fn authenticate(db: &Database, identifier: &str, password: &str) -> Result<StoredUser, CredentialError> {
    let user = match find_by_identifier(db, identifier) {
        Ok(user) => user,
        Err(CredentialError::NotFound(_)) => {
            tracing::debug!("login attempt for unknown identifier");
            return Err(CredentialError::BadCredentials);
        }
        Err(e) => return Err(e),
    };

    if !verify_password(password, &user.password_hash) {
        tracing::debug!(user_id = user.id, "login attempt with wrong password");
        return Err(CredentialError::BadCredentials);
    }

    if !user.enabled {
        tracing::info!(user_id = user.id, "login attempt on disabled account");
        return Err(CredentialError::Disabled);
    }

    Ok(user)
}

/// Create an enabled account.
///
/// The username is checked before the email; the first collision wins.
pub fn register(db: &Database, registration: Registration) -> Result<StoredUser, CredentialError> {
    let users = db.users();
    if users.username_exists(&registration.username)? {
        return Err(CredentialError::DuplicateUsername);
    }
    if users.email_exists(&registration.email)? {
        return Err(CredentialError::DuplicateEmail);
    }

    let password_hash = hash_password(&registration.password)?;
    let created = users.create(NewUser {
        username: registration.username,
        email: registration.email,
        password_hash,
        first_name: registration.first_name,
        last_name: registration.last_name,
        role: registration.role,
    });

    // A concurrent registration can still win the race between the checks
    // above and the insert.
    match created {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.username, "user registered");
            Ok(user)
        }
        Err(StorageError::AlreadyExists(what)) if what.starts_with("username") => {
            Err(CredentialError::DuplicateUsername)
        }
        Err(StorageError::AlreadyExists(_)) => Err(CredentialError::DuplicateEmail),
        Err(e) => Err(e.into()),
    }
}

/// Create the bootstrap administrator unless the username is already taken.
///
/// Returns `true` when an account was created.
pub fn ensure_admin(db: &Database, username: &str, email: &str, password: &str) -> Result<bool, CredentialError> {
    let registration = Registration {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        first_name: "System".to_string(),
        last_name: "Administrator".to_string(),
        role: Role::Admin,
    };
    match register(db, registration) {
        Ok(_) => Ok(true),
        Err(CredentialError::DuplicateUsername) => Ok(false),
        Err(e) => Err(e),
    }
}
