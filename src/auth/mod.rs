// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Self-issued HS256 JWT authentication.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /auth/login` with a username or email and password
//! 2. Server verifies the Argon2 hash and issues an access and refresh token
//! 3. Client sends `Authorization: Bearer <access token>`
//! 4. [`middleware::resolve_identity`]:
//!    - Verifies signature and expiry
//!    - Loads the account named by `sub`
//!    - Attaches an [`AuthenticatedUser`] to the request
//! 5. Handlers require an identity through the [`Auth`] / [`AdminOnly`]
//!    extractors
//!
//! ## Security
//!
//! - Unknown identifiers and wrong passwords produce the same error
//! - Refresh tokens cannot be used as access tokens and vice versa
//! - Tokens and passwords are never logged

pub mod claims;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedUser, TokenClaims, TokenKind};
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, CredentialError, TokenError};
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
pub use token::{TokenCodec, TokenPair};
