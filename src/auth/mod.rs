// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Trust Module
//!
//! Request-time authentication and authorization for the UEM platform.
//!
//! ## Flows
//!
//! 1. Human and service callers send `Authorization: Bearer <token>`:
//!    - [`TokenAuthority`] verifies signature, issuer, audience and the
//!      `[iat, exp)` window
//!    - optionally, [`revalidate`] checks the subject against a directory
//!    - [`check_permission`] gates each operation on the role's grant
//! 2. Device agents send an HMAC-signed body with `X-Nonce`, `X-Timestamp`
//!    and `X-Signature`:
//!    - [`SignedChannelAuthenticator`] checks the timestamp window and the
//!      signature in constant time
//!    - a [`NonceCache`] rejects reuse of a nonce inside the window
//!
//! ## Security
//!
//! - Every check fails closed
//! - Rejections carry generic text outside development mode
//! - Secrets never appear in logs or `Debug` output

pub mod claims;
pub mod client;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod nonce_cache;
pub mod roles;
pub mod signed;
pub mod token;

pub use claims::Claims;
pub use client::{needs_refresh, unverified_expiry, RequestSigner};
pub use directory::{revalidate, InMemoryDirectory, SubjectDirectory, SubjectRecord};
pub use error::{AuthError, ErrorClass, Rejection};
pub use extractor::{perm, Auth, Require, RequiredPermission};
pub use middleware::{require_bearer, require_signed_request};
pub use nonce_cache::{NonceCache, NonceStatus};
pub use roles::{check_all, check_named, check_permission, grant_for, Grant, Permission, Role};
pub use signed::{IntegrityHeaders, SignedChannelAuthenticator, VerifiedRequest};
pub use token::{IssueError, TokenAuthority};
