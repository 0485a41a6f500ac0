// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UEM Trust - Token, Permission and Signed-Channel Gate
//!
//! Request-time trust layer for the UEM platform: issues and verifies bearer
//! identity tokens, maps roles to permissions, and authenticates
//! HMAC-signed device-agent requests with replay protection.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `audit` - Audit events for trust decisions
//! - `auth` - Token authority, permission gate, signed channel
//! - `config` - Environment configuration
//! - `janitor` - Background purge of expired nonces

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod janitor;
pub mod models;
pub mod state;
