//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate layered errors into `CoreError` at the public boundary.
//!
//! # Invariants
//! - Services hold no state shared between requests besides `AuthContext`,
//!   which is read-only.
//! - Every service call emits one `event=... module=... status=...` line.

pub mod auth_service;
pub mod comment_service;
pub mod memo_service;
pub mod profile_service;
