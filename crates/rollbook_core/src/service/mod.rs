//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the concurrency policy: per-group gates for the enrollment
//!   protocol; grade writes rely on their own transaction.
//!
//! # See also
//! - docs/architecture/concurrency.md

pub mod enrollment_service;
pub mod grade_service;
pub mod group_locks;
