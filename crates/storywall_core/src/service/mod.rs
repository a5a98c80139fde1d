//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate admission, persistence and placement into request-level
//!   operations.
//! - Keep transport layers decoupled from storage details.

pub mod wall_service;
