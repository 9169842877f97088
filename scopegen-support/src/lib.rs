//! # Scopegen Support
//!
//! Shared utilities for the scopegen crates.
//!
//! This crate provides:
//! - Identifier derivation for generated scope members
//! - Text rendering for error messages

pub mod idents;
pub mod rendering;
