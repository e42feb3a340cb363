//! Core business logic for Saku.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! It decides *what* a money movement does; the database crate decides how it is
//! applied atomically.
//!
//! # Modules
//!
//! - `ledger` - Top-up, transfer and entry rules, funds checks, retry policy
pub mod ledger;
