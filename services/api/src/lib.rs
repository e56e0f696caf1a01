//! services/api/src/lib.rs
//!
//! The HTTP service around `flashcards_core`: adapters for Postgres, the model
//! endpoint and PDF parsing, plus configuration and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
