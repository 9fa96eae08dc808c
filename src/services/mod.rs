//! Business rules that sit between the HTTP handlers and the `Repository`.
//!
//! Services take the store and collaborators as trait objects, so the same code runs
//! against Postgres in production and the in-memory store in tests.

pub mod reviews;
pub mod signup;
