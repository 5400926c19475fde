//! Release changelog tracking server.
//!
//! Projects own feature categories and release versions; change entries tie a
//! release to a category. Storage is SQLite with engine-enforced uniqueness and
//! cascading deletes; [`api`] exposes it over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod render;
