//! Markup and pricing engine for construction tenders
//!
//! This crate turns the direct cost of Bill-of-Quantities items into commercial
//! cost using configurable markup tactics, splits the result into material and
//! work buckets, rounds unit prices for quotations, derives the position tree
//! and redistributes work cost between cost categories.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
