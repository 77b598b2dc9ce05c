//! Initial data for the engine.
//!
//! # Data Flow
//! ```text
//! ProjectConfig ──▶ Project::from_config ──▶ SeedSource::Structured ─┐
//!                                                                     ├─▶ Engine::load (in order)
//! --data-from-yaml ──▶ parse + validate ──▶ SeedSource::File ────────┘
//! ```
//!
//! # Design Decisions
//! - Both sources produce the same `Seed` tree; the engine owns merging
//! - A file seed is fully parsed and validated before the engine sees it

pub mod model;
pub mod source;

pub use model::{Column, ColumnMode, ColumnType, Dataset, Project, Row, Seed, Table};
pub use source::{parse_seed_file, parse_seed_str, validate_seed, SeedError, SeedSource};
