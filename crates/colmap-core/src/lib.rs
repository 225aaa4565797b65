//! Colmap Core Library
//!
//! This crate provides the field-mapping engine behind colmap:
//! - Field catalogs of typed source fields and plain target fields
//! - Mapping sets with claim indexes and binding validation
//! - Edit sessions and target renames that keep every view consistent
//! - Pattern snapshots and the collaborators that persist and submit them
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Catalogs   │────▶│   Mapper    │────▶│  Patterns / │
//! │   (YAML)    │     │ (validated) │     │ Submission  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use colmap_core::{Config, DataType, Selection};
//!
//! let config = Config::load("./my-project")?;
//! let mut mapper = config.load_mapper().await?;
//! mapper.set_selection(Selection::new("cust_age", ["age"], DataType::Number));
//! mapper.add_or_update()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actions;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod edit;
pub mod error;
pub mod mapper;
pub mod mapping;
pub mod pattern;
pub mod preview;
pub mod rename;
pub mod selection;
pub mod validator;

pub use actions::{Action, ActionOutcome, StepReport, parse_script};
pub use catalog::{DataType, FieldCatalog, SourceField, TargetField};
pub use collaborators::{
    CatalogSource, ColumnPreview, PatternStore, StoredPattern, SubmissionReceipt, Submitter,
    UpdateOutcome,
};
pub use config::{Config, ProjectConfig};
pub use edit::EditSession;
pub use error::{Error, Result};
pub use mapper::Mapper;
pub use mapping::{EntryId, FieldClaim, FieldRole, MappingEntry, MappingSet};
pub use pattern::{MappingPattern, PatternWarning};
pub use preview::PreviewPager;
pub use rename::{RenameError, RenameOutcome};
pub use selection::Selection;
pub use validator::{ValidationError, validate_binding};
