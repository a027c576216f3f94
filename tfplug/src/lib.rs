//! tfplug - Terraform Plugin Framework for Rust
//!
//! Provider-side building blocks: request context, dynamic values, schemas
//! with validation, the resource/data source/provider traits, import helpers
//! and the poll-until-stable state converger used by cloud resources.

// Core modules
pub mod context;
pub mod error;
pub mod handle;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod converge;
pub mod import;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use converge::{converge, ConvergeError, NotFoundPolicy, Observation, PollSpec, StateConverger};
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use handle::ResourceHandle;
pub use import::{import_state_composite_id, import_state_passthrough_id};
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
