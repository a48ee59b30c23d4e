//! `accountd-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod payload;
pub mod query;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ValidationError};
pub use id::{AccountId, GroupId, InstitutionId};
pub use payload::Payload;
pub use query::{ListParams, ListQuery, SortOrder, SortSpec};
