//! `groupclaim-core` — domain primitives shared by the claim mappers.
//!
//! This crate contains **pure domain** primitives (no token or storage concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{GroupId, TenantId, UserId};
pub use value_object::ValueObject;
