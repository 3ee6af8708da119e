//! `gabinete-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers and the deterministic error model every other
//! crate maps its rejections onto.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AuditEntryId, CaseId, JoinRequestId, OrgId, TagId, UserId, VoterId};
