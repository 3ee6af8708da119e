//! In-process event distribution and the audit event model.
//!
//! Audit entries travel over an [`EventBus`] so that recording them is a
//! non-blocking side channel of privileged mutations.

pub mod audit;
pub mod bus;
pub mod in_memory_bus;
pub mod scoped;

pub use audit::{AuditAction, AuditEntity, AuditEvent};
pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use scoped::OrgScoped;
