//! Infrastructure layer: stores, lifecycle services and the audit side channel.

pub mod audit_sink;
pub mod directory;
pub mod password;
pub mod services;
pub mod store;
pub mod workers;


pub use audit_sink::AuditSink;
pub use directory::StoreDirectory;
pub use services::{ServiceConfig, ServiceError, ServiceResult, Services};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};
pub use workers::{AuditWorker, WorkerHandle};
