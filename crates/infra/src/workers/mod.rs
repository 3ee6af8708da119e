pub mod audit_worker;

pub use audit_worker::{AuditWorker, WorkerHandle};
