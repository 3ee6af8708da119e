use std::sync::Arc;

use gabinete_events::{AuditEvent, EventBus, InMemoryEventBus};

/// Publishes audit events on the in-process bus.
///
/// Recording never fails the caller: a publish error is logged and dropped.
#[derive(Debug, Clone)]
pub struct AuditSink {
    bus: Arc<InMemoryEventBus<AuditEvent>>,
}

impl AuditSink {
    pub fn new(bus: Arc<InMemoryEventBus<AuditEvent>>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus<AuditEvent>> {
        &self.bus
    }

    pub fn record(&self, event: AuditEvent) {
        let (action, entity, org_id) = (event.action, event.entity, event.org_id);
        if let Err(err) = self.bus.publish(event) {
            tracing::warn!(
                %action,
                entity = entity.as_str(),
                org_id = ?org_id,
                error = %err,
                "audit event dropped"
            );
        }
    }
}
