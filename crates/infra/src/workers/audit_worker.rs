use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::warn;

use gabinete_core::OrgId;
use gabinete_events::{AuditEvent, EventBus, OrgScoped, Subscription};

use crate::store::{AuditEntry, AuditStore};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Drains audit events from the bus into an [`AuditStore`].
///
/// Runs on its own thread; store appends are driven on the given runtime
/// handle. A failed append is logged and not retried.
#[derive(Debug)]
pub struct AuditWorker;

impl AuditWorker {
    /// Subscribes before returning, so events published after `spawn` are
    /// never missed.
    pub fn spawn<B, S>(
        bus: B,
        store: Arc<S>,
        runtime: Handle,
        org_filter: Option<OrgId>,
    ) -> std::io::Result<WorkerHandle>
    where
        B: EventBus<AuditEvent> + 'static,
        S: AuditStore + ?Sized + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<AuditEvent> = bus.subscribe();

        let join = thread::Builder::new()
            .name("audit-worker".to_string())
            .spawn(move || {
                worker_loop(sub, shutdown_rx, org_filter, |event| {
                    let entry = AuditEntry::from_event(&event);
                    runtime.block_on(store.append_audit(&entry))
                })
            })?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    org_filter: Option<OrgId>,
    mut handler: H,
) where
    M: OrgScoped,
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    let tick = Duration::from_millis(250);
    let mut deliver = |msg: M| {
        if org_filter.is_some_and(|o| msg.org_id() != Some(o)) {
            return;
        }
        if let Err(err) = handler(msg) {
            warn!(worker = "audit-worker", error = %err, "audit append failed");
        }
    };

    loop {
        if shutdown_rx.try_recv().is_ok() {
            // Whatever was published before the shutdown request still lands.
            while let Ok(msg) = sub.try_recv() {
                deliver(msg);
            }
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => deliver(msg),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gabinete_core::UserId;
    use gabinete_events::{AuditAction, AuditEntity, InMemoryEventBus};

    use crate::store::{AuditFilter, InMemoryStore, PageRequest};

    #[tokio::test(flavor = "multi_thread")]
    async fn appends_published_events() {
        let bus = Arc::new(InMemoryEventBus::<AuditEvent>::new());
        let store = Arc::new(InMemoryStore::new());
        let handle = AuditWorker::spawn(bus.clone(), store.clone(), Handle::current(), None).unwrap();

        let org = OrgId::new();
        bus.publish(AuditEvent::new(
            Some(org),
            UserId::new(),
            AuditAction::Create,
            AuditEntity::Invitation,
            serde_json::json!({"email": "x@example.org"}),
        ))
        .unwrap();

        let filter = AuditFilter {
            org_id: Some(org),
            ..Default::default()
        };
        let mut total = 0;
        for _ in 0..50 {
            total = store.query_audit(&filter, PageRequest::default()).await.unwrap().total;
            if total == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(total, 1);

        tokio::task::spawn_blocking(move || handle.shutdown()).await.unwrap();
    }

    #[test]
    fn shutdown_drains_queued_events_first() {
        let (tx, rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let org = OrgId::new();
        for entity in [AuditEntity::Membership, AuditEntity::Invitation, AuditEntity::Voter] {
            tx.send(AuditEvent::new(
                Some(org),
                UserId::new(),
                AuditAction::Delete,
                entity,
                serde_json::json!({}),
            ))
            .unwrap();
        }
        shutdown_tx.send(()).unwrap();

        let mut seen = Vec::new();
        worker_loop(Subscription::new(rx), shutdown_rx, None, |event: AuditEvent| {
            seen.push(event.entity);
            Ok::<_, String>(())
        });
        assert_eq!(
            seen,
            vec![AuditEntity::Membership, AuditEntity::Invitation, AuditEntity::Voter]
        );
    }
}
