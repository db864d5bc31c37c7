//! Event-driven dispatch of reconciliations.
//!
//! The controller watches both stores, turns every relevant change into the
//! physical key of a Revision and feeds those keys through a [`WorkQueue`] to
//! a fixed pool of workers. A missed event (channel lag) triggers a full
//! resync from both stores.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vsync_core::{EventRecorder, ObjectKey};
use vsync_storage::{DynStore, StoreEvent, StoreEventType};

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::engine::RevisionSyncer;
use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityResolver;
use crate::index::OwnershipIndex;
use crate::queue::{ExponentialBackoff, WorkQueue};
use crate::registry::{KindRegistry, kinds};
use crate::translator::{Marker, NamespacedTranslator};

pub struct Controller {
    syncer: Arc<RevisionSyncer>,
    physical: DynStore,
    virtual_store: DynStore,
    resolver: Arc<IdentityResolver>,
    index: OwnershipIndex,
    queue: Arc<WorkQueue<ObjectKey>>,
    workers: usize,
}

impl Controller {
    pub fn new(
        syncer: Arc<RevisionSyncer>,
        physical: DynStore,
        virtual_store: DynStore,
        resolver: Arc<IdentityResolver>,
        backoff: ExponentialBackoff,
        workers: usize,
    ) -> Self {
        let index = OwnershipIndex::new(kinds::configuration_gvk(), resolver.clone());
        Self {
            syncer,
            physical,
            virtual_store,
            resolver,
            index,
            queue: Arc::new(WorkQueue::new(backoff)),
            workers: workers.max(1),
        }
    }

    /// Wires resolver, translator and reconciler from configuration.
    pub fn from_config(
        config: &SyncConfig,
        physical: DynStore,
        virtual_store: DynStore,
        recorder: Arc<dyn EventRecorder>,
    ) -> SyncResult<Self> {
        config.validate().map_err(SyncError::config)?;

        let resolver = Arc::new(IdentityResolver::from_config(&config.mapping)?);
        let marker = Marker::new(&config.instance.marker_label, &config.instance.name);
        let translator = NamespacedTranslator::new(resolver.clone(), marker, recorder);
        let syncer = RevisionSyncer::new(
            physical.clone(),
            virtual_store.clone(),
            Arc::new(translator),
            KindRegistry::global(),
        );
        let backoff = ExponentialBackoff::new(
            config.controller.base_backoff(),
            config.controller.max_backoff(),
        );

        Ok(Self::new(
            Arc::new(syncer),
            physical,
            virtual_store,
            resolver,
            backoff,
            config.controller.workers,
        ))
    }

    pub fn syncer(&self) -> &RevisionSyncer {
        &self.syncer
    }

    pub fn queue(&self) -> &Arc<WorkQueue<ObjectKey>> {
        &self.queue
    }

    pub fn index(&self) -> &OwnershipIndex {
        &self.index
    }

    /// Enqueues every Revision known to either store.
    ///
    /// The ownership index is rebuilt from the physical listing, so Revisions
    /// deleted while events were missed drop out of it.
    pub async fn resync(&self, ctx: &SyncContext) -> SyncResult<()> {
        let gvk = kinds::revision_gvk();
        let mut queued = 0usize;
        let mut live = HashSet::new();

        for namespace in self.resolver.source_namespaces() {
            for object in ctx.run(self.physical.list(&gvk, Some(namespace))).await? {
                self.index.upsert(&object);
                if let Ok(key) = object.key() {
                    live.insert(key.clone());
                    self.queue.add(key);
                    queued += 1;
                }
            }
        }
        self.index.retain(&live);

        for namespace in self.resolver.target_namespaces() {
            for object in ctx.run(self.virtual_store.list(&gvk, Some(namespace))).await? {
                let source = object
                    .key()
                    .ok()
                    .and_then(|k| self.resolver.to_source(&k).ok());
                if let Some(key) = source {
                    self.queue.add(key);
                    queued += 1;
                }
            }
        }

        info!(queued, "Resync complete");
        Ok(())
    }

    pub fn handle_physical_event(&self, event: &StoreEvent) {
        if event.matches_gvk(self.syncer.gvk()) {
            match event.event_type {
                StoreEventType::Deleted => self.index.remove(&event.key),
                StoreEventType::Added | StoreEventType::Modified => {
                    self.index.upsert(&event.object)
                }
            }
            if self.resolver.is_source_namespace(&event.key.namespace) {
                self.queue.add(event.key.clone());
            }
        } else if event.matches_gvk(self.index.owner_gvk()) {
            for dependent in self.index.dependents(&event.key) {
                debug!(owner = %event.key, key = %dependent, "Owner changed, requeueing dependent");
                self.queue.add(dependent);
            }
        }
    }

    pub fn handle_virtual_event(&self, event: &StoreEvent) {
        if !event.matches_gvk(self.syncer.gvk()) {
            return;
        }
        match self.resolver.to_source(&event.key) {
            Ok(key) => self.queue.add(key),
            Err(e) => debug!(key = %event.key, error = %e, "Ignoring virtual event out of scope"),
        }
    }

    /// Runs until `shutdown` is cancelled or a watch channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut physical_rx: broadcast::Receiver<StoreEvent>,
        mut virtual_rx: broadcast::Receiver<StoreEvent>,
        shutdown: CancellationToken,
    ) {
        let ctx = SyncContext::with_cancellation(shutdown.child_token());
        info!(workers = self.workers, "Controller starting");

        if let Err(e) = self.resync(&ctx).await {
            error!(error = %e, "Initial resync failed");
        }

        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let this = Arc::clone(&self);
                let ctx = ctx.clone();
                tokio::spawn(async move { this.worker(worker, ctx).await })
            })
            .collect();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = physical_rx.recv() => match event {
                    Ok(event) => self.handle_physical_event(&event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Physical watch lagged, resyncing");
                        if let Err(e) = self.resync(&ctx).await {
                            error!(error = %e, "Resync failed");
                        }
                    }
                    Err(RecvError::Closed) => {
                        warn!("Physical watch closed");
                        break;
                    }
                },
                event = virtual_rx.recv() => match event {
                    Ok(event) => self.handle_virtual_event(&event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Virtual watch lagged, resyncing");
                        if let Err(e) = self.resync(&ctx).await {
                            error!(error = %e, "Resync failed");
                        }
                    }
                    Err(RecvError::Closed) => {
                        warn!("Virtual watch closed");
                        break;
                    }
                },
            }
        }

        self.queue.shut_down();
        ctx.cancellation().cancel();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Controller stopped");
    }

    async fn worker(&self, worker: usize, ctx: SyncContext) {
        debug!(worker, "Worker started");
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => None,
                key = self.queue.get() => key,
            };
            let Some(key) = next else {
                break;
            };
            self.process(&ctx, &key).await;
            self.queue.done(&key);
        }
        debug!(worker, "Worker stopped");
    }

    /// Reconciles one key and applies the retry policy to the result.
    pub async fn process(&self, ctx: &SyncContext, key: &ObjectKey) {
        match self.syncer.reconcile_source_key(ctx, key).await {
            Ok(outcome) => {
                self.queue.forget(key);
                debug!(
                    key = %key,
                    actions = ?outcome.actions,
                    skipped = ?outcome.skipped,
                    "Reconciled"
                );
            }
            Err(SyncError::Cancelled) => {
                debug!(key = %key, "Reconcile cancelled");
            }
            Err(e) if e.is_retryable() => {
                let delay = self.queue.add_rate_limited(key.clone());
                let category = match &e {
                    SyncError::Storage(storage) => storage.category().to_string(),
                    _ => "sync".to_string(),
                };
                warn!(
                    key = %key,
                    error = %e,
                    category = %category,
                    retry_in_ms = delay.as_millis() as u64,
                    "Reconcile failed, will retry"
                );
            }
            Err(e) => {
                self.queue.forget(key);
                error!(key = %key, error = %e, "Reconcile failed");
            }
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("syncer", &self.syncer)
            .field("workers", &self.workers)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
