//! Reconciliation of one physical Revision with its virtual mirror.
//!
//! The physical store is authoritative. Each invocation reads both sides (or
//! takes them from the caller), compares them and issues only the writes that
//! are needed:
//!
//! | physical | virtual                 | action                       |
//! |----------|-------------------------|------------------------------|
//! | absent   | present                 | delete the mirror            |
//! | present  | absent                  | create the mirror if managed |
//! | present  | present, spec differs   | update spec                  |
//! | present  | present, status differs | update status                |
//! | absent   | absent                  | nothing                      |
//!
//! Spec and status are decided independently. When both differ, spec goes
//! first and the status write builds on the object the spec write returned.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};
use vsync_core::{GroupVersionKind, Object, ObjectKey, OwnerReference};
use vsync_storage::DynStore;

use crate::context::SyncContext;
use crate::differ::{Aspect, differs_on};
use crate::error::{SyncError, SyncResult};
use crate::registry::{KindRegistry, kinds};
use crate::scope::{Scope, ScopeClassifier};
use crate::translator::Translator;

/// Reason recorded on events emitted when creating a mirror fails.
pub const SYNC_ERROR_REASON: &str = "SyncError";

/// Both sides of one identity as observed at the start of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPair {
    /// Object in the physical store
    pub source: Option<Object>,
    /// Mirrored object in the virtual store
    pub target: Option<Object>,
}

impl ObjectPair {
    pub fn new(source: Option<Object>, target: Option<Object>) -> Self {
        Self { source, target }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    UpdateSpec,
    UpdateStatus,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::UpdateSpec => "update_spec",
            SyncAction::UpdateStatus => "update_status",
            SyncAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The identity does not map between the two stores.
    OutOfScope,
    /// The physical object belongs to no virtual instance we serve.
    Unmanaged,
}

/// Writes issued by one reconciliation, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub actions: Vec<SyncAction>,
    pub skipped: Option<SkipReason>,
}

impl ReconcileOutcome {
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            actions: Vec::new(),
            skipped: Some(reason),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Reconciler for `serving.knative.dev/v1` Revisions.
///
/// Stateless between calls; concurrent calls for distinct keys are safe.
pub struct RevisionSyncer {
    gvk: GroupVersionKind,
    physical: DynStore,
    virtual_store: DynStore,
    translator: Arc<dyn Translator>,
    scope: ScopeClassifier,
    registry: Arc<KindRegistry>,
}

impl RevisionSyncer {
    pub fn new(
        physical: DynStore,
        virtual_store: DynStore,
        translator: Arc<dyn Translator>,
        registry: Arc<KindRegistry>,
    ) -> Self {
        let scope = ScopeClassifier::new(translator.clone(), physical.clone(), registry.clone());
        Self {
            gvk: kinds::revision_gvk(),
            physical,
            virtual_store,
            translator,
            scope,
            registry,
        }
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn scope(&self) -> &ScopeClassifier {
        &self.scope
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Reads both sides of a physical key and reconciles them.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile_source_key(
        &self,
        ctx: &SyncContext,
        key: &ObjectKey,
    ) -> SyncResult<ReconcileOutcome> {
        let target_key = match self.translator.resolver().to_target(key) {
            Ok(target_key) => target_key,
            Err(e) if e.is_identity_unresolvable() => {
                debug!(error = %e, "Physical key is out of scope");
                return Ok(ReconcileOutcome::skipped(SkipReason::OutOfScope));
            }
            Err(e) => return Err(e),
        };
        self.reconcile_keys(ctx, key, &target_key).await
    }

    /// Reads both sides of a virtual key and reconciles them.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile_target_key(
        &self,
        ctx: &SyncContext,
        key: &ObjectKey,
    ) -> SyncResult<ReconcileOutcome> {
        let source_key = match self.translator.resolver().to_source(key) {
            Ok(source_key) => source_key,
            Err(e) if e.is_identity_unresolvable() => {
                debug!(error = %e, "Virtual key is out of scope");
                return Ok(ReconcileOutcome::skipped(SkipReason::OutOfScope));
            }
            Err(e) => return Err(e),
        };
        self.reconcile_keys(ctx, &source_key, key).await
    }

    async fn reconcile_keys(
        &self,
        ctx: &SyncContext,
        source_key: &ObjectKey,
        target_key: &ObjectKey,
    ) -> SyncResult<ReconcileOutcome> {
        let source = ctx.run(self.physical.get(&self.gvk, source_key)).await?;
        let target = ctx
            .run(self.virtual_store.get(&self.gvk, target_key))
            .await?;
        self.reconcile(ctx, ObjectPair::new(source, target)).await
    }

    /// Reconciles an already observed pair.
    pub async fn reconcile(
        &self,
        ctx: &SyncContext,
        pair: ObjectPair,
    ) -> SyncResult<ReconcileOutcome> {
        match (pair.source, pair.target) {
            (None, Some(target)) => self.sync_down(ctx, &target).await,
            (Some(source), None) => self.sync_up(ctx, &source).await,
            (Some(source), Some(target)) => self.sync(ctx, &source, &target).await,
            (None, None) => Ok(ReconcileOutcome::noop()),
        }
    }

    async fn sync_down(&self, ctx: &SyncContext, target: &Object) -> SyncResult<ReconcileOutcome> {
        let key = target.key()?;
        info!(
            resource_type = %self.gvk.kind,
            key = %key,
            "Deleting virtual object, physical object is gone"
        );

        match ctx.run(self.virtual_store.delete(target)).await {
            Ok(()) => Ok(ReconcileOutcome {
                actions: vec![SyncAction::Delete],
                skipped: None,
            }),
            Err(SyncError::Storage(e)) if e.is_not_found() => {
                debug!(
                    resource_type = %self.gvk.kind,
                    key = %key,
                    "Virtual object already deleted"
                );
                Ok(ReconcileOutcome::noop())
            }
            Err(e) => Err(log_failure(SyncAction::Delete, &key, e)),
        }
    }

    async fn sync(
        &self,
        ctx: &SyncContext,
        source: &Object,
        target: &Object,
    ) -> SyncResult<ReconcileOutcome> {
        let key = target.key()?;
        let mut outcome = ReconcileOutcome::noop();
        let mut current = target.clone();

        if differs_on(Aspect::Spec, source, &current) {
            debug!(
                resource_type = %self.gvk.kind,
                key = %key,
                "Spec diverged, updating virtual object"
            );
            let mut updated = current.clone();
            updated.spec = source.spec.clone();
            current = ctx
                .run(self.virtual_store.update(&updated))
                .await
                .map_err(|e| log_failure(SyncAction::UpdateSpec, &key, e))?;
            outcome.actions.push(SyncAction::UpdateSpec);
        }

        if differs_on(Aspect::Status, source, &current) {
            debug!(
                resource_type = %self.gvk.kind,
                key = %key,
                "Status diverged, updating virtual object"
            );
            let mut updated = current.clone();
            updated.status = source.status.clone();
            ctx.run(self.virtual_store.update_status(&updated))
                .await
                .map_err(|e| log_failure(SyncAction::UpdateStatus, &key, e))?;
            outcome.actions.push(SyncAction::UpdateStatus);
        }

        Ok(outcome)
    }

    async fn sync_up(&self, ctx: &SyncContext, source: &Object) -> SyncResult<ReconcileOutcome> {
        let source_key = source.key()?;

        let scope = self.scope.classify(ctx, source).await?;
        if !scope.is_managed() {
            debug!(
                resource_type = %self.gvk.kind,
                key = %source_key,
                "Physical object is not managed, skipping"
            );
            return Ok(ReconcileOutcome::skipped(SkipReason::Unmanaged));
        }

        let mut copy = match self.translator.reverse_translate(source) {
            Ok(copy) => copy,
            Err(e) if e.is_identity_unresolvable() => {
                debug!(
                    resource_type = %self.gvk.kind,
                    key = %source_key,
                    error = %e,
                    "Physical object is out of scope"
                );
                return Ok(ReconcileOutcome::skipped(SkipReason::OutOfScope));
            }
            Err(e) => return Err(e),
        };

        if let Scope::Inherited(owner) = &scope
            && let Some(reference) = self.virtual_owner_reference(ctx, source, owner).await?
        {
            copy.metadata.owner_references.push(reference);
        }

        info!(resource_type = %self.gvk.kind, key = %source_key, "Creating virtual object");
        match ctx.run(self.virtual_store.create(&copy)).await {
            Ok(_) => Ok(ReconcileOutcome {
                actions: vec![SyncAction::Create],
                skipped: None,
            }),
            Err(SyncError::Cancelled) => Err(SyncError::Cancelled),
            Err(e) => {
                self.translator.event_recorder().warning(
                    source,
                    SYNC_ERROR_REASON,
                    format!("Error syncing to virtual cluster: {e}"),
                );
                Err(log_failure(SyncAction::Create, &source_key, e))
            }
        }
    }

    /// Owner reference pointing at the virtual counterpart of a physical owner.
    ///
    /// Returns `None` when the owner has no mirror (yet) or does not map.
    async fn virtual_owner_reference(
        &self,
        ctx: &SyncContext,
        source: &Object,
        owner: &OwnerReference,
    ) -> SyncResult<Option<OwnerReference>> {
        let info = self.registry.resolve(&owner.api_version, &owner.kind)?;
        let namespace = if info.namespaced {
            source.namespace().unwrap_or_default()
        } else {
            ""
        };
        let owner_key = ObjectKey::new(namespace, owner.name.as_str());
        let Ok(target_key) = self.translator.resolver().to_target(&owner_key) else {
            return Ok(None);
        };

        let parent = ctx.run(self.virtual_store.get(&info.gvk, &target_key)).await?;
        Ok(parent.map(|parent| OwnerReference {
            api_version: owner.api_version.clone(),
            kind: owner.kind.clone(),
            name: target_key.name,
            uid: parent.metadata.uid,
            controller: owner.controller,
        }))
    }
}

fn log_failure(action: SyncAction, key: &ObjectKey, err: SyncError) -> SyncError {
    if !matches!(err, SyncError::Cancelled) {
        error!(action = %action, key = %key, error = %err, "Failed to write virtual object");
    }
    err
}

impl std::fmt::Debug for RevisionSyncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionSyncer")
            .field("gvk", &self.gvk)
            .field("physical", &self.physical.backend_name())
            .field("virtual", &self.virtual_store.backend_name())
            .finish_non_exhaustive()
    }
}
