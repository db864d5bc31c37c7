//! # vsync-syncer
//!
//! Mirrors Knative `Revision` objects from a physical store into a virtual
//! store. The physical side is authoritative: mirrors are created for
//! managed Revisions, kept equal in spec and status, and deleted once their
//! physical counterpart is gone.
//!
//! A Revision is managed when it carries the instance marker label itself,
//! or when one of its owners in the physical store does.
//!
//! ## Layout
//!
//! - [`identity`]: physical ↔ virtual key mapping
//! - [`scope`]: marker check with one-level owner walk
//! - [`differ`]: semantic equality of spec and status
//! - [`engine`]: the reconciliation table
//! - [`controller`], [`queue`], [`index`]: event-driven dispatch

pub mod config;
pub mod context;
pub mod controller;
pub mod differ;
pub mod engine;
pub mod error;
pub mod identity;
pub mod index;
pub mod observability;
pub mod queue;
pub mod registry;
pub mod scope;
pub mod translator;

pub use config::SyncConfig;
pub use context::SyncContext;
pub use controller::Controller;
pub use differ::{Aspect, differs_on, semantic_eq};
pub use engine::{ObjectPair, ReconcileOutcome, RevisionSyncer, SkipReason, SyncAction};
pub use error::{SyncError, SyncResult};
pub use identity::IdentityResolver;
pub use index::OwnershipIndex;
pub use queue::{ExponentialBackoff, WorkQueue};
pub use registry::{KindInfo, KindRegistry};
pub use scope::{Scope, ScopeClassifier};
pub use translator::{Marker, NamespacedTranslator, Translator};
