//! Reconciliation scope for a `ROSAControlPlane`.
//!
//! One [`RosaControlPlaneScope`] lives for exactly one reconcile pass. It owns
//! the control plane being reconciled, remembers what it looked like when the
//! pass started, and on [`patch_object`](RosaControlPlaneScope::patch_object)
//! or [`close`](RosaControlPlaneScope::close) writes back only what changed,
//! plus the condition types this controller owns.

use capa_core::{
    Cluster, ConditionType, ROSA_CONTROL_PLANE_READY_CONDITION, Resource, RosaControlPlane,
    SecretReference,
};
use capa_storage::{DynObjectStore, PatchDocument, StoreError};
use tracing::{Instrument, Span, debug, warn};

use crate::config::{BaselinePolicy, ScopeConfig, ScopeSettings};
use crate::error::{Result, ScopeError};
use crate::patch::{PatchHelper, PatchOptions};

/// Condition types a ROSA control plane controller is allowed to write.
pub const OWNED_CONDITIONS: &[ConditionType] = &[ROSA_CONTROL_PLANE_READY_CONDITION];

/// Collaborators needed to build a [`RosaControlPlaneScope`].
#[derive(Default)]
pub struct ScopeParams {
    pub client: Option<DynObjectStore>,
    pub logger: Option<Span>,
    pub cluster: Option<Cluster>,
    pub control_plane: Option<RosaControlPlane>,
    pub controller_name: String,
    pub settings: ScopeSettings,
}

impl ScopeParams {
    pub fn new(controller_name: impl Into<String>) -> Self {
        Self {
            controller_name: controller_name.into(),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, client: DynObjectStore) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_control_plane(mut self, control_plane: RosaControlPlane) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    pub fn with_settings(mut self, settings: ScopeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Takes the `[scope]` section of a loaded config.
    pub fn with_config(self, config: &ScopeConfig) -> Self {
        self.with_settings(config.scope)
    }
}

/// Context for one reconcile pass over a `ROSAControlPlane`.
///
/// Not shared between tasks; no internal locking.
#[derive(Debug)]
pub struct RosaControlPlaneScope {
    logger: Span,
    controller_name: String,
    settings: ScopeSettings,
    patch_helper: PatchHelper<RosaControlPlane>,
    cluster: Cluster,
    control_plane: RosaControlPlane,
    /// Document of the last successful commit, precondition cleared.
    persisted: Option<PatchDocument>,
    commits: usize,
    closed: bool,
}

impl RosaControlPlaneScope {
    /// Builds a scope and snapshots the control plane as the diff baseline.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::InvalidArgument` when the cluster or control plane
    /// is missing, and `ScopeError::Initialization` when the patch helper
    /// cannot be set up.
    pub fn new(params: ScopeParams) -> Result<Self> {
        let ScopeParams {
            client,
            logger,
            cluster,
            control_plane,
            controller_name,
            settings,
        } = params;

        let cluster = cluster.ok_or_else(|| {
            ScopeError::invalid_argument("failed to generate new scope from nil Cluster")
        })?;
        let control_plane = control_plane.ok_or_else(|| {
            ScopeError::invalid_argument("failed to generate new scope from nil ROSAControlPlane")
        })?;

        let logger = logger.unwrap_or_else(|| {
            tracing::info_span!(
                "reconcile",
                controller = %controller_name,
                namespace = %cluster.metadata.namespace,
                cluster = %cluster.metadata.name,
                control_plane = %control_plane.metadata.name,
            )
        });

        let options = PatchOptions {
            optimistic_lock: settings.optimistic_lock,
        };
        let patch_helper = PatchHelper::new(&control_plane, client, options)?;

        Ok(Self {
            logger,
            controller_name,
            settings,
            patch_helper,
            cluster,
            control_plane,
            persisted: None,
            commits: 0,
            closed: false,
        })
    }

    /// Name of the CAPI cluster.
    pub fn name(&self) -> &str {
        &self.cluster.metadata.name
    }

    /// Name of the infrastructure (control plane) object.
    pub fn infra_cluster_name(&self) -> &str {
        &self.control_plane.metadata.name
    }

    /// Cluster name as known to OpenShift Cluster Manager.
    pub fn rosa_cluster_name(&self) -> &str {
        &self.control_plane.spec.rosa_cluster_name
    }

    /// Namespace of the CAPI cluster.
    pub fn namespace(&self) -> &str {
        &self.cluster.metadata.namespace
    }

    /// Lookup key of the credentials Secret, if one is configured.
    ///
    /// Built from `spec.credentialsSecretRef`; nothing is read from the store.
    pub fn credentials_secret(&self) -> Option<SecretReference> {
        self.control_plane
            .spec
            .credentials_secret_ref
            .as_ref()
            .map(|secret_ref| {
                SecretReference::new(
                    self.control_plane.metadata.namespace.clone(),
                    secret_ref.name.clone(),
                )
            })
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn control_plane(&self) -> &RosaControlPlane {
        &self.control_plane
    }

    pub fn control_plane_mut(&mut self) -> &mut RosaControlPlane {
        &mut self.control_plane
    }

    pub fn client(&self) -> &DynObjectStore {
        self.patch_helper.client()
    }

    pub fn logger(&self) -> &Span {
        &self.logger
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    pub fn owned_conditions(&self) -> &'static [ConditionType] {
        OWNED_CONDITIONS
    }

    /// Number of commits that reached the store.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Whether the control plane holds changes no commit has persisted yet.
    ///
    /// Under [`BaselinePolicy::Preserve`] a later commit re-sends what an
    /// earlier one already wrote; that repeat does not count as pending.
    pub fn has_pending_changes(&self) -> bool {
        self.unpersisted_document().is_some()
    }

    /// Current diff against the baseline, precondition cleared, `None` when empty.
    fn current_document(&self) -> Option<PatchDocument> {
        let mut document = self
            .patch_helper
            .calculate(&self.control_plane, OWNED_CONDITIONS)
            .ok()?;
        document.resource_version = None;
        (!document.is_empty()).then_some(document)
    }

    fn unpersisted_document(&self) -> Option<PatchDocument> {
        self.current_document()
            .filter(|document| self.persisted.as_ref() != Some(document))
    }

    /// Persists the control plane configuration and status.
    ///
    /// Submits at most one patch. Only `ROSAControlPlaneReady` is written
    /// among conditions. Store failures come back as `ScopeError::Commit`
    /// and are not retried.
    pub async fn patch_object(&mut self) -> Result<()> {
        let span = self.logger.clone();
        self.commit().instrument(span).await
    }

    /// Closes the scope, persisting the control plane configuration and status.
    pub async fn close(mut self) -> Result<()> {
        let result = self.patch_object().await;
        self.closed = true;
        result
    }

    async fn commit(&mut self) -> Result<()> {
        if self.settings.observed_generation {
            self.control_plane.status.observed_generation = self.control_plane.metadata.generation;
        }

        let Some(stored) = self
            .patch_helper
            .patch(&self.control_plane, OWNED_CONDITIONS)
            .await?
        else {
            return Ok(());
        };

        self.commits += 1;
        let metadata = self.control_plane.metadata_mut();
        metadata.resource_version = Some(stored.resource_version.clone());
        if let Some(generation) = stored
            .object
            .pointer("/metadata/generation")
            .and_then(serde_json::Value::as_i64)
        {
            metadata.generation = Some(generation);
        }

        if self.settings.baseline_policy == BaselinePolicy::RefreshAfterCommit {
            self.patch_helper
                .reset_baseline(&self.control_plane)
                .map_err(|e| {
                    ScopeError::commit(
                        RosaControlPlane::KIND,
                        self.patch_helper.key().clone(),
                        StoreError::from(e),
                    )
                })?;
            debug!(commits = self.commits, "Baseline refreshed after commit");
        }

        self.persisted = self.current_document();
        Ok(())
    }
}

impl Drop for RosaControlPlaneScope {
    fn drop(&mut self) {
        if !self.closed && self.has_pending_changes() {
            let _enter = self.logger.enter();
            warn!(
                changed = ?self.patch_helper.changed_paths(&self.control_plane),
                "Scope dropped without close; pending changes were not persisted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capa_storage::TypedObjectStore;
    use capa_store_memory::InMemoryStore;
    use std::sync::Arc;

    fn params() -> ScopeParams {
        let store: DynObjectStore = Arc::new(
            InMemoryStore::new()
                .with_kind::<Cluster>()
                .with_kind::<RosaControlPlane>(),
        );
        ScopeParams::new("rosacontrolplane")
            .with_client(store)
            .with_cluster(Cluster::new("ns1", "demo"))
            .with_control_plane(
                RosaControlPlane::new("ns1", "demo-control-plane")
                    .with_rosa_cluster_name("demo-rosa"),
            )
    }

    #[test]
    fn test_default_logger_is_built() {
        let scope = RosaControlPlaneScope::new(params()).unwrap();
        assert_eq!(scope.controller_name(), "rosacontrolplane");
        let _ = scope.logger();
    }

    #[test]
    fn test_missing_client_is_initialization_error() {
        let mut params = params();
        params.client = None;
        let err = RosaControlPlaneScope::new(params).unwrap_err();
        assert!(matches!(err, ScopeError::Initialization { .. }));
    }

    #[test]
    fn test_missing_cluster_wins_over_missing_client() {
        let mut params = params();
        params.client = None;
        params.cluster = None;
        let err = RosaControlPlaneScope::new(params).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidArgument(_)));
    }

    #[test]
    fn test_settings_from_config() {
        let config = ScopeConfig::from_toml("[scope]\noptimistic_lock = true\n").unwrap();
        let scope = RosaControlPlaneScope::new(params().with_config(&config)).unwrap();
        assert!(scope.settings().optimistic_lock);
        assert_eq!(scope.settings().baseline_policy, BaselinePolicy::Preserve);
    }

    #[test]
    fn test_owned_conditions() {
        let scope = RosaControlPlaneScope::new(params()).unwrap();
        assert_eq!(scope.owned_conditions(), &[ROSA_CONTROL_PLANE_READY_CONDITION]);
        assert_eq!(scope.rosa_cluster_name(), "demo-rosa");
        assert!(!scope.has_pending_changes());
    }

    #[tokio::test]
    async fn test_committed_changes_are_not_pending() {
        let store: DynObjectStore = Arc::new(InMemoryStore::new().with_kind::<RosaControlPlane>());
        let cp = store
            .create_resource(&RosaControlPlane::new("ns1", "demo-control-plane"))
            .await
            .unwrap();
        let mut scope = RosaControlPlaneScope::new(
            ScopeParams::new("rosacontrolplane")
                .with_client(store)
                .with_cluster(Cluster::new("ns1", "demo"))
                .with_control_plane(cp),
        )
        .unwrap();

        scope.control_plane_mut().status.ready = true;
        assert!(scope.has_pending_changes());
        scope.patch_object().await.unwrap();
        assert!(!scope.has_pending_changes());

        // Preserve re-sends the same document; still nothing new.
        scope.patch_object().await.unwrap();
        assert!(!scope.has_pending_changes());

        scope.control_plane_mut().status.initialized = true;
        assert!(scope.has_pending_changes());
        scope.patch_object().await.unwrap();
        assert!(!scope.has_pending_changes());
        assert_eq!(scope.commit_count(), 3);
    }
}
