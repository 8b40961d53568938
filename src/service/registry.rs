// Copyright (c) 2025 - Cowboy AI, Inc.
//! Federation registry façade
//!
//! # Transaction Semantics
//!
//! Every write is one transaction:
//! 1. Begin a write transaction (serialized with all other writes)
//! 2. Load the current state of the target
//! 3. Run the validation layer against the transactional view
//! 4. Persist the entity and its owned edges, or the cascade plan
//! 5. Commit
//!
//! If any step fails the transaction is rolled back and the specific error
//! is returned. Writes are never retried.
//!
//! Reads run in a snapshot transaction, resolve the caller's
//! [`VisibleScope`] and filter every result through it. A read that fails
//! with [`RegistryError::StorageUnavailable`] is retried per
//! [`RetryPolicy`](crate::config::RetryPolicy).

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::domain::{CatalogEntry, Flavor, Image, Network, Patchable, Project, Provider};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{AccessMode, Entity, GraphStore, NodeKind, PropertyFilter};
use crate::projection::{
    catalog_for_project, effective_quota, CallerScope, EffectiveQuota, Visible, VisibleScope,
};
use crate::repository::Repository;
use crate::validation::{
    validate_create, validate_delete, validate_update, CascadePlan, DeleteOptions, Relink,
    Validated,
};

/// Entity types served by the façade
pub trait Managed: Validated + Visible + Patchable {}

impl<T: Validated + Visible + Patchable> Managed for T {}

/// Equality filter and pagination of a list request
///
/// Applied after visibility filtering, on results in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: PropertyFilter,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filter = self.filter.eq(key, value);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// What a delete removed and re-linked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub removed: Vec<(NodeKind, Uuid)>,
    pub relinked: Vec<Relink>,
}

impl CascadeReport {
    pub fn removed_count(&self, kind: NodeKind) -> usize {
        self.removed.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn removed_ids(&self, kind: NodeKind) -> Vec<Uuid> {
        self.removed
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
            .collect()
    }
}

impl From<CascadePlan> for CascadeReport {
    fn from(plan: CascadePlan) -> Self {
        Self {
            removed: plan.removals,
            relinked: plan.relinks,
        }
    }
}

/// Typed read/write access to the federation graph
pub struct FederationRegistry<S: GraphStore> {
    store: Arc<S>,
    config: RegistryConfig,
}

impl<S: GraphStore> Clone for FederationRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: GraphStore> FederationRegistry<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    pub fn with_config(store: S, config: RegistryConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Prepare the store and verify it answers
    pub async fn initialize(&self) -> RegistryResult<()> {
        self.store.initialize().await?;
        self.store.health_check().await?;
        info!("Federation registry ready on {} store", self.store.name());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub async fn create<E: Managed>(&self, entity: E) -> RegistryResult<E> {
        self.write("create", move |repo| {
            Box::pin(async move {
                validate_create(&entity, repo).await?;
                repo.save(&entity).await?;
                info!("Created {} {}", E::KIND, entity.id());
                Ok(entity)
            })
        })
        .await
    }

    pub async fn update<E: Managed>(&self, id: Uuid, patch: E::Patch) -> RegistryResult<E> {
        self.write("update", move |repo| {
            Box::pin(async move {
                let current = repo.require::<E>(id).await?;
                let proposed = current.apply(patch)?;
                validate_update(&current, &proposed, repo).await?;
                repo.save(&proposed).await?;
                info!("Updated {} {}", E::KIND, id);
                Ok(proposed)
            })
        })
        .await
    }

    pub async fn delete<E: Managed>(
        &self,
        id: Uuid,
        options: DeleteOptions,
    ) -> RegistryResult<CascadeReport> {
        self.write("delete", move |repo| {
            Box::pin(async move {
                let entity = repo.require::<E>(id).await?;
                let plan = validate_delete(&entity, repo, options).await?;
                apply_plan(repo, &plan).await?;
                info!(
                    "Deleted {} {} with {} cascaded removals",
                    E::KIND,
                    id,
                    plan.removals.len().saturating_sub(1)
                );
                Ok(CascadeReport::from(plan))
            })
        })
        .await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read one entity; invisible targets are reported as not found
    pub async fn read<E: Managed>(&self, id: Uuid, caller: &CallerScope) -> RegistryResult<E> {
        self.read_with(caller, move |repo, scope| {
            Box::pin(async move {
                match repo.get::<E>(id).await? {
                    Some(entity) if entity.is_visible(scope) => Ok(entity),
                    _ => Err(RegistryError::NotFound { kind: E::KIND, id }),
                }
            })
        })
        .await
    }

    pub async fn list<E: Managed>(
        &self,
        query: &ListQuery,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<E>> {
        let query = query.clone();
        let max = self.config.max_page_size;
        self.read_with(caller, move |repo, scope| {
            let query = query.clone();
            Box::pin(async move {
                let limit = query.limit.unwrap_or(max).min(max);
                let found = repo.find::<E>(&query.filter).await?;
                Ok(found
                    .into_iter()
                    .filter(|entity| entity.is_visible(scope))
                    .skip(query.skip)
                    .take(limit)
                    .collect())
            })
        })
        .await
    }

    pub async fn list_providers(
        &self,
        query: &ListQuery,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<Provider>> {
        self.list::<Provider>(query, caller).await
    }

    pub async fn list_projects(
        &self,
        query: &ListQuery,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<Project>> {
        self.list::<Project>(query, caller).await
    }

    pub async fn list_flavors(
        &self,
        project_id: Uuid,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<Flavor>> {
        self.project_catalog::<Flavor>(project_id, caller).await
    }

    pub async fn list_images(
        &self,
        project_id: Uuid,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<Image>> {
        self.project_catalog::<Image>(project_id, caller).await
    }

    pub async fn list_networks(
        &self,
        project_id: Uuid,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<Network>> {
        self.project_catalog::<Network>(project_id, caller).await
    }

    /// Per-project quota, else service default, else unbounded
    pub async fn effective_quota(
        &self,
        project_id: Uuid,
        service_id: Uuid,
        caller: &CallerScope,
    ) -> RegistryResult<EffectiveQuota> {
        self.read_with(caller, move |repo, scope| {
            Box::pin(effective_quota(repo, scope, project_id, service_id))
        })
        .await
    }

    async fn project_catalog<E: CatalogEntry + Entity>(
        &self,
        project_id: Uuid,
        caller: &CallerScope,
    ) -> RegistryResult<Vec<E>> {
        self.read_with(caller, move |repo, scope| {
            Box::pin(catalog_for_project::<E>(repo, scope, project_id))
        })
        .await
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Run `f` in a write transaction; commit on success, roll back on error
    pub(super) async fn write<T, F>(&self, operation: &'static str, f: F) -> RegistryResult<T>
    where
        T: Send,
        F: for<'r> FnOnce(&'r mut Repository) -> BoxFuture<'r, RegistryResult<T>> + Send,
    {
        let mut repo = Repository::new(self.store.begin(AccessMode::Write).await?);
        match f(&mut repo).await {
            Ok(value) => {
                repo.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rejected {}: {}", operation, err);
                if let Err(rollback) = repo.rollback().await {
                    warn!("Rollback after failed {} also failed: {}", operation, rollback);
                }
                Err(err)
            }
        }
    }

    /// Run `f` in a read transaction with the caller's scope, retrying when
    /// the store is unavailable
    async fn read_with<T, F>(&self, caller: &CallerScope, f: F) -> RegistryResult<T>
    where
        T: Send,
        F: for<'r> Fn(&'r mut Repository, &'r VisibleScope) -> BoxFuture<'r, RegistryResult<T>>
            + Send
            + Sync,
    {
        let policy = self.config.read_retry;
        let mut attempt = 1;
        loop {
            match self.read_once(caller, &f).await {
                Err(err) if err.is_transient() && attempt < policy.attempts => {
                    warn!(
                        "Read attempt {}/{} failed: {}; retrying",
                        attempt, policy.attempts, err
                    );
                    tokio::time::sleep(policy.backoff()).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn read_once<T, F>(&self, caller: &CallerScope, f: &F) -> RegistryResult<T>
    where
        T: Send,
        F: for<'r> Fn(&'r mut Repository, &'r VisibleScope) -> BoxFuture<'r, RegistryResult<T>>
            + Send
            + Sync,
    {
        let mut repo = Repository::new(self.store.begin(AccessMode::Read).await?);
        let result = match VisibleScope::resolve(&mut repo, caller).await {
            Ok(scope) => f(&mut repo, &scope).await,
            Err(err) => Err(err),
        };
        if let Err(err) = repo.rollback().await {
            debug!("Closing read transaction failed: {}", err);
        }
        result
    }
}

/// Apply re-links, then detach-delete every planned node
pub(super) async fn apply_plan(repo: &mut Repository, plan: &CascadePlan) -> RegistryResult<()> {
    for relink in &plan.relinks {
        match relink {
            Relink::DropTrust {
                provider_id,
                identity_provider_id,
            } => {
                if plan.removes(NodeKind::Provider, *provider_id) {
                    continue;
                }
                let provider = repo.require::<Provider>(*provider_id).await?;
                repo.save(&provider.without_trust(*identity_provider_id))
                    .await?;
            }
            Relink::Unshare {
                kind,
                entry_id,
                project_id,
            } => {
                if plan.removes(*kind, *entry_id) {
                    continue;
                }
                match kind {
                    NodeKind::Flavor => unshare::<Flavor>(repo, *entry_id, *project_id).await?,
                    NodeKind::Image => unshare::<Image>(repo, *entry_id, *project_id).await?,
                    NodeKind::Network => unshare::<Network>(repo, *entry_id, *project_id).await?,
                    other => {
                        return Err(RegistryError::invariant(format!(
                            "{} is not a catalog entry",
                            other
                        )))
                    }
                }
            }
        }
    }
    for (kind, id) in &plan.removals {
        repo.remove(*kind, *id).await?;
    }
    Ok(())
}

async fn unshare<E: CatalogEntry + Entity>(
    repo: &mut Repository,
    entry_id: Uuid,
    project_id: Uuid,
) -> RegistryResult<()> {
    let entry = repo.require::<E>(entry_id).await?;
    if let Some(visibility) = entry.visibility().without_project(project_id) {
        repo.save(&entry.with_visibility(visibility)).await?;
    }
    Ok(())
}
