// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for the federation registry façade
//!
//! These tests drive the public API end to end on the in-memory store:
//! 1. Writes are validated against the stored graph
//! 2. Deletes cascade or refuse at shared boundaries
//! 3. Reads only return what the caller may see

mod fixtures;

use pretty_assertions::assert_eq;
use test_case::test_case;
use uuid::Uuid;

use fed_registry::domain::{
    AuthMethod, Flavor, FlavorSpec, IdentityProvider, IdentityProviderSpec, Project, ProjectPatch,
    ProjectSpec, Provider, ProviderPatch, ProviderSpec, ProviderType, Quota, QuotaLimits,
    QuotaSpec, Region, RegionPatch, RegionSpec, Service, ServiceKind, ServicePatch, ServiceSpec,
    ServiceType, Sla, UserGroup, UserGroupPatch, Visibility,
};
use fed_registry::{
    CallerScope, DeleteOptions, EffectiveQuota, ListQuery, NodeKind, RegistryError, Relink,
};

use fixtures::{federation, registry, Federation, IDP_ENDPOINT, PROJECT_UUID};

fn researchers(fed: &Federation) -> CallerScope {
    CallerScope::groups([fed.user_group])
}

fn flavor(service: Uuid, name: &str, visibility: Visibility) -> Flavor {
    Flavor::new(FlavorSpec::new(service, name, format!("{}-uuid", name), visibility)).unwrap()
}

// ============================================================================
// Create / Read
// ============================================================================

#[tokio::test]
async fn test_create_then_read_round_trip() {
    let registry = registry();
    let fed = federation(&registry).await;

    let project: Project = registry
        .read(fed.project, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(project.name, "p1");
    assert_eq!(project.uuid, PROJECT_UUID);
    assert_eq!(project.provider_id, fed.provider);

    let same: Project = registry.read(fed.project, &researchers(&fed)).await.unwrap();
    assert_eq!(same, project);
}

#[tokio::test]
async fn test_identity_provider_endpoint_is_unique_after_canonicalisation() {
    let registry = registry();
    federation(&registry).await;

    let again = IdentityProvider::new(IdentityProviderSpec::new("https://IDP.example", "groups"))
        .unwrap();
    let result = registry.create(again).await;
    assert!(matches!(
        result,
        Err(RegistryError::Conflict {
            kind: NodeKind::IdentityProvider,
            ..
        })
    ));

    let all: Vec<IdentityProvider> = registry
        .list(&ListQuery::new(), &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].endpoint.as_str(), IDP_ENDPOINT);
}

#[tokio::test]
async fn test_region_requires_existing_provider() {
    let registry = registry();
    let missing = Uuid::now_v7();

    let result = registry
        .create(Region::new(RegionSpec::new(missing, "r1")).unwrap())
        .await;
    assert!(matches!(
        result,
        Err(RegistryError::DanglingReference {
            kind: NodeKind::Provider,
            id,
        }) if id == missing
    ));
}

#[tokio::test]
async fn test_provider_rename_conflict() {
    let registry = registry();
    let fed = federation(&registry).await;
    registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();

    let result = registry
        .update::<Provider>(
            fed.provider,
            ProviderPatch {
                name: Some("site2".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(RegistryError::Conflict { .. })));
}

#[tokio::test]
async fn test_trust_still_needed_by_sla_cannot_be_dropped() {
    let registry = registry();
    let fed = federation(&registry).await;

    let result = registry
        .update::<Provider>(
            fed.provider,
            ProviderPatch {
                identity_providers: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
}

#[tokio::test]
async fn test_sla_requires_trusted_identity_provider() {
    let registry = registry();
    let fed = federation(&registry).await;

    let other_idp = registry
        .create(
            IdentityProvider::new(IdentityProviderSpec::new("https://other-idp.example/", "groups"))
                .unwrap(),
        )
        .await
        .unwrap();
    let outsiders = registry
        .create(
            UserGroup::new(fed_registry::domain::UserGroupSpec::new(other_idp.id, "outsiders"))
                .unwrap(),
        )
        .await
        .unwrap();

    let sla = Sla::new(fed_registry::domain::SlaSpec::new(
        outsiders.id,
        fed.project,
        "sla-outsiders",
        fixtures::sla_start(),
    ))
    .unwrap();
    assert!(matches!(
        registry.create(sla).await,
        Err(RegistryError::InvariantViolation(_))
    ));
}

// ============================================================================
// Updates that would break ownership
// ============================================================================

#[test_case("sla" ; "granted by an SLA")]
#[test_case("quota" ; "limited by a project quota")]
#[test_case("flavor" ; "sharing a private flavor")]
#[tokio::test]
async fn test_project_reparent_refused_while_referenced(reference: &str) {
    let registry = registry();
    let fed = federation(&registry).await;
    let site2 = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let p2 = registry
        .create(Project::new(ProjectSpec::new(fed.provider, "p2", "p2-uuid")).unwrap())
        .await
        .unwrap();

    let referenced = match reference {
        "sla" => fed.project,
        "quota" => {
            registry
                .create(
                    Quota::new(QuotaSpec::for_project(fed.network, p2.id, QuotaLimits::network()))
                        .unwrap(),
                )
                .await
                .unwrap();
            p2.id
        }
        _ => {
            registry
                .create(flavor(fed.compute, "g1", Visibility::private([p2.id]).unwrap()))
                .await
                .unwrap();
            p2.id
        }
    };

    let result = registry
        .update::<Project>(
            referenced,
            ProjectPatch {
                provider_id: Some(site2.id),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
    let unchanged: Project = registry
        .read(referenced, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(unchanged.provider_id, fed.provider);
}

#[tokio::test]
async fn test_free_project_reparents() {
    let registry = registry();
    let fed = federation(&registry).await;
    let site2 = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let p2 = registry
        .create(Project::new(ProjectSpec::new(fed.provider, "p2", "p2-uuid")).unwrap())
        .await
        .unwrap();

    let moved: Project = registry
        .update(
            p2.id,
            ProjectPatch {
                provider_id: Some(site2.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.provider_id, site2.id);

    let site2_projects = registry
        .list_projects(
            &ListQuery::new().filter("provider_id", site2.id.to_string()),
            &CallerScope::Unrestricted,
        )
        .await
        .unwrap();
    assert_eq!(site2_projects, vec![moved]);
}

#[tokio::test]
async fn test_region_hosting_services_cannot_move() {
    let registry = registry();
    let fed = federation(&registry).await;
    let site2 = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let move_to_site2 = || RegionPatch {
        provider_id: Some(site2.id),
        ..Default::default()
    };

    assert!(matches!(
        registry.update::<Region>(fed.region, move_to_site2()).await,
        Err(RegistryError::InvariantViolation(_))
    ));

    let empty = registry
        .create(Region::new(RegionSpec::new(fed.provider, "r2")).unwrap())
        .await
        .unwrap();
    let moved: Region = registry.update(empty.id, move_to_site2()).await.unwrap();
    assert_eq!(moved.provider_id, site2.id);

    // Renaming in place stays allowed for the busy region
    let renamed: Region = registry
        .update(
            fed.region,
            RegionPatch {
                name: Some("r1-main".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.provider_id, fed.provider);
}

#[tokio::test]
async fn test_service_with_dependents_keeps_kind_and_provider() {
    let registry = registry();
    let fed = federation(&registry).await;
    registry
        .create(Quota::new(QuotaSpec::default_for(fed.network, QuotaLimits::network())).unwrap())
        .await
        .unwrap();
    let site2 = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let foreign_region = registry
        .create(Region::new(RegionSpec::new(site2.id, "r1")).unwrap())
        .await
        .unwrap();
    let local_region = registry
        .create(Region::new(RegionSpec::new(fed.provider, "r2")).unwrap())
        .await
        .unwrap();

    let kind_change = registry
        .update::<Service>(
            fed.network,
            ServicePatch {
                kind: Some(ServiceKind::cinder()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(kind_change, Err(RegistryError::InvariantViolation(_))));

    let provider_change = registry
        .update::<Service>(
            fed.network,
            ServicePatch {
                region_id: Some(foreign_region.id),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(provider_change, Err(RegistryError::InvariantViolation(_))));

    // Another region of the same provider is fine
    let moved: Service = registry
        .update(
            fed.network,
            ServicePatch {
                region_id: Some(local_region.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.region_id, local_region.id);

    // The compute service carries nothing and may change both
    let swapped: Service = registry
        .update(
            fed.compute,
            ServicePatch {
                region_id: Some(foreign_region.id),
                kind: Some(ServiceKind::cinder()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(swapped.service_type(), ServiceType::BlockStorage);
    assert_eq!(swapped.region_id, foreign_region.id);
}

#[tokio::test]
async fn test_user_group_move_needs_trusted_identity_provider() {
    let registry = registry();
    let fed = federation(&registry).await;
    let other_idp = registry
        .create(
            IdentityProvider::new(IdentityProviderSpec::new("https://other-idp.example/", "groups"))
                .unwrap(),
        )
        .await
        .unwrap();
    let move_to_other = || UserGroupPatch {
        identity_provider_id: Some(other_idp.id),
        ..Default::default()
    };

    // site1 holds the group's SLA and does not trust the other identity provider
    assert!(matches!(
        registry
            .update::<UserGroup>(fed.user_group, move_to_other())
            .await,
        Err(RegistryError::InvariantViolation(_))
    ));

    let site: Provider = registry
        .read(fed.provider, &CallerScope::Unrestricted)
        .await
        .unwrap();
    let mut trusts = site.identity_providers.clone();
    trusts.push(AuthMethod::new(other_idp.id, "other", "openid").unwrap());
    registry
        .update::<Provider>(
            fed.provider,
            ProviderPatch {
                identity_providers: Some(trusts),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let moved: UserGroup = registry
        .update(fed.user_group, move_to_other())
        .await
        .unwrap();
    assert_eq!(moved.identity_provider_id, other_idp.id);
}

// ============================================================================
// Catalog entries and quotas
// ============================================================================

#[tokio::test]
async fn test_project_flavor_catalog() {
    let registry = registry();
    let fed = federation(&registry).await;
    let p2 = registry
        .create(Project::new(ProjectSpec::new(fed.provider, "p2", "p2-uuid")).unwrap())
        .await
        .unwrap();

    let public = registry
        .create(flavor(fed.compute, "m1.small", Visibility::Public))
        .await
        .unwrap();
    let private = registry
        .create(flavor(
            fed.compute,
            "g1.large",
            Visibility::private([fed.project]).unwrap(),
        ))
        .await
        .unwrap();

    let p1_flavors = registry
        .list_flavors(fed.project, &researchers(&fed))
        .await
        .unwrap();
    let mut expected = vec![public.clone(), private];
    expected.sort_by_key(|f| f.id);
    assert_eq!(p1_flavors, expected);

    let p2_flavors = registry
        .list_flavors(p2.id, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(p2_flavors, vec![public]);

    // p2 is not granted to the researchers
    assert!(matches!(
        registry.list_flavors(p2.id, &researchers(&fed)).await,
        Err(RegistryError::NotFound { kind: NodeKind::Project, .. })
    ));
}

#[tokio::test]
async fn test_flavor_needs_compute_service() {
    let registry = registry();
    let fed = federation(&registry).await;

    let result = registry
        .create(flavor(fed.network, "m1.small", Visibility::Public))
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
}

#[tokio::test]
async fn test_private_flavor_cannot_reach_foreign_project() {
    let registry = registry();
    let fed = federation(&registry).await;
    let other = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let foreign = registry
        .create(Project::new(ProjectSpec::new(other.id, "p1", PROJECT_UUID)).unwrap())
        .await
        .unwrap();

    let result = registry
        .create(flavor(
            fed.compute,
            "g1.large",
            Visibility::private([foreign.id]).unwrap(),
        ))
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
}

#[tokio::test]
async fn test_effective_quota_fallback() {
    let registry = registry();
    let fed = federation(&registry).await;
    let caller = researchers(&fed);

    assert_eq!(
        registry
            .effective_quota(fed.project, fed.compute, &caller)
            .await
            .unwrap(),
        EffectiveQuota::Unbounded
    );

    let default = registry
        .create(
            Quota::new(QuotaSpec::default_for(
                fed.compute,
                QuotaLimits::compute(Some(100), Some(20), Some(204_800)),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        registry
            .effective_quota(fed.project, fed.compute, &caller)
            .await
            .unwrap(),
        EffectiveQuota::ServiceDefault(default)
    );

    let own = registry
        .create(
            Quota::new(QuotaSpec::for_project(
                fed.compute,
                fed.project,
                QuotaLimits::compute(Some(8), None, None),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    let effective = registry
        .effective_quota(fed.project, fed.compute, &caller)
        .await
        .unwrap();
    assert_eq!(effective.quota().and_then(|q| q.limits.get("cores")), Some(8));
    assert_eq!(effective, EffectiveQuota::Project(own));
}

#[test_case(QuotaLimits::network(), false ; "network limits on network service")]
#[test_case(QuotaLimits::compute(Some(4), None, None), true ; "compute limits on network service")]
#[test_case(QuotaLimits::block_storage(Some(10), None, None), true ; "storage limits on network service")]
#[tokio::test]
async fn test_quota_kind_must_match_service(limits: QuotaLimits, rejected: bool) {
    let registry = registry();
    let fed = federation(&registry).await;

    let result = registry
        .create(Quota::new(QuotaSpec::default_for(fed.network, limits)).unwrap())
        .await;
    assert_eq!(
        matches!(result, Err(RegistryError::InvariantViolation(_))),
        rejected
    );
}

#[tokio::test]
async fn test_one_default_quota_per_service() {
    let registry = registry();
    let fed = federation(&registry).await;
    let quota = || Quota::new(QuotaSpec::default_for(fed.network, QuotaLimits::network())).unwrap();

    registry.create(quota()).await.unwrap();
    assert!(matches!(
        registry.create(quota()).await,
        Err(RegistryError::Conflict { kind: NodeKind::Quota, .. })
    ));
}

#[test_case(QuotaLimits::object_store(None, Some(1000), None), false ; "object limits on swift")]
#[test_case(QuotaLimits::block_storage(Some(10), None, None), true ; "storage limits on swift")]
#[tokio::test]
async fn test_object_store_quota_kind(limits: QuotaLimits, rejected: bool) {
    let registry = registry();
    let fed = federation(&registry).await;
    let swift = registry
        .create(
            Service::new(ServiceSpec::new(
                fed.region,
                "https://swift.site1.example/",
                ServiceKind::swift(),
            ))
            .unwrap(),
        )
        .await
        .unwrap();

    let result = registry
        .create(Quota::new(QuotaSpec::for_project(swift.id, fed.project, limits)).unwrap())
        .await;
    assert_eq!(
        matches!(result, Err(RegistryError::InvariantViolation(_))),
        rejected
    );
    if !rejected {
        let effective = registry
            .effective_quota(fed.project, swift.id, &researchers(&fed))
            .await
            .unwrap();
        assert_eq!(effective.quota().and_then(|q| q.limits.get("containers")), Some(1000));
    }
}

// ============================================================================
// Cascading deletes
// ============================================================================

#[tokio::test]
async fn test_project_delete_refused_while_granted() {
    let registry = registry();
    let fed = federation(&registry).await;

    let result = registry
        .delete::<Project>(fed.project, DeleteOptions::default())
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));

    // Nothing changed
    let still: Project = registry
        .read(fed.project, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(still.id, fed.project);
}

#[tokio::test]
async fn test_forced_project_delete_cascades_and_unshares() {
    let registry = registry();
    let fed = federation(&registry).await;
    let p2 = registry
        .create(Project::new(ProjectSpec::new(fed.provider, "p2", "p2-uuid")).unwrap())
        .await
        .unwrap();
    let shared = registry
        .create(flavor(
            fed.compute,
            "shared",
            Visibility::private([fed.project, p2.id]).unwrap(),
        ))
        .await
        .unwrap();
    let solo = registry
        .create(flavor(
            fed.compute,
            "solo",
            Visibility::private([fed.project]).unwrap(),
        ))
        .await
        .unwrap();
    let quota = registry
        .create(
            Quota::new(QuotaSpec::for_project(
                fed.network,
                fed.project,
                QuotaLimits::network(),
            ))
            .unwrap(),
        )
        .await
        .unwrap();

    let report = registry
        .delete::<Project>(fed.project, DeleteOptions::forced())
        .await
        .unwrap();

    assert_eq!(report.removed.last(), Some(&(NodeKind::Project, fed.project)));
    assert_eq!(report.removed_ids(NodeKind::Sla), vec![fed.sla]);
    assert_eq!(report.removed_ids(NodeKind::Quota), vec![quota.id]);
    assert_eq!(report.removed_ids(NodeKind::Flavor), vec![solo.id]);
    assert_eq!(
        report.relinked,
        vec![Relink::Unshare {
            kind: NodeKind::Flavor,
            entry_id: shared.id,
            project_id: fed.project,
        }]
    );

    let shared: Flavor = registry
        .read(shared.id, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(shared.visibility.projects(), vec![p2.id]);
    assert!(matches!(
        registry.read::<Flavor>(solo.id, &CallerScope::Unrestricted).await,
        Err(RegistryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_provider_delete_keeps_identity_provider() {
    let registry = registry();
    let fed = federation(&registry).await;
    let default = registry
        .create(
            Quota::new(QuotaSpec::default_for(
                fed.compute,
                QuotaLimits::compute(Some(100), None, None),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    let own = registry
        .create(
            Quota::new(QuotaSpec::for_project(
                fed.network,
                fed.project,
                QuotaLimits::network(),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    let small = registry
        .create(flavor(fed.compute, "m1.small", Visibility::Public))
        .await
        .unwrap();

    assert!(matches!(
        registry
            .delete::<Provider>(fed.provider, DeleteOptions::default())
            .await,
        Err(RegistryError::InvariantViolation(_))
    ));

    let report = registry
        .delete::<Provider>(fed.provider, DeleteOptions::forced())
        .await
        .unwrap();
    for kind in [
        NodeKind::Region,
        NodeKind::Service,
        NodeKind::Project,
        NodeKind::Sla,
    ] {
        assert!(report.removed_count(kind) > 0, "{} not removed", kind);
    }
    assert_eq!(report.removed_count(NodeKind::IdentityProvider), 0);
    let mut quotas = report.removed_ids(NodeKind::Quota);
    quotas.sort();
    let mut expected = vec![default.id, own.id];
    expected.sort();
    assert_eq!(quotas, expected);
    assert_eq!(report.removed_ids(NodeKind::Flavor), vec![small.id]);
    assert!(matches!(
        registry.read::<Quota>(own.id, &CallerScope::Unrestricted).await,
        Err(RegistryError::NotFound { .. })
    ));

    let idp: IdentityProvider = registry
        .read(fed.identity_provider, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(idp.endpoint.as_str(), IDP_ENDPOINT);
    // identity provider and its user group
    assert_eq!(registry.store().node_count().await, 2);
    assert_eq!(registry.store().edge_count().await, 1);
}

#[tokio::test]
async fn test_identity_provider_delete_drops_trust() {
    let registry = registry();
    let fed = federation(&registry).await;

    assert!(matches!(
        registry
            .delete::<IdentityProvider>(fed.identity_provider, DeleteOptions::default())
            .await,
        Err(RegistryError::InvariantViolation(_))
    ));

    let report = registry
        .delete::<IdentityProvider>(fed.identity_provider, DeleteOptions::forced())
        .await
        .unwrap();
    assert_eq!(report.removed_ids(NodeKind::UserGroup), vec![fed.user_group]);
    assert_eq!(report.removed_ids(NodeKind::Sla), vec![fed.sla]);

    let site: Provider = registry
        .read(fed.provider, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert!(site.identity_providers.is_empty());
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn test_list_projects_isolation() {
    let registry = registry();
    let fed = federation(&registry).await;
    let site2 = registry
        .create(fixtures::provider("site2", fed.identity_provider))
        .await
        .unwrap();
    let hidden = registry
        .create(Project::new(ProjectSpec::new(site2.id, "p9", "p9-uuid")).unwrap())
        .await
        .unwrap();

    let visible = registry
        .list_projects(&ListQuery::new(), &researchers(&fed))
        .await
        .unwrap();
    assert_eq!(visible.iter().map(|p| p.id).collect::<Vec<_>>(), vec![fed.project]);

    assert!(registry
        .list_projects(&ListQuery::new(), &CallerScope::Anonymous)
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        registry.read::<Project>(hidden.id, &researchers(&fed)).await,
        Err(RegistryError::NotFound { .. })
    ));

    let everything = registry
        .list_projects(&ListQuery::new(), &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn test_public_provider_visible_to_anonymous() {
    let registry = registry();
    let fed = federation(&registry).await;
    registry
        .create(Provider::new(ProviderSpec::new("open-cloud", ProviderType::Kubernetes).public()).unwrap())
        .await
        .unwrap();

    let anonymous = registry
        .list_providers(&ListQuery::new(), &CallerScope::Anonymous)
        .await
        .unwrap();
    assert_eq!(
        anonymous.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["open-cloud"]
    );

    let granted = registry
        .list_providers(&ListQuery::new().filter("name", "site1"), &researchers(&fed))
        .await
        .unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].id, fed.provider);
}

#[tokio::test]
async fn test_unknown_group_sees_only_public() {
    let registry = registry();
    let fed = federation(&registry).await;

    let stranger = CallerScope::groups([Uuid::now_v7()]);
    assert!(matches!(
        registry.read::<Provider>(fed.provider, &stranger).await,
        Err(RegistryError::NotFound { .. })
    ));
    assert!(matches!(
        registry
            .effective_quota(fed.project, fed.compute, &stranger)
            .await,
        Err(RegistryError::NotFound { kind: NodeKind::Project, .. })
    ));
}

// ============================================================================
// Onboarding
// ============================================================================

#[tokio::test]
async fn test_onboarding_rolls_back_on_conflict() {
    let registry = registry();
    federation(&registry).await;
    let before = registry.store().node_count().await;

    // Reuses the fixture's compute endpoint, which must be unique
    let manifest = serde_json::from_value(serde_json::json!({
        "name": "site2",
        "provider_type": "openstack",
        "projects": [{ "name": "p1", "uuid": "p1-uuid" }],
        "regions": [{
            "name": "r1",
            "services": [{
                "endpoint": fixtures::COMPUTE_ENDPOINT,
                "kind": { "type": "compute", "name": "org.openstack.nova" }
            }]
        }]
    }))
    .unwrap();

    let result = registry.onboard_provider(manifest).await;
    assert!(matches!(result, Err(RegistryError::Conflict { .. })));
    assert_eq!(registry.store().node_count().await, before);
}
