// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider onboarding and re-synchronisation
//!
//! Manifests are applied next to the fixture federation, so identity
//! providers and user groups already in the graph get reused rather than
//! duplicated.

mod fixtures;

use pretty_assertions::assert_eq;
use serde_json::json;

use fed_registry::domain::{Flavor, IdentityProvider, Project, Provider, Quota, Region, Sla};
use fed_registry::{CallerScope, ListQuery, NodeKind, ProviderManifest, RegistryError};

use fixtures::{federation, registry, Federation, IDP_ENDPOINT};

fn researchers(fed: &Federation) -> CallerScope {
    CallerScope::groups([fed.user_group])
}

/// Second site trusting the fixture identity provider under a spelling that
/// canonicalises to the same endpoint
fn site2(sla_project_uuid: &str) -> ProviderManifest {
    serde_json::from_value(json!({
        "name": "site2",
        "provider_type": "openstack",
        "projects": [{ "name": "shared", "uuid": "site2-shared" }],
        "regions": [{
            "name": "r1",
            "services": [{
                "endpoint": "https://compute.site2.example/",
                "kind": { "type": "compute", "name": "org.openstack.nova" }
            }]
        }],
        "identity_providers": [{
            "endpoint": "https://IDP.example",
            "group_claim": "groups",
            "idp_name": "egi",
            "protocol": "openid",
            "user_groups": [{
                "name": "researchers",
                "slas": [{
                    "doc_uuid": "sla-site2-researchers",
                    "project_uuid": sla_project_uuid,
                    "start_date": "2025-03-01"
                }]
            }]
        }]
    }))
    .unwrap()
}

/// Provider with two regions, catalog entries and quotas for `sync_provider`
fn site3() -> serde_json::Value {
    json!({
        "name": "site3",
        "provider_type": "openstack",
        "description": "first rack",
        "projects": [
            { "name": "alpha", "uuid": "alpha-uuid" },
            { "name": "beta", "uuid": "beta-uuid" }
        ],
        "regions": [
            {
                "name": "north",
                "services": [{
                    "endpoint": "https://compute.north.site3.example/",
                    "kind": { "type": "compute", "name": "org.openstack.nova" },
                    "quotas": [
                        { "limits": { "type": "compute", "cores": 64 } },
                        { "project_uuid": "beta-uuid", "limits": { "type": "compute", "cores": 4 } }
                    ],
                    "flavors": [
                        { "name": "m1.small", "uuid": "small", "vcpus": 1 },
                        { "name": "g1.large", "uuid": "large", "projects": ["beta-uuid"] }
                    ]
                }]
            },
            {
                "name": "south",
                "services": [{
                    "endpoint": "https://network.south.site3.example/",
                    "kind": { "type": "network", "name": "org.openstack.neutron" },
                    "networks": [{ "name": "public", "uuid": "net-public" }]
                }]
            }
        ],
        "identity_providers": [{
            "endpoint": IDP_ENDPOINT,
            "group_claim": "groups",
            "idp_name": "egi",
            "protocol": "openid",
            "user_groups": [{
                "name": "researchers",
                "slas": [{
                    "doc_uuid": "sla-site3-alpha",
                    "project_uuid": "alpha-uuid",
                    "start_date": "2025-01-01"
                }]
            }]
        }]
    })
}

fn manifest(value: serde_json::Value) -> ProviderManifest {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Onboarding
// ============================================================================

#[tokio::test]
async fn test_onboarding_reuses_identity_provider_and_group() {
    let registry = registry();
    let fed = federation(&registry).await;

    let report = registry.onboard_provider(site2("site2-shared")).await.unwrap();

    assert_eq!(report.identity_providers_reused, vec![fed.identity_provider]);
    assert!(report.identity_providers_created.is_empty());
    assert_eq!(report.user_groups_reused, vec![fed.user_group]);
    assert!(report.user_groups_created.is_empty());
    assert_eq!(report.slas.len(), 1);

    let idps: Vec<IdentityProvider> = registry
        .list(&ListQuery::new(), &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(idps.len(), 1);

    let sla: Sla = registry
        .read(report.slas[0], &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(sla.project_id, report.projects[0]);
    assert_eq!(sla.user_group_id, fed.user_group);

    // The fixture project plus the one granted by the new SLA
    let visible = registry
        .list_projects(&ListQuery::new(), &researchers(&fed))
        .await
        .unwrap();
    let mut ids: Vec<_> = visible.iter().map(|p| p.id).collect();
    ids.sort();
    let mut expected = vec![fed.project, report.projects[0]];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_onboarding_rejects_unknown_project_uuid() {
    let registry = registry();
    let fed = federation(&registry).await;
    let before = registry.store().node_count().await;

    let result = registry.onboard_provider(site2("no-such-project")).await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
    assert_eq!(registry.store().node_count().await, before);

    let providers = registry
        .list_providers(&ListQuery::new(), &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(providers.iter().map(|p| p.id).collect::<Vec<_>>(), vec![fed.provider]);
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_sync_creates_patches_and_removes() {
    let registry = registry();
    let fed = federation(&registry).await;
    let onboarded = registry.onboard_provider(manifest(site3())).await.unwrap();
    let (small, large) = (onboarded.flavors[0], onboarded.flavors[1]);

    let mut next = site3();
    next["description"] = json!("second rack");
    // south goes, with its network service and network
    next["regions"].as_array_mut().unwrap().truncate(1);
    let north = &mut next["regions"][0]["services"][0];
    north["quotas"] = json!([{ "limits": { "type": "compute", "cores": 128 } }]);
    north["flavors"] = json!([
        { "name": "m1.small", "uuid": "small", "vcpus": 2 },
        { "name": "m1.medium", "uuid": "medium", "vcpus": 4 }
    ]);
    next["projects"] = json!([{ "name": "alpha", "uuid": "alpha-uuid" }]);

    let report = registry
        .sync_provider(onboarded.provider_id, manifest(next))
        .await
        .unwrap();

    assert_eq!(report.updated_ids(NodeKind::Provider), vec![onboarded.provider_id]);
    assert_eq!(report.updated_ids(NodeKind::Flavor), vec![small]);
    assert_eq!(report.updated_ids(NodeKind::Quota), vec![onboarded.quotas[0]]);
    assert_eq!(report.created_ids(NodeKind::Flavor).len(), 1);
    assert_eq!(report.removed_ids(NodeKind::Flavor), vec![large]);
    assert_eq!(report.removed_ids(NodeKind::Quota), vec![onboarded.quotas[1]]);
    assert_eq!(report.removed_ids(NodeKind::Region), vec![onboarded.regions[1]]);
    assert_eq!(report.removed_ids(NodeKind::Service), vec![onboarded.services[1]]);
    assert_eq!(report.removed_ids(NodeKind::Network), vec![onboarded.networks[0]]);
    assert_eq!(report.removed_ids(NodeKind::Project), vec![onboarded.projects[1]]);
    assert!(report.removed_ids(NodeKind::Sla).is_empty());

    let provider: Provider = registry
        .read(onboarded.provider_id, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(provider.description.as_deref(), Some("second rack"));
    let flavor: Flavor = registry
        .read(small, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(flavor.vcpus, Some(2));
    let quota: Quota = registry
        .read(onboarded.quotas[0], &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(quota.limits.get("cores"), Some(128));

    // The fixture federation is untouched
    let fixture_project: Project = registry
        .read(fed.project, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(fixture_project.provider_id, fed.provider);
}

#[tokio::test]
async fn test_sync_moves_service_between_regions() {
    let registry = registry();
    federation(&registry).await;
    let onboarded = registry.onboard_provider(manifest(site3())).await.unwrap();

    let mut next = site3();
    let network = next["regions"][1]["services"][0].take();
    next["regions"][0]["services"]
        .as_array_mut()
        .unwrap()
        .push(network);
    next["regions"].as_array_mut().unwrap().truncate(1);

    let report = registry
        .sync_provider(onboarded.provider_id, manifest(next))
        .await
        .unwrap();
    assert_eq!(report.updated_ids(NodeKind::Service), vec![onboarded.services[1]]);
    assert_eq!(report.removed, vec![(NodeKind::Region, onboarded.regions[1])]);

    let region: Region = registry
        .read(onboarded.regions[0], &CallerScope::Unrestricted)
        .await
        .unwrap();
    let service: fed_registry::domain::Service = registry
        .read(onboarded.services[1], &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(service.region_id, region.id);
}

#[tokio::test]
async fn test_sync_dropping_trust_removes_its_slas() {
    let registry = registry();
    let fed = federation(&registry).await;
    let onboarded = registry.onboard_provider(manifest(site3())).await.unwrap();

    let mut next = site3();
    next["identity_providers"] = json!([]);
    let report = registry
        .sync_provider(onboarded.provider_id, manifest(next))
        .await
        .unwrap();
    assert_eq!(report.removed_ids(NodeKind::Sla), onboarded.slas);

    let provider: Provider = registry
        .read(onboarded.provider_id, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert!(provider.identity_providers.is_empty());
    // The shared identity provider and group survive
    let idp: IdentityProvider = registry
        .read(fed.identity_provider, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(idp.endpoint.as_str(), IDP_ENDPOINT);
    let visible = registry
        .list_projects(&ListQuery::new(), &researchers(&fed))
        .await
        .unwrap();
    assert_eq!(visible.iter().map(|p| p.id).collect::<Vec<_>>(), vec![fed.project]);
}

#[tokio::test]
async fn test_failed_sync_rolls_back() {
    let registry = registry();
    federation(&registry).await;
    let onboarded = registry.onboard_provider(manifest(site3())).await.unwrap();
    let before = registry.store().node_count().await;

    let mut next = site3();
    next["description"] = json!("changed");
    next["projects"] = json!([{ "name": "alpha", "uuid": "alpha-uuid" }]);
    // Still granted to beta, which the manifest no longer declares
    next["regions"][0]["services"][0]["flavors"][1]["projects"] = json!(["beta-uuid"]);

    let result = registry
        .sync_provider(onboarded.provider_id, manifest(next))
        .await;
    assert!(matches!(result, Err(RegistryError::InvariantViolation(_))));
    assert_eq!(registry.store().node_count().await, before);

    let provider: Provider = registry
        .read(onboarded.provider_id, &CallerScope::Unrestricted)
        .await
        .unwrap();
    assert_eq!(provider.description.as_deref(), Some("first rack"));
}
