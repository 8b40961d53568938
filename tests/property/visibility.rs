// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of caller visibility over generated federations

use std::collections::BTreeSet;

use fed_registry::domain::{Project, ProjectSpec, Quota, QuotaLimits, QuotaSpec, Sla, SlaSpec};
use fed_registry::{CallerScope, EffectiveQuota, ListQuery};
use proptest::prelude::*;
use uuid::Uuid;

use crate::fixtures;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A group sees exactly the projects its SLAs grant
    #[test]
    fn prop_group_sees_granted_projects(grants in prop::collection::vec(any::<bool>(), 1..8)) {
        let (granted, visible) = tokio_test::block_on(async {
            let registry = fixtures::registry();
            let fed = fixtures::federation(&registry).await;

            let mut granted = BTreeSet::from([fed.project]);
            for (n, grant) in grants.iter().enumerate() {
                let project = registry
                    .create(
                        Project::new(ProjectSpec::new(
                            fed.provider,
                            format!("extra-{}", n),
                            format!("extra-uuid-{}", n),
                        ))
                        .unwrap(),
                    )
                    .await
                    .unwrap();
                if *grant {
                    registry
                        .create(
                            Sla::new(SlaSpec::new(
                                fed.user_group,
                                project.id,
                                format!("sla-extra-{}", n),
                                fixtures::sla_start(),
                            ))
                            .unwrap(),
                        )
                        .await
                        .unwrap();
                    granted.insert(project.id);
                }
            }

            let visible: BTreeSet<Uuid> = registry
                .list_projects(&ListQuery::new(), &CallerScope::groups([fed.user_group]))
                .await
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect();
            (granted, visible)
        });
        prop_assert_eq!(granted, visible);
    }

    /// Pagination is a window over the full visible listing
    #[test]
    fn prop_pagination_windows_full_listing(
        count in 1usize..12,
        skip in 0usize..14,
        limit in 1usize..6,
    ) {
        let (all, page) = tokio_test::block_on(async {
            let registry = fixtures::registry();
            let fed = fixtures::federation(&registry).await;
            for n in 0..count {
                registry
                    .create(
                        Project::new(ProjectSpec::new(
                            fed.provider,
                            format!("page-{}", n),
                            format!("page-uuid-{}", n),
                        ))
                        .unwrap(),
                    )
                    .await
                    .unwrap();
            }
            let caller = CallerScope::Unrestricted;
            let all = registry
                .list_projects(&ListQuery::new(), &caller)
                .await
                .unwrap();
            let page = registry
                .list_projects(&ListQuery::new().skip(skip).limit(limit), &caller)
                .await
                .unwrap();
            (all, page)
        });

        let expected: Vec<_> = all.into_iter().skip(skip).take(limit).collect();
        prop_assert_eq!(page, expected);
    }

    /// Per-project quota wins over the service default, which wins over none
    #[test]
    fn prop_quota_fallback_order(with_default in any::<bool>(), with_project in any::<bool>()) {
        let (effective, default, own) = tokio_test::block_on(async {
            let registry = fixtures::registry();
            let fed = fixtures::federation(&registry).await;

            let mut default = None;
            if with_default {
                let quota = Quota::new(QuotaSpec::default_for(fed.network, QuotaLimits::network()))
                    .unwrap();
                default = Some(registry.create(quota).await.unwrap());
            }
            let mut own = None;
            if with_project {
                let quota = Quota::new(QuotaSpec::for_project(
                    fed.network,
                    fed.project,
                    QuotaLimits::network(),
                ))
                .unwrap();
                own = Some(registry.create(quota).await.unwrap());
            }

            let effective = registry
                .effective_quota(fed.project, fed.network, &CallerScope::groups([fed.user_group]))
                .await
                .unwrap();
            (effective, default, own)
        });

        let expected = match (own, default) {
            (Some(own), _) => EffectiveQuota::Project(own),
            (None, Some(default)) => EffectiveQuota::ServiceDefault(default),
            (None, None) => EffectiveQuota::Unbounded,
        };
        prop_assert_eq!(effective, expected);
    }
}
