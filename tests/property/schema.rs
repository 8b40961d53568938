// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of single-entity schema values

use fed_registry::domain::{Endpoint, Visibility};
use proptest::prelude::*;
use uuid::Uuid;

fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}(\\.[a-z][a-z0-9]{0,8}){1,3}"
}

fn project_ids() -> impl Strategy<Value = Vec<Uuid>> {
    prop::collection::vec(any::<u128>().prop_map(Uuid::from_u128), 1..8)
}

proptest! {
    /// Host case and a missing root path do not make a different endpoint
    #[test]
    fn prop_endpoint_canonical_form(host in host(), https in any::<bool>()) {
        let scheme = if https { "https" } else { "http" };
        let lower = Endpoint::new(format!("{}://{}/", scheme, host)).unwrap();
        let upper = Endpoint::new(format!("{}://{}", scheme, host.to_uppercase())).unwrap();
        prop_assert_eq!(&lower, &upper);
        prop_assert_eq!(lower.host(), host.as_str());
    }

    /// Canonical form is a fixed point
    #[test]
    fn prop_endpoint_reparse_is_identity(host in host(), port in 1u16..65535) {
        let endpoint = Endpoint::new(format!("https://{}:{}/v3", host, port)).unwrap();
        let again = Endpoint::new(endpoint.as_str()).unwrap();
        prop_assert_eq!(endpoint, again);
    }

    /// Unsharing removes exactly one project and never leaves an empty
    /// private entry
    #[test]
    fn prop_unshare_removes_one_project(projects in project_ids(), pick in any::<prop::sample::Index>()) {
        let visibility = Visibility::private(projects.iter().copied()).unwrap();
        let members = visibility.projects();
        let removed = members[pick.index(members.len())];

        match visibility.without_project(removed) {
            None => prop_assert_eq!(members.len(), 1),
            Some(rest) => {
                prop_assert!(!rest.is_shared_with(removed));
                prop_assert_eq!(rest.projects().len(), members.len() - 1);
                for project in members.iter().filter(|p| **p != removed) {
                    prop_assert!(rest.is_shared_with(*project));
                }
            }
        }
    }

    #[test]
    fn prop_public_survives_unshare(project in any::<u128>().prop_map(Uuid::from_u128)) {
        prop_assert_eq!(Visibility::Public.without_project(project), Some(Visibility::Public));
    }
}
