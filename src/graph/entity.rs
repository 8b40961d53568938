// Copyright (c) 2025 - Cowboy AI, Inc.
//! Mapping between domain entities and graph nodes/edges
//!
//! Each entity declares the relationship types it owns. Saving an entity
//! replaces exactly those edges incident on its node, so an edge is always
//! derived from the attributes of one entity and never drifts from them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use uuid::Uuid;

use super::{Edge, Node, NodeKind, RelationshipType, StoreError, StoreResult};
use crate::domain::{
    CatalogEntry, Flavor, IdentityProvider, Image, Network, Project, Provider, Quota, Region,
    Service, Sla, UserGroup,
};

/// An entity persisted as one graph node
pub trait Entity: Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static {
    const KIND: NodeKind;

    /// Relationship types whose edges this entity owns
    const LINKS: &'static [RelationshipType];

    fn id(&self) -> Uuid;

    /// Owned edges implied by the entity's attributes
    fn links(&self) -> Vec<Edge>;

    fn to_node(&self) -> StoreResult<Node> {
        match serde_json::to_value(self)? {
            Value::Object(properties) => Ok(Node {
                kind: Self::KIND,
                id: self.id(),
                properties,
            }),
            other => Err(StoreError::Codec(format!(
                "{} serialized to a non-object: {}",
                Self::KIND,
                other
            ))),
        }
    }

    fn from_node(node: Node) -> StoreResult<Self> {
        if node.kind != Self::KIND {
            return Err(StoreError::Codec(format!(
                "expected {} node, found {}",
                Self::KIND,
                node.kind
            )));
        }
        Ok(serde_json::from_value(Value::Object(node.properties))?)
    }
}

impl Entity for Provider {
    const KIND: NodeKind = NodeKind::Provider;
    const LINKS: &'static [RelationshipType] = &[RelationshipType::Trusts];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        self.identity_providers
            .iter()
            .map(|link| {
                Edge::new(self.id, RelationshipType::Trusts, link.identity_provider_id)
                    .with_property("idp_name", link.idp_name.clone())
                    .with_property("protocol", link.protocol.clone())
            })
            .collect()
    }
}

impl Entity for Region {
    const KIND: NodeKind = NodeKind::Region;
    const LINKS: &'static [RelationshipType] = &[RelationshipType::HasRegion];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        vec![Edge::new(self.provider_id, RelationshipType::HasRegion, self.id)]
    }
}

impl Entity for IdentityProvider {
    const KIND: NodeKind = NodeKind::IdentityProvider;
    const LINKS: &'static [RelationshipType] = &[];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        Vec::new()
    }
}

impl Entity for UserGroup {
    const KIND: NodeKind = NodeKind::UserGroup;
    const LINKS: &'static [RelationshipType] = &[RelationshipType::HasUserGroup];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        vec![Edge::new(
            self.identity_provider_id,
            RelationshipType::HasUserGroup,
            self.id,
        )]
    }
}

impl Entity for Project {
    const KIND: NodeKind = NodeKind::Project;
    const LINKS: &'static [RelationshipType] = &[RelationshipType::HasProject];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        vec![Edge::new(self.provider_id, RelationshipType::HasProject, self.id)]
    }
}

impl Entity for Sla {
    const KIND: NodeKind = NodeKind::Sla;
    const LINKS: &'static [RelationshipType] =
        &[RelationshipType::HoldsSla, RelationshipType::Grants];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        vec![
            Edge::new(self.user_group_id, RelationshipType::HoldsSla, self.id),
            Edge::new(self.id, RelationshipType::Grants, self.project_id),
        ]
    }
}

impl Entity for Service {
    const KIND: NodeKind = NodeKind::Service;
    const LINKS: &'static [RelationshipType] = &[RelationshipType::Hosts];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        vec![Edge::new(self.region_id, RelationshipType::Hosts, self.id)]
    }
}

impl Entity for Quota {
    const KIND: NodeKind = NodeKind::Quota;
    const LINKS: &'static [RelationshipType] =
        &[RelationshipType::LimitedBy, RelationshipType::AppliesTo];

    fn id(&self) -> Uuid {
        self.id
    }

    fn links(&self) -> Vec<Edge> {
        let mut links = vec![Edge::new(self.service_id, RelationshipType::LimitedBy, self.id)];
        if let Some(project_id) = self.project_id {
            links.push(Edge::new(self.id, RelationshipType::AppliesTo, project_id));
        }
        links
    }
}

fn catalog_links<E: CatalogEntry>(entry: &E, id: Uuid) -> Vec<Edge> {
    std::iter::once(Edge::new(entry.service_id(), RelationshipType::Offers, id))
        .chain(
            entry
                .visibility()
                .projects()
                .into_iter()
                .map(|project_id| Edge::new(project_id, RelationshipType::CanUse, id)),
        )
        .collect()
}

macro_rules! catalog_entity {
    ($entity:ty, $kind:expr) => {
        impl Entity for $entity {
            const KIND: NodeKind = $kind;
            const LINKS: &'static [RelationshipType] =
                &[RelationshipType::Offers, RelationshipType::CanUse];

            fn id(&self) -> Uuid {
                self.id
            }

            fn links(&self) -> Vec<Edge> {
                catalog_links(self, self.id)
            }
        }
    };
}

catalog_entity!(Flavor, NodeKind::Flavor);
catalog_entity!(Image, NodeKind::Image);
catalog_entity!(Network, NodeKind::Network);
