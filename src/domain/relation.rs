use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::Like;
use crate::domain::social_graph::Follow;

/// Unique binary relations between an acting user and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// user -> post
    Like,
    /// follower -> followee
    Follow,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Follow => "follow",
        }
    }
}

/// One present (actor, target) pair of a relation.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: Uuid,
    pub kind: RelationKind,
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub created_at: OffsetDateTime,
}

impl Edge {
    pub fn cursor(&self) -> (OffsetDateTime, Uuid) {
        (self.created_at, self.id)
    }
}

impl From<Edge> for Like {
    fn from(edge: Edge) -> Self {
        Like {
            id: edge.id,
            user_id: edge.actor_id,
            post_id: edge.target_id,
            created_at: edge.created_at,
        }
    }
}

impl From<Edge> for Follow {
    fn from(edge: Edge) -> Self {
        Follow {
            follower_id: edge.actor_id,
            followee_id: edge.target_id,
            created_at: edge.created_at,
        }
    }
}

/// Which end of the relation a listing is anchored on.
#[derive(Debug, Clone, Copy)]
pub enum EdgeAnchor {
    Actor(Uuid),
    Target(Uuid),
}

#[derive(Debug, Clone)]
pub struct EdgeQuery {
    pub kind: RelationKind,
    pub anchor: EdgeAnchor,
    pub cursor: Option<(OffsetDateTime, Uuid)>,
    pub limit: i64,
}
