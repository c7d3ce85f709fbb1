use serde::Serialize;
use uuid::Uuid;

/// The identity a request acts as. Resolved once per request and never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Anonymous,
    Authenticated { id: Uuid },
}

impl Principal {
    pub fn user(id: Uuid) -> Self {
        Self::Authenticated { id }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { id } => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// What a request intends to do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_safe(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Resources whose writes are scoped to the user that created them.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}
