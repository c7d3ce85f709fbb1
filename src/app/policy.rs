//! Who may do what to an authored resource.
//!
//! Reads are open to everyone, creates need an identity, and updates or
//! deletes need the identity that created the resource. The rule is the same
//! for every resource that implements [`Authored`].

use crate::app::error::ServiceError;
use crate::domain::principal::{Authored, Operation, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No identity, but the operation needs one.
    AuthenticationRequired,
    /// An identity that is not allowed to touch this resource.
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(Denial::AuthenticationRequired) => {
                Err(ServiceError::AuthenticationRequired)
            }
            Self::Deny(Denial::PermissionDenied) => Err(ServiceError::permission_denied(
                "you do not have permission to perform this action",
            )),
        }
    }
}

pub fn is_authenticated(principal: &Principal) -> bool {
    principal.is_authenticated()
}

pub fn is_owner<R: Authored + ?Sized>(principal: &Principal, resource: &R) -> bool {
    principal.id() == Some(resource.author_id())
}

/// Decides whether `principal` may perform `operation`.
///
/// `resource` is the existing instance for Read/Update/Delete and `None` for
/// Create. An Update or Delete without an instance is denied.
pub fn decide<R: Authored + ?Sized>(
    principal: &Principal,
    resource: Option<&R>,
    operation: Operation,
) -> Decision {
    if operation.is_safe() {
        return Decision::Allow;
    }
    if !is_authenticated(principal) {
        return Decision::Deny(Denial::AuthenticationRequired);
    }
    match operation {
        Operation::Create => Decision::Allow,
        Operation::Update | Operation::Delete => match resource {
            Some(resource) if is_owner(principal, resource) => Decision::Allow,
            _ => Decision::Deny(Denial::PermissionDenied),
        },
        Operation::Read => Decision::Allow,
    }
}
