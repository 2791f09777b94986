//! Repository access decisions for Git operations.
//!
//! Ownership and contributor roles collapse into a single [`Capability`],
//! which is then compared against what the operation needs.

use crate::error::Result;
use crate::store::Store;
use crate::types::{Capability, Operation, Owner, Repository, Role, User};

/// The grant data the policy needs from the store.
pub trait GrantLookup {
    fn is_member(&self, organization_id: i64, user_id: i64) -> Result<bool>;
    fn contributor_role(&self, repository_id: i64, user_id: i64) -> Result<Option<Role>>;
}

impl<S: Store + ?Sized> GrantLookup for S {
    fn is_member(&self, organization_id: i64, user_id: i64) -> Result<bool> {
        self.is_organization_member(organization_id, user_id)
    }

    fn contributor_role(&self, repository_id: i64, user_id: i64) -> Result<Option<Role>> {
        Ok(self
            .find_contributor(repository_id, user_id)?
            .map(|contributor| contributor.role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No actor was resolved but one is required.
    Unauthenticated,
    /// The actor lacks the required capability.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Capability),
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// Anonymous access is only possible for reads of public repositories.
#[must_use]
pub fn requires_actor(repo: &Repository, operation: Operation) -> bool {
    !(repo.visibility.is_public() && operation == Operation::Read)
}

/// Highest capability `actor` holds on `repo`, if any.
pub fn capability<G: GrantLookup + ?Sized>(
    repo: &Repository,
    actor: Option<&User>,
    grants: &G,
) -> Result<Option<Capability>> {
    let public = repo.visibility.is_public().then_some(Capability::PublicRead);

    let Some(actor) = actor else {
        return Ok(public);
    };

    let owns = match repo.owner {
        Owner::User(user_id) => user_id == actor.id,
        Owner::Organization(org_id) => grants.is_member(org_id, actor.id)?,
    };
    if owns {
        return Ok(Some(Capability::Owner));
    }

    if let Some(role) = grants.contributor_role(repo.id, actor.id)? {
        return Ok(Some(Capability::from(role)));
    }

    Ok(public)
}

pub fn decide<G: GrantLookup + ?Sized>(
    repo: &Repository,
    actor: Option<&User>,
    grants: &G,
    operation: Operation,
) -> Result<Decision> {
    if !requires_actor(repo, operation) {
        return Ok(Decision::Allow(Capability::PublicRead));
    }

    let Some(actor) = actor else {
        return Ok(Decision::Deny(DenyReason::Unauthenticated));
    };

    Ok(match capability(repo, Some(actor), grants)? {
        Some(capability) if capability.permits(operation) => Decision::Allow(capability),
        _ => Decision::Deny(DenyReason::Forbidden),
    })
}
