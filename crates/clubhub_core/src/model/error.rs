//! Domain error taxonomy.
//!
//! # Responsibility
//! - Name exactly one error variant per violated invariant.
//! - Stay transport agnostic; callers map variants to their own envelopes.
//!
//! # Invariants
//! - Entity methods return an error before mutating any field, so a failed
//!   call leaves the aggregate unchanged.

use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Set-like collections owned by a club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tag,
    Photo,
    Event,
    Member,
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Tag => "tag",
            Self::Photo => "photo",
            Self::Event => "event",
            Self::Member => "member",
        };
        f.write_str(label)
    }
}

/// Entity kinds, used to label identity errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Club,
    User,
    Member,
    Review,
    Event,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Club => "club",
            Self::User => "user",
            Self::Member => "member",
            Self::Review => "review",
            Self::Event => "event",
        };
        f.write_str(label)
    }
}

/// Invariant violations raised by the entity layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0} id must not be the nil uuid")]
    NilId(EntityKind),
    #[error("{0} name must not be empty")]
    InvalidName(EntityKind),
    #[error("user email must not be empty")]
    InvalidEmail,
    #[error("event title must not be empty")]
    InvalidTitle,
    #[error("a member must reference a user")]
    MissingUserId,
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("review feedback must be 1 or -1, got {0}")]
    InvalidFeedback(i8),
    #[error("event feedback must be 1, got {0}")]
    InvalidEventFeedback(i8),
    #[error("a club must have at least one member")]
    MinimumMembers,
    #[error("a club must have at least one president")]
    NoPresident,
    #[error("club must keep at least one active president")]
    LastPresident,
    #[error("member {0} is already a president")]
    AlreadyPresident(Uuid),
    #[error("member {0} is not a president")]
    NotAPresident(Uuid),
    #[error("not a member of this club")]
    NotAMember,
    #[error("user already holds a membership for club {0}")]
    DuplicateMembership(Uuid),
    #[error("user holds no membership for club {0}")]
    NoMembership(Uuid),
    #[error("user {0} has not applied to this club")]
    NoApplication(Uuid),
    #[error("user {0} has already applied to this club")]
    DuplicateApplication(Uuid),
    #[error("no application from user {0}")]
    ApplicationNotFound(Uuid),
    #[error("club already contains {kind} `{value}`")]
    Duplicate { kind: Collection, value: String },
    #[error("club does not contain {kind} `{value}`")]
    NotFound { kind: Collection, value: String },
    #[error("member has not written a review")]
    NoReview,
    #[error("feedback already recorded for {0}")]
    DuplicateFeedback(Uuid),
    #[error("no feedback recorded for {0}")]
    NoFeedback(Uuid),
    #[error("this member cannot manage this club")]
    UnauthorizedAction,
}

impl DomainError {
    pub(crate) fn duplicate(kind: Collection, value: impl ToString) -> Self {
        Self::Duplicate {
            kind,
            value: value.to_string(),
        }
    }

    pub(crate) fn not_found(kind: Collection, value: impl ToString) -> Self {
        Self::NotFound {
            kind,
            value: value.to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure converting between an entity and its JSON document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The JSON value does not have the document shape.
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The document is well-formed but violates a domain invariant.
    #[error("invalid document: {0}")]
    Invalid(#[from] DomainError),
}

pub(crate) fn ensure_id(id: Uuid, kind: EntityKind) -> DomainResult<Uuid> {
    if id.is_nil() {
        return Err(DomainError::NilId(kind));
    }
    Ok(id)
}
