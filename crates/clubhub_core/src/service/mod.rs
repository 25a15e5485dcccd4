//! Use-case services.
//!
//! # Responsibility
//! - Load aggregates through repository contracts, mutate them through the
//!   entity layer, and persist the results.
//! - Keep callers (HTTP handlers, jobs) free of storage details.
//!
//! # Invariants
//! - Services never write a field the entity layer has not validated.
//! - Every aggregate touched by an operation is saved with the version it
//!   was loaded at.

use crate::model::club::ClubId;
use crate::model::error::DomainError;
use crate::model::event::EventId;
use crate::model::review::ReviewId;
use crate::model::user::UserId;
use crate::repo::RepoError;
use thiserror::Error;

pub mod club_service;
pub mod user_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("club not found: {0}")]
    ClubNotFound(ClubId),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("review not found: {0}")]
    ReviewNotFound(ReviewId),
    #[error("event not found: {0}")]
    EventNotFound(EventId),
}
