//! Club member model.
//!
//! A member binds one user (by id) to one club with a position and at most
//! one review. The owning club is the only place positions change; see
//! [`crate::model::actor::MemberActor`] for operations that need the club.

use crate::model::error::{ensure_id, DocumentError, DomainError, DomainResult, EntityKind};
use crate::model::review::{Review, ReviewDocument};
use crate::model::role::ClubRole;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member identifier, unique within its club.
pub type MemberId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MemberDocument", into = "MemberDocument")]
pub struct Member {
    member_id: MemberId,
    user_id: UserId,
    club_position: ClubRole,
    review: Option<Review>,
}

/// Stored shape of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDocument {
    #[serde(default = "Uuid::new_v4")]
    pub member_id: MemberId,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub club_position: ClubRole,
    #[serde(default)]
    pub review: Option<ReviewDocument>,
}

impl Member {
    /// Creates a member for `user_id` with a generated member id.
    pub fn new(user_id: UserId, club_position: ClubRole) -> DomainResult<Self> {
        if user_id.is_nil() {
            return Err(DomainError::MissingUserId);
        }
        Ok(Self {
            member_id: Uuid::new_v4(),
            user_id,
            club_position,
            review: None,
        })
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn club_position(&self) -> ClubRole {
        self.club_position
    }

    pub fn is_president(&self) -> bool {
        self.club_position == ClubRole::President
    }

    /// Position changes go through the club so the president guard holds.
    pub(crate) fn set_club_position(&mut self, position: ClubRole) {
        self.club_position = position;
    }

    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    pub(crate) fn review_mut(&mut self) -> Option<&mut Review> {
        self.review.as_mut()
    }

    /// Attaches a review, replacing any previous one.
    pub fn add_review(&mut self, review: Review) {
        self.review = Some(review);
    }

    /// Partially updates the existing review.
    ///
    /// Supplied fields overwrite; the rating is validated before anything
    /// is written.
    pub fn update_review(&mut self, rating: Option<u8>, info: Option<String>) -> DomainResult<()> {
        let review = self.review.as_mut().ok_or(DomainError::NoReview)?;
        if let Some(rating) = rating {
            review.set_rating(rating)?;
        }
        if let Some(info) = info {
            review.set_info(info);
        }
        Ok(())
    }

    /// Detaches the review.
    pub fn del_review(&mut self) -> DomainResult<Review> {
        self.review.take().ok_or(DomainError::NoReview)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let document: MemberDocument = serde_json::from_value(value)?;
        Ok(Self::try_from(document)?)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.member_id == other.member_id
    }
}

impl Eq for Member {}

impl TryFrom<MemberDocument> for Member {
    type Error = DomainError;

    fn try_from(value: MemberDocument) -> Result<Self, Self::Error> {
        if value.user_id.is_nil() {
            return Err(DomainError::MissingUserId);
        }
        Ok(Self {
            member_id: ensure_id(value.member_id, EntityKind::Member)?,
            user_id: value.user_id,
            club_position: value.club_position,
            review: value.review.map(Review::try_from).transpose()?,
        })
    }
}

impl From<Member> for MemberDocument {
    fn from(value: Member) -> Self {
        Self {
            member_id: value.member_id,
            user_id: value.user_id,
            club_position: value.club_position,
            review: value.review.map(ReviewDocument::from),
        }
    }
}
