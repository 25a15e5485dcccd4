//! User account model.
//!
//! # Responsibility
//! - Own profile attributes and the club-membership index.
//! - Keep the feedback ledger that pairs every vote with its counter effect.
//!
//! # Invariants
//! - `email` and `name` are never empty.
//! - At most one membership per club.
//! - At most one active vote per review; review votes are `1` or `-1`,
//!   event votes are always `1`.

use crate::model::club::{Club, ClubId};
use crate::model::error::{ensure_id, DocumentError, DomainError, DomainResult, EntityKind};
use crate::model::event::{Event, EventId};
use crate::model::member::MemberId;
use crate::model::review::{Review, ReviewId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable user identifier.
pub type UserId = Uuid;

/// Vote value for a like.
pub const LIKE: i8 = 1;
/// Vote value for a dislike.
pub const DISLIKE: i8 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UserDocument", into = "UserDocument")]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    year: String,
    major: String,
    memberships: BTreeMap<ClubId, MemberId>,
    feedback: FeedbackLedger,
}

/// Votes a user has cast, keyed by the target's id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLedger {
    #[serde(default)]
    pub reviews: BTreeMap<ReviewId, i8>,
    #[serde(default)]
    pub events: BTreeMap<EventId, i8>,
}

impl FeedbackLedger {
    fn validate(&self) -> DomainResult<()> {
        if let Some(score) = self
            .reviews
            .values()
            .find(|score| **score != LIKE && **score != DISLIKE)
        {
            return Err(DomainError::InvalidFeedback(*score));
        }
        if let Some(score) = self.events.values().find(|score| **score != LIKE) {
            return Err(DomainError::InvalidEventFeedback(*score));
        }
        Ok(())
    }
}

/// Parameters for a first sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub year: String,
    pub major: String,
}

/// Stored shape of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub memberships: BTreeMap<ClubId, MemberId>,
    #[serde(default)]
    pub feedback: FeedbackLedger,
}

fn validate_email(email: String) -> DomainResult<String> {
    if email.trim().is_empty() {
        return Err(DomainError::InvalidEmail);
    }
    Ok(email)
}

fn validate_name(name: String) -> DomainResult<String> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidName(EntityKind::User));
    }
    Ok(name)
}

impl User {
    /// Creates a user with a generated id, no memberships and no votes.
    pub fn new(params: NewUser) -> DomainResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: validate_name(params.name)?,
            email: validate_email(params.email)?,
            year: params.year,
            major: params.major,
            memberships: BTreeMap::new(),
            feedback: FeedbackLedger::default(),
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn set_year(&mut self, year: impl Into<String>) {
        self.year = year.into();
    }

    pub fn major(&self) -> &str {
        &self.major
    }

    pub fn set_major(&mut self, major: impl Into<String>) {
        self.major = major.into();
    }

    /// Club id to member id, one entry per joined club.
    pub fn memberships(&self) -> &BTreeMap<ClubId, MemberId> {
        &self.memberships
    }

    pub fn membership(&self, club_id: ClubId) -> Option<MemberId> {
        self.memberships.get(&club_id).copied()
    }

    pub fn add_membership(&mut self, club_id: ClubId, member_id: MemberId) -> DomainResult<()> {
        if self.memberships.contains_key(&club_id) {
            return Err(DomainError::DuplicateMembership(club_id));
        }
        self.memberships.insert(club_id, member_id);
        Ok(())
    }

    /// Removes the membership entry, returning the member id it pointed to.
    pub fn del_membership(&mut self, club_id: ClubId) -> DomainResult<MemberId> {
        self.memberships
            .remove(&club_id)
            .ok_or(DomainError::NoMembership(club_id))
    }

    /// Files a join request with `club`.
    pub fn apply_to_club(&self, club: &mut Club) -> DomainResult<()> {
        club.add_application(self)
    }

    /// Submits (or replaces) this user's review of `club`.
    pub fn add_review(&self, club: &mut Club, review: Review) -> DomainResult<()> {
        club.add_review(self, review)
    }

    pub fn del_review(&self, club: &mut Club) -> DomainResult<Review> {
        club.del_review(self)
    }

    pub fn feedback(&self) -> &FeedbackLedger {
        &self.feedback
    }

    pub fn review_feedback(&self, review_id: ReviewId) -> Option<i8> {
        self.feedback.reviews.get(&review_id).copied()
    }

    /// Votes on a review.
    ///
    /// Repeating the current vote fails; voting the other way switches the
    /// vote and moves both counters accordingly.
    pub fn add_review_feedback(&mut self, review: &mut Review, score: i8) -> DomainResult<()> {
        if score != LIKE && score != DISLIKE {
            return Err(DomainError::InvalidFeedback(score));
        }

        match self.review_feedback(review.id()) {
            Some(previous) if previous == score => {
                return Err(DomainError::DuplicateFeedback(review.id()));
            }
            Some(previous) => revert_review_vote(review, previous),
            None => {}
        }

        self.feedback.reviews.insert(review.id(), score);
        if score == LIKE {
            review.like();
        } else {
            review.dislike();
        }
        Ok(())
    }

    /// Withdraws a previous vote on a review.
    pub fn del_review_feedback(&mut self, review: &mut Review) -> DomainResult<()> {
        let previous = self
            .feedback
            .reviews
            .remove(&review.id())
            .ok_or(DomainError::NoFeedback(review.id()))?;
        revert_review_vote(review, previous);
        Ok(())
    }

    pub fn likes_event(&self, event_id: EventId) -> bool {
        self.feedback.events.contains_key(&event_id)
    }

    pub fn add_event_feedback(&mut self, event: &mut Event) -> DomainResult<()> {
        if self.likes_event(event.id()) {
            return Err(DomainError::DuplicateFeedback(event.id()));
        }
        self.feedback.events.insert(event.id(), LIKE);
        event.like();
        Ok(())
    }

    pub fn del_event_feedback(&mut self, event: &mut Event) -> DomainResult<()> {
        if self.feedback.events.remove(&event.id()).is_none() {
            return Err(DomainError::NoFeedback(event.id()));
        }
        event.unlike();
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let document: UserDocument = serde_json::from_value(value)?;
        Ok(Self::try_from(document)?)
    }
}

fn revert_review_vote(review: &mut Review, score: i8) {
    if score == LIKE {
        review.unlike();
    } else {
        review.undislike();
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl TryFrom<UserDocument> for User {
    type Error = DomainError;

    fn try_from(value: UserDocument) -> Result<Self, Self::Error> {
        value.feedback.validate()?;
        Ok(Self {
            id: ensure_id(value.id, EntityKind::User)?,
            name: validate_name(value.name)?,
            email: validate_email(value.email)?,
            year: value.year,
            major: value.major,
            memberships: value.memberships,
            feedback: value.feedback,
        })
    }
}

impl From<User> for UserDocument {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            year: value.year,
            major: value.major,
            memberships: value.memberships,
            feedback: value.feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, User};
    use crate::model::error::{DomainError, EntityKind};
    use uuid::Uuid;

    fn user() -> User {
        User::new(NewUser {
            email: "sam@school.edu".to_string(),
            name: "Sam".to_string(),
            year: "3".to_string(),
            major: "Computer Science".to_string(),
        })
        .expect("valid user")
    }

    #[test]
    fn new_requires_name_and_email() {
        let missing_name = User::new(NewUser {
            email: "a@b.c".to_string(),
            ..NewUser::default()
        })
        .expect_err("missing name");
        assert_eq!(missing_name, DomainError::InvalidName(EntityKind::User));

        let missing_email = User::new(NewUser {
            name: "Sam".to_string(),
            ..NewUser::default()
        })
        .expect_err("missing email");
        assert_eq!(missing_email, DomainError::InvalidEmail);
    }

    #[test]
    fn getters_expose_profile() {
        let user = user();
        assert_eq!(user.name(), "Sam");
        assert_eq!(user.year(), "3");
        assert_eq!(user.major(), "Computer Science");
        assert!(user.memberships().is_empty());
        assert!(user.feedback().reviews.is_empty());
    }

    #[test]
    fn memberships_are_one_per_club() {
        let mut user = user();
        let club_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();

        user.add_membership(club_id, member_id).expect("first membership");
        let err = user
            .add_membership(club_id, Uuid::new_v4())
            .expect_err("second membership for same club");
        assert_eq!(err, DomainError::DuplicateMembership(club_id));
        assert_eq!(user.membership(club_id), Some(member_id));

        assert_eq!(user.del_membership(club_id).expect("delete"), member_id);
        assert_eq!(
            user.del_membership(club_id).expect_err("already gone"),
            DomainError::NoMembership(club_id)
        );
    }

    #[test]
    fn settings_reject_blank_name() {
        let mut user = user();
        user.set_name(" ").expect_err("blank name");
        user.set_major("Math");
        user.set_year("4");
        assert_eq!(user.name(), "Sam");
        assert_eq!(user.major(), "Math");
        assert_eq!(user.year(), "4");
    }
}
