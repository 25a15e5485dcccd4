//! Club review model.
//!
//! # Responsibility
//! - Hold one member's rating and comment for a club.
//! - Track like/dislike counters driven by user feedback.
//!
//! # Invariants
//! - `rating` is always within `1..=5`.
//! - Counters never go below zero; decrements saturate.

use crate::model::error::{ensure_id, DocumentError, DomainError, DomainResult, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable review identifier.
pub type ReviewId = Uuid;

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// A member's review of their club.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ReviewDocument", into = "ReviewDocument")]
pub struct Review {
    id: ReviewId,
    rating: u8,
    info: String,
    likes: u32,
    dislikes: u32,
}

/// Stored shape of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDocument {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: ReviewId,
    #[serde(default = "default_rating")]
    pub rating: u8,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
}

fn default_rating() -> u8 {
    MAX_RATING
}

fn validate_rating(rating: u8) -> DomainResult<u8> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(DomainError::InvalidRating(rating));
    }
    Ok(rating)
}

impl Review {
    /// Creates a review with a generated id and zeroed counters.
    pub fn new(rating: u8, info: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            rating: validate_rating(rating)?,
            info: info.into(),
            likes: 0,
            dislikes: 0,
        })
    }

    pub fn id(&self) -> ReviewId {
        self.id
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Replaces the rating after re-validating the range.
    pub fn set_rating(&mut self, rating: u8) -> DomainResult<()> {
        self.rating = validate_rating(rating)?;
        Ok(())
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn likes(&self) -> u32 {
        self.likes
    }

    pub fn dislikes(&self) -> u32 {
        self.dislikes
    }

    pub fn like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }

    pub fn unlike(&mut self) {
        self.likes = self.likes.saturating_sub(1);
    }

    pub fn dislike(&mut self) {
        self.dislikes = self.dislikes.saturating_add(1);
    }

    pub fn undislike(&mut self) {
        self.dislikes = self.dislikes.saturating_sub(1);
    }

    /// Net community feedback: `likes - dislikes`.
    pub fn feedback_score(&self) -> i64 {
        i64::from(self.likes) - i64::from(self.dislikes)
    }

    /// Serializes this review to its document mapping.
    pub fn to_json(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a review from its document mapping, re-running validation.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let document: ReviewDocument = serde_json::from_value(value)?;
        Ok(Self::try_from(document)?)
    }
}

impl PartialEq for Review {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Review {}

impl TryFrom<ReviewDocument> for Review {
    type Error = DomainError;

    fn try_from(value: ReviewDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ensure_id(value.id, EntityKind::Review)?,
            rating: validate_rating(value.rating)?,
            info: value.info,
            likes: value.likes,
            dislikes: value.dislikes,
        })
    }
}

impl From<Review> for ReviewDocument {
    fn from(value: Review) -> Self {
        Self {
            id: value.id,
            rating: value.rating,
            info: value.info,
            likes: value.likes,
            dislikes: value.dislikes,
        }
    }
}
