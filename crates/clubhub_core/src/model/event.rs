//! Club news post model.
//!
//! # Invariants
//! - `title` is never empty.
//! - `views` and `likes` never go below zero.

use crate::model::error::{ensure_id, DocumentError, DomainError, DomainResult, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable event identifier.
pub type EventId = Uuid;

/// A news post published in a club's feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EventDocument", into = "EventDocument")]
pub struct Event {
    id: EventId,
    title: String,
    info: String,
    photo: String,
    caption: String,
    views: u32,
    likes: u32,
}

/// Parameters for publishing a new event.
///
/// Every field except `title` defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub info: String,
    pub photo: String,
    pub caption: String,
}

impl NewEvent {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Stored shape of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDocument {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: EventId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub views: u32,
    #[serde(default)]
    pub likes: u32,
}

fn validate_title(title: String) -> DomainResult<String> {
    if title.trim().is_empty() {
        return Err(DomainError::InvalidTitle);
    }
    Ok(title)
}

impl Event {
    /// Creates an event with a generated id and zeroed counters.
    pub fn new(params: NewEvent) -> DomainResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: validate_title(params.title)?,
            info: params.info,
            photo: params.photo,
            caption: params.caption,
            views: 0,
            likes: 0,
        })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> DomainResult<()> {
        self.title = validate_title(title.into())?;
        Ok(())
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn photo(&self) -> &str {
        &self.photo
    }

    pub fn set_photo(&mut self, photo: impl Into<String>) {
        self.photo = photo.into();
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
    }

    pub fn views(&self) -> u32 {
        self.views
    }

    /// Records one more view.
    pub fn view(&mut self) {
        self.views = self.views.saturating_add(1);
    }

    pub fn likes(&self) -> u32 {
        self.likes
    }

    pub fn like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }

    pub fn unlike(&mut self) {
        self.likes = self.likes.saturating_sub(1);
    }

    pub fn to_json(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let document: EventDocument = serde_json::from_value(value)?;
        Ok(Self::try_from(document)?)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl TryFrom<EventDocument> for Event {
    type Error = DomainError;

    fn try_from(value: EventDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ensure_id(value.id, EntityKind::Event)?,
            title: validate_title(value.title)?,
            info: value.info,
            photo: value.photo,
            caption: value.caption,
            views: value.views,
            likes: value.likes,
        })
    }
}

impl From<Event> for EventDocument {
    fn from(value: Event) -> Self {
        Self {
            id: value.id,
            title: value.title,
            info: value.info,
            photo: value.photo,
            caption: value.caption,
            views: value.views,
            likes: value.likes,
        }
    }
}
