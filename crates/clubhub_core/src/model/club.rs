//! Club aggregate root.
//!
//! # Responsibility
//! - Own members, tags, photos, news and pending applications.
//! - Enforce every club-level invariant and mediate nested mutation.
//!
//! # Invariants
//! - At least one member, and at least one of them is President.
//! - Member ids are unique and no user holds two members in one club.
//! - Tags, photos, event ids and applications contain no duplicates.
//! - A failed operation leaves the club untouched.

use crate::model::error::{
    ensure_id, Collection, DocumentError, DomainError, DomainResult, EntityKind,
};
use crate::model::event::{Event, EventDocument, EventId};
use crate::model::member::{Member, MemberDocument, MemberId};
use crate::model::review::{Review, ReviewId};
use crate::model::role::ClubRole;
use crate::model::user::{User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use uuid::Uuid;

/// Stable club identifier.
pub type ClubId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ClubDocument", into = "ClubDocument")]
pub struct Club {
    id: ClubId,
    name: String,
    members: Vec<Member>,
    location: String,
    time: String,
    tags: Vec<String>,
    logo: String,
    photos: Vec<String>,
    contact: String,
    website: String,
    news: Vec<Event>,
    applications: Vec<UserId>,
}

/// Parameters for founding a club.
///
/// Only `name` is required; everything else starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClub {
    pub name: String,
    pub location: String,
    pub time: String,
    pub tags: Vec<String>,
    pub logo: String,
    pub photos: Vec<String>,
    pub contact: String,
    pub website: String,
}

impl NewClub {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Stored shape of a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubDocument {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: ClubId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberDocument>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub news: Vec<EventDocument>,
    #[serde(default)]
    pub applications: Vec<UserId>,
}

fn validate_name(name: String) -> DomainResult<String> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidName(EntityKind::Club));
    }
    Ok(name)
}

fn first_duplicate<T, I>(items: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items.into_iter().find(|item| !seen.insert(item.clone()))
}

fn ensure_unique(values: &[String], kind: Collection) -> DomainResult<()> {
    match first_duplicate(values.iter()) {
        Some(value) => Err(DomainError::duplicate(kind, value)),
        None => Ok(()),
    }
}

impl Club {
    /// Founds a club with `founder` as its sole member and President.
    ///
    /// Records the new membership on `founder`.
    pub fn new(params: NewClub, founder: &mut User) -> DomainResult<Self> {
        let name = validate_name(params.name)?;
        ensure_unique(&params.tags, Collection::Tag)?;
        ensure_unique(&params.photos, Collection::Photo)?;
        let president = Member::new(founder.id(), ClubRole::President)?;
        let president_id = president.member_id();

        let club = Self {
            id: Uuid::new_v4(),
            name,
            members: vec![president],
            location: params.location,
            time: params.time,
            tags: params.tags,
            logo: params.logo,
            photos: params.photos,
            contact: params.contact,
            website: params.website,
            news: Vec::new(),
            applications: Vec::new(),
        };

        founder.add_membership(club.id, president_id)?;
        Ok(club)
    }

    pub fn id(&self) -> ClubId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, member_id: MemberId) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.member_id() == member_id)
    }

    fn member_index(&self, member_id: MemberId) -> DomainResult<usize> {
        self.members
            .iter()
            .position(|member| member.member_id() == member_id)
            .ok_or(DomainError::NotAMember)
    }

    pub(crate) fn member_mut(&mut self, member_id: MemberId) -> DomainResult<&mut Member> {
        self.members
            .iter_mut()
            .find(|member| member.member_id() == member_id)
            .ok_or(DomainError::NotAMember)
    }

    /// Resolves `user`'s membership entry to the member it names.
    ///
    /// The member must point back at `user`; an entry naming someone else's
    /// member is treated as no membership.
    pub fn member_for_user(&self, user: &User) -> DomainResult<&Member> {
        let member_id = user.membership(self.id).ok_or(DomainError::NotAMember)?;
        self.member(member_id)
            .filter(|member| member.user_id() == user.id())
            .ok_or(DomainError::NotAMember)
    }

    pub fn is_member(&self, member_id: MemberId) -> bool {
        self.member(member_id).is_some()
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.members.iter().any(|member| member.user_id() == user_id)
    }

    pub fn presidents(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|member| member.is_president())
            .collect()
    }

    fn president_count(&self) -> usize {
        self.members
            .iter()
            .filter(|member| member.is_president())
            .count()
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn add_president(&mut self, member_id: MemberId) -> DomainResult<()> {
        let member = self.member_mut(member_id)?;
        if member.is_president() {
            return Err(DomainError::AlreadyPresident(member_id));
        }
        member.set_club_position(ClubRole::President);
        Ok(())
    }

    /// Demotes a President to Member, keeping at least one President.
    pub fn del_president(&mut self, member_id: MemberId) -> DomainResult<()> {
        let index = self.member_index(member_id)?;
        if !self.members[index].is_president() {
            return Err(DomainError::NotAPresident(member_id));
        }
        if self.president_count() == 1 {
            return Err(DomainError::LastPresident);
        }
        self.members[index].set_club_position(ClubRole::Member);
        Ok(())
    }

    /// Turns a pending application into a membership.
    ///
    /// The application itself stays until `del_application` removes it.
    pub fn add_member(&mut self, applicant: &mut User) -> DomainResult<MemberId> {
        let applicant_id = applicant.id();
        if !self.applications.contains(&applicant_id) {
            return Err(DomainError::NoApplication(applicant_id));
        }
        if applicant.membership(self.id).is_some() || self.has_user(applicant_id) {
            return Err(DomainError::DuplicateMembership(self.id));
        }

        let member = Member::new(applicant_id, ClubRole::Member)?;
        let member_id = member.member_id();
        applicant.add_membership(self.id, member_id)?;
        self.members.push(member);
        Ok(member_id)
    }

    /// Removes `user`'s member and clears their membership entry.
    pub fn del_member(&mut self, user: &mut User) -> DomainResult<Member> {
        if self.members.len() == 1 {
            return Err(DomainError::MinimumMembers);
        }
        let member_id = user.membership(self.id).ok_or(DomainError::NotAMember)?;
        let index = self.member_index(member_id)?;
        if self.members[index].is_president() && self.president_count() == 1 {
            return Err(DomainError::LastPresident);
        }

        user.del_membership(self.id)?;
        Ok(self.members.remove(index))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.time = time.into();
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> DomainResult<()> {
        let tag = tag.into();
        if self.tags.contains(&tag) {
            return Err(DomainError::duplicate(Collection::Tag, tag));
        }
        self.tags.push(tag);
        Ok(())
    }

    pub fn del_tag(&mut self, tag: &str) -> DomainResult<()> {
        let index = self
            .tags
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| DomainError::not_found(Collection::Tag, tag))?;
        self.tags.remove(index);
        Ok(())
    }

    pub fn logo(&self) -> &str {
        &self.logo
    }

    pub fn set_logo(&mut self, logo: impl Into<String>) {
        self.logo = logo.into();
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn add_photo(&mut self, photo: impl Into<String>) -> DomainResult<()> {
        let photo = photo.into();
        if self.photos.contains(&photo) {
            return Err(DomainError::duplicate(Collection::Photo, photo));
        }
        self.photos.push(photo);
        Ok(())
    }

    pub fn del_photo(&mut self, photo: &str) -> DomainResult<()> {
        let index = self
            .photos
            .iter()
            .position(|p| p == photo)
            .ok_or_else(|| DomainError::not_found(Collection::Photo, photo))?;
        self.photos.remove(index);
        Ok(())
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn set_contact(&mut self, contact: impl Into<String>) {
        self.contact = contact.into();
    }

    pub fn website(&self) -> &str {
        &self.website
    }

    pub fn set_website(&mut self, website: impl Into<String>) {
        self.website = website.into();
    }

    /// Published events, oldest first.
    pub fn news(&self) -> &[Event] {
        &self.news
    }

    pub fn event(&self, event_id: EventId) -> Option<&Event> {
        self.news.iter().find(|event| event.id() == event_id)
    }

    /// Counter and text edits on one event; identity cannot change.
    pub fn event_mut(&mut self, event_id: EventId) -> Option<&mut Event> {
        self.news.iter_mut().find(|event| event.id() == event_id)
    }

    pub fn add_event(&mut self, event: Event) -> DomainResult<()> {
        if self.event(event.id()).is_some() {
            return Err(DomainError::duplicate(Collection::Event, event.id()));
        }
        self.news.push(event);
        Ok(())
    }

    pub fn del_event(&mut self, event_id: EventId) -> DomainResult<Event> {
        let index = self
            .news
            .iter()
            .position(|event| event.id() == event_id)
            .ok_or_else(|| DomainError::not_found(Collection::Event, event_id))?;
        Ok(self.news.remove(index))
    }

    pub fn reviews(&self) -> Vec<&Review> {
        self.members.iter().filter_map(Member::review).collect()
    }

    /// Counter edits on one member's review, for feedback votes.
    pub fn review_mut(&mut self, review_id: ReviewId) -> Option<&mut Review> {
        self.members
            .iter_mut()
            .filter_map(Member::review_mut)
            .find(|review| review.id() == review_id)
    }

    /// Attaches `review` to `user`'s member, replacing any earlier one.
    pub fn add_review(&mut self, user: &User, review: Review) -> DomainResult<()> {
        let member_id = self.member_for_user(user)?.member_id();
        self.member_mut(member_id)?.add_review(review);
        Ok(())
    }

    pub fn del_review(&mut self, user: &User) -> DomainResult<Review> {
        let member_id = self.member_for_user(user)?.member_id();
        self.member_mut(member_id)?.del_review()
    }

    /// Mean rating over all reviews, or `None` when nobody has reviewed.
    pub fn rating(&self) -> Option<f64> {
        let reviews = self.reviews();
        if reviews.is_empty() {
            return None;
        }
        let total: u32 = reviews.iter().map(|review| u32::from(review.rating())).sum();
        Some(f64::from(total) / reviews.len() as f64)
    }

    /// Pending applicant user ids, in arrival order.
    pub fn applications(&self) -> &[UserId] {
        &self.applications
    }

    pub fn add_application(&mut self, applicant: &User) -> DomainResult<()> {
        let applicant_id = applicant.id();
        if applicant.membership(self.id).is_some() || self.has_user(applicant_id) {
            return Err(DomainError::DuplicateMembership(self.id));
        }
        if self.applications.contains(&applicant_id) {
            return Err(DomainError::DuplicateApplication(applicant_id));
        }
        self.applications.push(applicant_id);
        Ok(())
    }

    pub fn del_application(&mut self, applicant: &User) -> DomainResult<()> {
        let applicant_id = applicant.id();
        let index = self
            .applications
            .iter()
            .position(|id| *id == applicant_id)
            .ok_or(DomainError::ApplicationNotFound(applicant_id))?;
        self.applications.remove(index);
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, DocumentError> {
        let document: ClubDocument = serde_json::from_value(value)?;
        Ok(Self::try_from(document)?)
    }
}

impl PartialEq for Club {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Club {}

impl TryFrom<ClubDocument> for Club {
    type Error = DomainError;

    fn try_from(value: ClubDocument) -> Result<Self, Self::Error> {
        let id = ensure_id(value.id, EntityKind::Club)?;
        let name = validate_name(value.name)?;
        if value.members.is_empty() {
            return Err(DomainError::MinimumMembers);
        }
        let members = value
            .members
            .into_iter()
            .map(Member::try_from)
            .collect::<DomainResult<Vec<_>>>()?;
        if !members.iter().any(Member::is_president) {
            return Err(DomainError::NoPresident);
        }
        if let Some(member_id) = first_duplicate(members.iter().map(Member::member_id)) {
            return Err(DomainError::duplicate(Collection::Member, member_id));
        }
        if first_duplicate(members.iter().map(Member::user_id)).is_some() {
            return Err(DomainError::DuplicateMembership(id));
        }
        ensure_unique(&value.tags, Collection::Tag)?;
        ensure_unique(&value.photos, Collection::Photo)?;
        let news = value
            .news
            .into_iter()
            .map(Event::try_from)
            .collect::<DomainResult<Vec<_>>>()?;
        if let Some(event_id) = first_duplicate(news.iter().map(Event::id)) {
            return Err(DomainError::duplicate(Collection::Event, event_id));
        }
        if let Some(user_id) = first_duplicate(value.applications.iter().copied()) {
            return Err(DomainError::DuplicateApplication(user_id));
        }

        Ok(Self {
            id,
            name,
            members,
            location: value.location,
            time: value.time,
            tags: value.tags,
            logo: value.logo,
            photos: value.photos,
            contact: value.contact,
            website: value.website,
            news,
            applications: value.applications,
        })
    }
}

impl From<Club> for ClubDocument {
    fn from(value: Club) -> Self {
        Self {
            id: value.id,
            name: value.name,
            members: value.members.into_iter().map(MemberDocument::from).collect(),
            location: value.location,
            time: value.time,
            tags: value.tags,
            logo: value.logo,
            photos: value.photos,
            contact: value.contact,
            website: value.website,
            news: value.news.into_iter().map(EventDocument::from).collect(),
            applications: value.applications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Club, NewClub};
    use crate::model::error::{Collection, DomainError};
    use crate::model::user::{NewUser, User};

    fn founder() -> User {
        User::new(NewUser {
            email: "pres@school.edu".to_string(),
            name: "Pat".to_string(),
            ..NewUser::default()
        })
        .expect("valid user")
    }

    #[test]
    fn new_makes_founder_sole_president() {
        let mut founder = founder();
        let club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");

        assert_eq!(club.size(), 1);
        let presidents = club.presidents();
        assert_eq!(presidents.len(), 1);
        assert_eq!(presidents[0].user_id(), founder.id());
        assert_eq!(
            founder.membership(club.id()),
            Some(presidents[0].member_id())
        );
    }

    #[test]
    fn new_rejects_blank_name_without_touching_founder() {
        let mut founder = founder();
        Club::new(NewClub::named(""), &mut founder).expect_err("blank name");
        assert!(founder.memberships().is_empty());
    }

    #[test]
    fn new_rejects_duplicate_tags() {
        let mut founder = founder();
        let params = NewClub {
            tags: vec!["games".to_string(), "games".to_string()],
            ..NewClub::named("Chess")
        };
        let err = Club::new(params, &mut founder).expect_err("duplicate tag");
        assert!(matches!(
            err,
            DomainError::Duplicate {
                kind: Collection::Tag,
                ..
            }
        ));
    }

    #[test]
    fn rating_is_none_without_reviews() {
        let mut founder = founder();
        let club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");
        assert_eq!(club.rating(), None);
        assert!(club.reviews().is_empty());
    }
}
