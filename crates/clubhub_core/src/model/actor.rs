//! Member-scoped club operations.
//!
//! # Responsibility
//! - Run every operation a member performs against their own club.
//! - Gate club management behind the President role.
//!
//! # Invariants
//! - Each President operation re-checks, at call time, that the acting
//!   member still belongs to the club and is still President.
//! - Checks run before mutation; a failed call leaves club and users as
//!   they were.

use crate::model::club::{Club, ClubId};
use crate::model::error::{DomainError, DomainResult};
use crate::model::event::{Event, EventId};
use crate::model::member::{Member, MemberId};
use crate::model::role::ClubRole;
use crate::model::user::{User, UserId};

/// One member acting on the club that owns them.
///
/// Holds the club mutably, so the acting member's standing cannot change
/// underneath an operation.
#[derive(Debug)]
pub struct MemberActor<'c> {
    club: &'c mut Club,
    member_id: MemberId,
}

/// Outcome of disbanding a club.
///
/// The club object cannot delete itself; the caller removes the stored
/// aggregate and releases each listed user's membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disbandment {
    pub club_id: ClubId,
    pub member_users: Vec<UserId>,
}

impl Disbandment {
    /// Clears `user`'s membership for the disbanded club.
    pub fn release(&self, user: &mut User) -> DomainResult<()> {
        user.del_membership(self.club_id)?;
        Ok(())
    }
}

impl Club {
    /// Starts acting as `member_id`.
    pub fn act_as(&mut self, member_id: MemberId) -> DomainResult<MemberActor<'_>> {
        if !self.is_member(member_id) {
            return Err(DomainError::NotAMember);
        }
        Ok(MemberActor {
            club: self,
            member_id,
        })
    }

    /// Starts acting as the member `user` holds in this club.
    pub fn act_as_user(&mut self, user: &User) -> DomainResult<MemberActor<'_>> {
        let member_id = self.member_for_user(user)?.member_id();
        self.act_as(member_id)
    }
}

impl MemberActor<'_> {
    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn club(&self) -> &Club {
        self.club
    }

    /// Live view of the acting member.
    pub fn member(&self) -> Option<&Member> {
        self.club.member(self.member_id)
    }

    pub fn is_president(&self) -> bool {
        self.member().is_some_and(Member::is_president)
    }

    fn authorize(&self) -> DomainResult<()> {
        if !self.is_president() {
            return Err(DomainError::UnauthorizedAction);
        }
        Ok(())
    }

    /// Partially updates the acting member's review.
    pub fn update_review(&mut self, rating: Option<u8>, info: Option<String>) -> DomainResult<()> {
        self.club
            .member_mut(self.member_id)?
            .update_review(rating, info)
    }

    /// Ends the acting member's membership; `user` must be the member's user.
    pub fn leave_club(self, user: &mut User) -> DomainResult<()> {
        remove_member(self.club, self.member_id, user)
    }

    pub fn update_club_name(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_name(name)
    }

    /// Changes another member's (or the actor's own) position.
    pub fn update_member_position(
        &mut self,
        member_id: MemberId,
        position: ClubRole,
    ) -> DomainResult<()> {
        self.authorize()?;
        if position == ClubRole::President {
            return self.club.add_president(member_id);
        }

        let target = self.club.member(member_id).ok_or(DomainError::NotAMember)?;
        if target.is_president() {
            self.club.del_president(member_id)?;
        }
        Ok(())
    }

    /// Steps down from President to Member.
    pub fn retire(&mut self) -> DomainResult<()> {
        self.authorize()?;
        self.update_member_position(self.member_id, ClubRole::Member)
    }

    /// Removes `target`'s member from the club.
    pub fn kick_member(&mut self, target: &mut User) -> DomainResult<()> {
        self.authorize()?;
        let target_member = target
            .membership(self.club.id())
            .ok_or(DomainError::NotAMember)?;
        remove_member(self.club, target_member, target)
    }

    pub fn update_meeting_location(&mut self, location: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_location(location);
        Ok(())
    }

    pub fn update_meeting_time(&mut self, time: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_time(time);
        Ok(())
    }

    pub fn add_club_tag(&mut self, tag: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.add_tag(tag)
    }

    pub fn del_club_tag(&mut self, tag: &str) -> DomainResult<()> {
        self.authorize()?;
        self.club.del_tag(tag)
    }

    pub fn add_club_photo(&mut self, photo: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.add_photo(photo)
    }

    pub fn del_club_photo(&mut self, photo: &str) -> DomainResult<()> {
        self.authorize()?;
        self.club.del_photo(photo)
    }

    pub fn update_club_logo(&mut self, logo: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_logo(logo);
        Ok(())
    }

    pub fn update_club_contact(&mut self, contact: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_contact(contact);
        Ok(())
    }

    pub fn update_club_website(&mut self, website: impl Into<String>) -> DomainResult<()> {
        self.authorize()?;
        self.club.set_website(website);
        Ok(())
    }

    pub fn add_club_event(&mut self, event: Event) -> DomainResult<()> {
        self.authorize()?;
        self.club.add_event(event)
    }

    pub fn del_club_event(&mut self, event_id: EventId) -> DomainResult<Event> {
        self.authorize()?;
        self.club.del_event(event_id)
    }

    /// Admits the applicant and clears their application.
    pub fn accept_application(&mut self, applicant: &mut User) -> DomainResult<MemberId> {
        self.authorize()?;
        let member_id = self.club.add_member(applicant)?;
        self.club.del_application(applicant)?;
        Ok(member_id)
    }

    pub fn decline_application(&mut self, applicant: &User) -> DomainResult<()> {
        self.authorize()?;
        self.club.del_application(applicant)
    }

    /// Authorizes disbanding and lists the memberships the caller must clear.
    pub fn disband_club(self) -> DomainResult<Disbandment> {
        self.authorize()?;
        Ok(Disbandment {
            club_id: self.club.id(),
            member_users: self.club.members().iter().map(Member::user_id).collect(),
        })
    }
}

/// Demotes if needed, then removes the member owned by `user`.
fn remove_member(club: &mut Club, member_id: MemberId, user: &mut User) -> DomainResult<()> {
    if user.membership(club.id()) != Some(member_id) {
        return Err(DomainError::NotAMember);
    }
    let member = club.member(member_id).ok_or(DomainError::NotAMember)?;
    if member.is_president() {
        club.del_president(member_id)?;
    }
    club.del_member(user)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::club::{Club, NewClub};
    use crate::model::error::DomainError;
    use crate::model::role::ClubRole;
    use crate::model::user::{NewUser, User};

    fn user(name: &str) -> User {
        User::new(NewUser {
            email: format!("{name}@school.edu"),
            name: name.to_string(),
            ..NewUser::default()
        })
        .expect("valid user")
    }

    #[test]
    fn act_as_rejects_foreign_member() {
        let mut founder = user("pat");
        let mut club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");
        let err = club
            .act_as(uuid::Uuid::new_v4())
            .expect_err("unknown member");
        assert_eq!(err, DomainError::NotAMember);
    }

    #[test]
    fn act_as_user_rejects_membership_naming_another_member() {
        let mut founder = user("pat");
        let mut forger = user("eve");
        let mut club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");
        let president_member = club
            .member_for_user(&founder)
            .expect("founder is a member")
            .member_id();
        forger
            .add_membership(club.id(), president_member)
            .expect("fresh entry");

        assert_eq!(
            club.member_for_user(&forger).expect_err("foreign member"),
            DomainError::NotAMember
        );
        let err = club.act_as_user(&forger).expect_err("foreign member");
        assert_eq!(err, DomainError::NotAMember);
        assert_eq!(club.presidents().len(), 1);
    }

    #[test]
    fn sole_president_cannot_retire() {
        let mut founder = user("pat");
        let mut club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");

        let mut actor = club.act_as_user(&founder).expect("founder acts");
        assert_eq!(actor.retire().expect_err("last president"), DomainError::LastPresident);
        assert!(actor.is_president());
    }

    #[test]
    fn member_role_is_refused_management() {
        let mut founder = user("pat");
        let mut joiner = user("sam");
        let mut club = Club::new(NewClub::named("Chess"), &mut founder).expect("valid club");
        joiner.apply_to_club(&mut club).expect("apply");
        club.act_as_user(&founder)
            .expect("founder acts")
            .accept_application(&mut joiner)
            .expect("accept");

        let mut actor = club.act_as_user(&joiner).expect("joiner acts");
        assert_eq!(
            actor.add_club_tag("games").expect_err("members cannot tag"),
            DomainError::UnauthorizedAction
        );
        assert_eq!(
            actor
                .update_member_position(actor.member_id(), ClubRole::President)
                .expect_err("members cannot promote"),
            DomainError::UnauthorizedAction
        );
        assert!(club.tags().is_empty());
    }
}
