//! Club use-case service.
//!
//! # Responsibility
//! - Run the club flows: found, apply, accept/decline, leave, kick,
//!   disband, manage info/photos/tags/news, review and vote.
//! - Persist every aggregate an operation changes.
//!
//! # Invariants
//! - Management flows resolve the acting user's member and go through the
//!   President gate; the service never bypasses it.
//! - Every flow runs inside one unit of work: the club and user saves of
//!   an operation commit together or not at all.

use crate::model::actor::MemberActor;
use crate::model::club::{Club, ClubId, NewClub};
use crate::model::error::{DomainError, DomainResult};
use crate::model::event::{Event, EventId, NewEvent};
use crate::model::member::MemberId;
use crate::model::review::{Review, ReviewId};
use crate::model::role::ClubRole;
use crate::model::user::{User, UserId};
use crate::repo::club_repo::{ClubFilter, ClubInfoPatch, ClubRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, UnitOfWork, Versioned};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// Club flows over injected club and user repositories.
///
/// `clubs` also scopes transactions, so both repositories must write
/// through the same store.
pub struct ClubService<C: ClubRepository + UnitOfWork, U: UserRepository> {
    clubs: C,
    users: U,
}

impl<C: ClubRepository + UnitOfWork, U: UserRepository> ClubService<C, U> {
    pub fn new(clubs: C, users: U) -> Self {
        Self { clubs, users }
    }

    fn load_club(&self, id: ClubId) -> ServiceResult<Versioned<Club>> {
        self.clubs
            .get_club(id)?
            .ok_or(ServiceError::ClubNotFound(id))
    }

    fn load_user(&self, id: UserId) -> ServiceResult<Versioned<User>> {
        self.users
            .get_user(id)?
            .ok_or(ServiceError::UserNotFound(id))
    }

    fn save_club(&self, club: &Versioned<Club>) -> ServiceResult<u64> {
        Ok(self.clubs.save_club(&club.entity, club.version)?)
    }

    fn save_user(&self, user: &Versioned<User>) -> ServiceResult<u64> {
        Ok(self.users.save_user(&user.entity, user.version)?)
    }

    /// Runs one President operation as `president_id` and saves the club.
    fn as_president<T>(
        &self,
        event: &'static str,
        president_id: UserId,
        club_id: ClubId,
        op: impl FnOnce(&mut MemberActor<'_>) -> DomainResult<T>,
    ) -> ServiceResult<T> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let president = self.load_user(president_id)?;
            let mut club = self.load_club(club_id)?;
            let value = op(&mut club.entity.act_as_user(&president.entity)?)?;
            self.save_club(&club)?;
            Ok(value)
        });
        log_outcome(event, club_id, president_id, result)
    }

    pub fn get_club(&self, id: ClubId) -> ServiceResult<Club> {
        Ok(self.load_club(id)?.into_inner())
    }

    pub fn list_clubs(&self, filter: &ClubFilter) -> ServiceResult<Vec<Club>> {
        Ok(self
            .clubs
            .find_clubs(filter)?
            .into_iter()
            .map(Versioned::into_inner)
            .collect())
    }

    /// Founds a club with `founder_id` as President.
    pub fn create_club(&self, founder_id: UserId, params: NewClub) -> ServiceResult<Club> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let mut founder = self.load_user(founder_id)?;
            let club = Club::new(params, &mut founder.entity)?;
            self.clubs.insert_club(&club)?;
            self.save_user(&founder)?;
            Ok(club)
        });
        match &result {
            Ok(club) => info!(
                "event=club_create module=service status=ok club_id={} user_id={}",
                club.id(),
                founder_id
            ),
            Err(err) => warn!(
                "event=club_create module=service status=error user_id={} error={}",
                founder_id, err
            ),
        }
        result
    }

    pub fn apply_to_club(&self, user_id: UserId, club_id: ClubId) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            user.entity.apply_to_club(&mut club.entity)?;
            self.save_club(&club)?;
            Ok(())
        });
        log_outcome("club_apply", club_id, user_id, result)
    }

    pub fn accept_application(
        &self,
        president_id: UserId,
        club_id: ClubId,
        applicant_id: UserId,
    ) -> ServiceResult<MemberId> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let president = self.load_user(president_id)?;
            let mut applicant = self.load_user(applicant_id)?;
            let mut club = self.load_club(club_id)?;
            let member_id = club
                .entity
                .act_as_user(&president.entity)?
                .accept_application(&mut applicant.entity)?;
            self.save_club(&club)?;
            self.save_user(&applicant)?;
            Ok(member_id)
        });
        log_outcome("club_accept_application", club_id, president_id, result)
    }

    pub fn decline_application(
        &self,
        president_id: UserId,
        club_id: ClubId,
        applicant_id: UserId,
    ) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let president = self.load_user(president_id)?;
            let applicant = self.load_user(applicant_id)?;
            let mut club = self.load_club(club_id)?;
            club.entity
                .act_as_user(&president.entity)?
                .decline_application(&applicant.entity)?;
            self.save_club(&club)?;
            Ok(())
        });
        log_outcome("club_decline_application", club_id, president_id, result)
    }

    pub fn leave_club(&self, user_id: UserId, club_id: ClubId) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let mut user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            let actor = club.entity.act_as_user(&user.entity)?;
            actor.leave_club(&mut user.entity)?;
            self.save_club(&club)?;
            self.save_user(&user)?;
            Ok(())
        });
        log_outcome("club_leave", club_id, user_id, result)
    }

    pub fn kick_member(
        &self,
        president_id: UserId,
        club_id: ClubId,
        target_id: UserId,
    ) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let president = self.load_user(president_id)?;
            let mut target = if target_id == president_id {
                president.clone()
            } else {
                self.load_user(target_id)?
            };
            let mut club = self.load_club(club_id)?;
            club.entity
                .act_as_user(&president.entity)?
                .kick_member(&mut target.entity)?;
            self.save_club(&club)?;
            self.save_user(&target)?;
            Ok(())
        });
        log_outcome("club_kick_member", club_id, president_id, result)
    }

    pub fn update_member_position(
        &self,
        president_id: UserId,
        club_id: ClubId,
        member_id: MemberId,
        position: ClubRole,
    ) -> ServiceResult<()> {
        self.as_president(
            "club_update_member_position",
            president_id,
            club_id,
            |actor| actor.update_member_position(member_id, position),
        )
    }

    pub fn retire(&self, president_id: UserId, club_id: ClubId) -> ServiceResult<()> {
        self.as_president("club_retire", president_id, club_id, |actor| {
            actor.retire()
        })
    }

    /// Overwrites the supplied scalar fields of the club.
    pub fn update_club_info(
        &self,
        president_id: UserId,
        club_id: ClubId,
        patch: ClubInfoPatch,
    ) -> ServiceResult<()> {
        self.as_president("club_update_info", president_id, club_id, |actor| {
            if let Some(name) = patch.name {
                actor.update_club_name(name)?;
            }
            if let Some(location) = patch.location {
                actor.update_meeting_location(location)?;
            }
            if let Some(time) = patch.time {
                actor.update_meeting_time(time)?;
            }
            if let Some(logo) = patch.logo {
                actor.update_club_logo(logo)?;
            }
            if let Some(contact) = patch.contact {
                actor.update_club_contact(contact)?;
            }
            if let Some(website) = patch.website {
                actor.update_club_website(website)?;
            }
            Ok(())
        })
    }

    pub fn add_club_tag(&self, president_id: UserId, club_id: ClubId, tag: &str) -> ServiceResult<()> {
        self.as_president("club_add_tag", president_id, club_id, |actor| {
            actor.add_club_tag(tag)
        })
    }

    pub fn del_club_tag(&self, president_id: UserId, club_id: ClubId, tag: &str) -> ServiceResult<()> {
        self.as_president("club_del_tag", president_id, club_id, |actor| {
            actor.del_club_tag(tag)
        })
    }

    pub fn add_club_photo(
        &self,
        president_id: UserId,
        club_id: ClubId,
        photo: &str,
    ) -> ServiceResult<()> {
        self.as_president("club_add_photo", president_id, club_id, |actor| {
            actor.add_club_photo(photo)
        })
    }

    pub fn del_club_photo(
        &self,
        president_id: UserId,
        club_id: ClubId,
        photo: &str,
    ) -> ServiceResult<()> {
        self.as_president("club_del_photo", president_id, club_id, |actor| {
            actor.del_club_photo(photo)
        })
    }

    /// Publishes a news post and returns its id.
    pub fn post_event(
        &self,
        president_id: UserId,
        club_id: ClubId,
        params: NewEvent,
    ) -> ServiceResult<EventId> {
        let event = Event::new(params)?;
        let event_id = event.id();
        self.as_president("club_post_event", president_id, club_id, |actor| {
            actor.add_club_event(event)
        })?;
        Ok(event_id)
    }

    pub fn remove_event(
        &self,
        president_id: UserId,
        club_id: ClubId,
        event_id: EventId,
    ) -> ServiceResult<()> {
        self.as_president("club_remove_event", president_id, club_id, |actor| {
            actor.del_club_event(event_id).map(|_| ())
        })
    }

    /// Records one view of a news post. Needs no membership.
    pub fn view_event(&self, club_id: ClubId, event_id: EventId) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let mut club = self.load_club(club_id)?;
            club.entity
                .event_mut(event_id)
                .ok_or(ServiceError::EventNotFound(event_id))?
                .view();
            self.save_club(&club)?;
            Ok(())
        });
        match &result {
            Ok(()) => info!(
                "event=event_view module=service status=ok club_id={} event_id={}",
                club_id, event_id
            ),
            Err(err) => warn!(
                "event=event_view module=service status=error club_id={} event_id={} error_code={} error={}",
                club_id,
                event_id,
                error_code(err),
                err
            ),
        }
        result
    }

    /// Dissolves the club and releases every member's membership.
    ///
    /// The club delete and all releases commit together. A member whose
    /// user record is gone, or who no longer holds the membership, is logged
    /// and skipped; any other failure rolls the whole disband back.
    pub fn disband_club(&self, president_id: UserId, club_id: ClubId) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let president = self.load_user(president_id)?;
            let mut club = self.load_club(club_id)?;
            let disbandment = club
                .entity
                .act_as_user(&president.entity)?
                .disband_club()?;
            self.clubs.delete_club(club_id)?;

            let mut released = 0usize;
            for user_id in &disbandment.member_users {
                let Some(mut user) = self.users.get_user(*user_id)? else {
                    warn!(
                        "event=club_disband_release module=service status=skipped club_id={} user_id={} reason=user_missing",
                        club_id, user_id
                    );
                    continue;
                };
                if let Err(err) = disbandment.release(&mut user.entity) {
                    warn!(
                        "event=club_disband_release module=service status=skipped club_id={} user_id={} error={}",
                        club_id, user_id, err
                    );
                    continue;
                }
                self.save_user(&user)?;
                released += 1;
            }
            Ok(released)
        });
        match &result {
            Ok(released) => info!(
                "event=club_disband module=service status=ok club_id={} user_id={} released={}",
                club_id, president_id, released
            ),
            Err(err) => warn!(
                "event=club_disband module=service status=error club_id={} user_id={} error_code={} error={}",
                club_id,
                president_id,
                error_code(err),
                err
            ),
        }
        result.map(|_| ())
    }

    /// Submits or replaces the user's review and returns its id.
    pub fn submit_review(
        &self,
        user_id: UserId,
        club_id: ClubId,
        rating: u8,
        info: impl Into<String>,
    ) -> ServiceResult<ReviewId> {
        let review = Review::new(rating, info)?;
        let review_id = review.id();
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            user.entity.add_review(&mut club.entity, review)?;
            self.save_club(&club)?;
            Ok(review_id)
        });
        log_outcome("club_submit_review", club_id, user_id, result)
    }

    pub fn edit_review(
        &self,
        user_id: UserId,
        club_id: ClubId,
        rating: Option<u8>,
        info: Option<String>,
    ) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            club.entity
                .act_as_user(&user.entity)?
                .update_review(rating, info)?;
            self.save_club(&club)?;
            Ok(())
        });
        log_outcome("club_edit_review", club_id, user_id, result)
    }

    pub fn delete_review(&self, user_id: UserId, club_id: ClubId) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            user.entity.del_review(&mut club.entity)?;
            self.save_club(&club)?;
            Ok(())
        });
        log_outcome("club_delete_review", club_id, user_id, result)
    }

    /// Casts or switches `user_id`'s vote on a review.
    pub fn vote_on_review(
        &self,
        user_id: UserId,
        club_id: ClubId,
        review_id: ReviewId,
        score: i8,
    ) -> ServiceResult<()> {
        self.with_user_and_club("review_vote", user_id, club_id, |user, club| {
            let review = club
                .review_mut(review_id)
                .ok_or(ServiceError::ReviewNotFound(review_id))?;
            Ok(user.add_review_feedback(review, score)?)
        })
    }

    pub fn retract_review_vote(
        &self,
        user_id: UserId,
        club_id: ClubId,
        review_id: ReviewId,
    ) -> ServiceResult<()> {
        self.with_user_and_club("review_unvote", user_id, club_id, |user, club| {
            let review = club
                .review_mut(review_id)
                .ok_or(ServiceError::ReviewNotFound(review_id))?;
            Ok(user.del_review_feedback(review)?)
        })
    }

    pub fn like_event(&self, user_id: UserId, club_id: ClubId, event_id: EventId) -> ServiceResult<()> {
        self.with_user_and_club("event_like", user_id, club_id, |user, club| {
            let event = club
                .event_mut(event_id)
                .ok_or(ServiceError::EventNotFound(event_id))?;
            Ok(user.add_event_feedback(event)?)
        })
    }

    pub fn unlike_event(
        &self,
        user_id: UserId,
        club_id: ClubId,
        event_id: EventId,
    ) -> ServiceResult<()> {
        self.with_user_and_club("event_unlike", user_id, club_id, |user, club| {
            let event = club
                .event_mut(event_id)
                .ok_or(ServiceError::EventNotFound(event_id))?;
            Ok(user.del_event_feedback(event)?)
        })
    }

    /// Loads both aggregates, runs `op`, then saves the club and the user.
    fn with_user_and_club(
        &self,
        event: &'static str,
        user_id: UserId,
        club_id: ClubId,
        op: impl FnOnce(&mut User, &mut Club) -> ServiceResult<()>,
    ) -> ServiceResult<()> {
        let result = self.clubs.atomically(|| -> ServiceResult<_> {
            let mut user = self.load_user(user_id)?;
            let mut club = self.load_club(club_id)?;
            op(&mut user.entity, &mut club.entity)?;
            self.save_club(&club)?;
            self.save_user(&user)?;
            Ok(())
        });
        log_outcome(event, club_id, user_id, result)
    }
}

fn log_outcome<T>(
    event: &'static str,
    club_id: ClubId,
    user_id: UserId,
    result: ServiceResult<T>,
) -> ServiceResult<T> {
    match &result {
        Ok(_) => info!(
            "event={} module=service status=ok club_id={} user_id={}",
            event, club_id, user_id
        ),
        Err(err) => warn!(
            "event={} module=service status=error club_id={} user_id={} error_code={} error={}",
            event,
            club_id,
            user_id,
            error_code(err),
            err
        ),
    }
    result
}

fn error_code(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::Domain(DomainError::UnauthorizedAction) => "unauthorized",
        ServiceError::Domain(_) => "invariant_violation",
        ServiceError::Repo(RepoError::Conflict { .. }) => "version_conflict",
        ServiceError::Repo(_) => "storage",
        ServiceError::ClubNotFound(_)
        | ServiceError::UserNotFound(_)
        | ServiceError::ReviewNotFound(_)
        | ServiceError::EventNotFound(_) => "not_found",
    }
}
