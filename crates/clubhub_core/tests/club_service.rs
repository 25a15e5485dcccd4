use clubhub_core::db::open_db_in_memory;
use clubhub_core::{
    ClubFilter, ClubInfoPatch, ClubRole, ClubService, DomainError, EntityKind, NewClub, NewEvent,
    NewUser, RepoError, RepoResult, ServiceError, SqliteClubRepository, SqliteUserRepository, User,
    UserId, UserRepository, UserService, UserSettingsPatch, Versioned, DISLIKE, LIKE,
};
use rusqlite::Connection;

type Service<'conn> = ClubService<SqliteClubRepository<'conn>, SqliteUserRepository<'conn>>;

fn services(conn: &Connection) -> (Service<'_>, UserService<SqliteUserRepository<'_>>) {
    (
        ClubService::new(SqliteClubRepository::new(conn), SqliteUserRepository::new(conn)),
        UserService::new(SqliteUserRepository::new(conn)),
    )
}

/// Reads like the SQLite store but refuses every user save.
struct RejectingUserSaves<'conn>(SqliteUserRepository<'conn>);

impl UserRepository for RejectingUserSaves<'_> {
    fn insert_user(&self, user: &User) -> RepoResult<u64> {
        self.0.insert_user(user)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<Versioned<User>>> {
        self.0.get_user(id)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<Versioned<User>>> {
        self.0.find_user_by_email(email)
    }

    fn save_user(&self, user: &User, expected_version: u64) -> RepoResult<u64> {
        Err(RepoError::Conflict {
            kind: EntityKind::User,
            id: user.id(),
            expected: expected_version,
        })
    }

    fn update_user_settings(
        &self,
        id: UserId,
        patch: &UserSettingsPatch,
    ) -> RepoResult<Versioned<User>> {
        self.0.update_user_settings(id, patch)
    }
}

fn rejecting_service(
    conn: &Connection,
) -> ClubService<SqliteClubRepository<'_>, RejectingUserSaves<'_>> {
    ClubService::new(
        SqliteClubRepository::new(conn),
        RejectingUserSaves(SqliteUserRepository::new(conn)),
    )
}

fn sign_in(users: &UserService<SqliteUserRepository<'_>>, name: &str) -> User {
    users
        .sign_in(NewUser {
            email: format!("{name}@school.edu"),
            name: name.to_string(),
            ..NewUser::default()
        })
        .unwrap()
}

#[test]
fn sign_in_is_idempotent_per_email() {
    let conn = open_db_in_memory().unwrap();
    let (_, users) = services(&conn);

    let first = sign_in(&users, "sam");
    let again = sign_in(&users, "sam");
    assert_eq!(first.id(), again.id());

    let updated = users
        .update_settings(
            first.id(),
            &UserSettingsPatch {
                major: Some("Biology".to_string()),
                ..UserSettingsPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.major(), "Biology");
    assert_eq!(users.get_user(first.id()).unwrap().major(), "Biology");
}

#[test]
fn create_apply_accept_and_leave() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");

    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    let pat = users.get_user(pat.id()).unwrap();
    assert!(pat.membership(club.id()).is_some());

    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    assert!(matches!(
        clubs.apply_to_club(mo.id(), club.id()).unwrap_err(),
        ServiceError::Domain(DomainError::DuplicateApplication(_))
    ));

    let member_id = clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();
    let stored = clubs.get_club(club.id()).unwrap();
    assert_eq!(stored.size(), 2);
    assert!(stored.applications().is_empty());
    assert_eq!(
        users.get_user(mo.id()).unwrap().membership(club.id()),
        Some(member_id)
    );

    clubs.leave_club(mo.id(), club.id()).unwrap();
    assert_eq!(clubs.get_club(club.id()).unwrap().size(), 1);
    assert!(users.get_user(mo.id()).unwrap().memberships().is_empty());
}

#[test]
fn only_presidents_manage_the_club() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");
    let outsider = sign_in(&users, "ou");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();

    assert!(matches!(
        clubs.add_club_tag(mo.id(), club.id(), "games").unwrap_err(),
        ServiceError::Domain(DomainError::UnauthorizedAction)
    ));
    assert!(matches!(
        clubs.add_club_tag(outsider.id(), club.id(), "games").unwrap_err(),
        ServiceError::Domain(DomainError::NotAMember)
    ));

    clubs.add_club_tag(pat.id(), club.id(), "games").unwrap();
    clubs
        .update_club_info(
            pat.id(),
            club.id(),
            ClubInfoPatch {
                location: Some("Hall 2".to_string()),
                ..ClubInfoPatch::default()
            },
        )
        .unwrap();

    let stored = clubs.get_club(club.id()).unwrap();
    assert_eq!(stored.tags(), ["games".to_string()]);
    assert_eq!(stored.location(), "Hall 2");
    assert_eq!(
        clubs
            .list_clubs(&ClubFilter::with_tags(["games"]))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn kick_then_self_kick_is_refused() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();

    clubs.kick_member(pat.id(), club.id(), mo.id()).unwrap();
    assert_eq!(clubs.get_club(club.id()).unwrap().size(), 1);
    assert!(users.get_user(mo.id()).unwrap().memberships().is_empty());

    assert!(matches!(
        clubs.kick_member(pat.id(), club.id(), pat.id()).unwrap_err(),
        ServiceError::Domain(DomainError::LastPresident)
    ));
    assert!(matches!(
        clubs.leave_club(pat.id(), club.id()).unwrap_err(),
        ServiceError::Domain(DomainError::LastPresident)
    ));
    assert_eq!(clubs.get_club(club.id()).unwrap().presidents().len(), 1);
}

#[test]
fn promotion_and_retirement() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    let mo_member = clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();

    assert!(matches!(
        clubs.retire(pat.id(), club.id()).unwrap_err(),
        ServiceError::Domain(DomainError::LastPresident)
    ));
    clubs
        .update_member_position(pat.id(), club.id(), mo_member, ClubRole::President)
        .unwrap();
    clubs.retire(pat.id(), club.id()).unwrap();

    let stored = clubs.get_club(club.id()).unwrap();
    let presidents = stored.presidents();
    assert_eq!(presidents.len(), 1);
    assert_eq!(presidents[0].user_id(), mo.id());
}

#[test]
fn disband_releases_every_membership() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    let keep = clubs.create_club(mo.id(), NewClub::named("Go")).unwrap();
    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();

    assert!(matches!(
        clubs.disband_club(mo.id(), club.id()).unwrap_err(),
        ServiceError::Domain(DomainError::UnauthorizedAction)
    ));
    clubs.disband_club(pat.id(), club.id()).unwrap();

    assert!(matches!(
        clubs.get_club(club.id()).unwrap_err(),
        ServiceError::ClubNotFound(_)
    ));
    assert!(users.get_user(pat.id()).unwrap().memberships().is_empty());
    let mo = users.get_user(mo.id()).unwrap();
    assert!(mo.membership(club.id()).is_none());
    assert!(mo.membership(keep.id()).is_some());
}

#[test]
fn reviews_and_votes_persist() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let voter = sign_in(&users, "vi");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();

    assert!(matches!(
        clubs.submit_review(pat.id(), club.id(), 6, "wow").unwrap_err(),
        ServiceError::Domain(DomainError::InvalidRating(6))
    ));
    let review_id = clubs.submit_review(pat.id(), club.id(), 4, "nice").unwrap();
    clubs
        .edit_review(pat.id(), club.id(), Some(5), None)
        .unwrap();

    clubs
        .vote_on_review(voter.id(), club.id(), review_id, LIKE)
        .unwrap();
    clubs
        .vote_on_review(voter.id(), club.id(), review_id, DISLIKE)
        .unwrap();

    let stored = clubs.get_club(club.id()).unwrap();
    let review = stored.reviews()[0].clone();
    assert_eq!(review.rating(), 5);
    assert_eq!(review.likes(), 0);
    assert_eq!(review.dislikes(), 1);
    assert_eq!(stored.rating(), Some(5.0));
    assert_eq!(
        users.get_user(voter.id()).unwrap().review_feedback(review_id),
        Some(DISLIKE)
    );

    clubs
        .retract_review_vote(voter.id(), club.id(), review_id)
        .unwrap();
    assert_eq!(clubs.get_club(club.id()).unwrap().reviews()[0].dislikes(), 0);

    clubs.delete_review(pat.id(), club.id()).unwrap();
    assert_eq!(clubs.get_club(club.id()).unwrap().rating(), None);
    assert!(matches!(
        clubs
            .vote_on_review(voter.id(), club.id(), review_id, LIKE)
            .unwrap_err(),
        ServiceError::ReviewNotFound(_)
    ));
}

#[test]
fn news_posts_count_views_and_likes() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let fan = sign_in(&users, "fa");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();

    let event_id = clubs
        .post_event(pat.id(), club.id(), NewEvent::titled("Open night"))
        .unwrap();
    clubs.view_event(club.id(), event_id).unwrap();
    clubs.view_event(club.id(), event_id).unwrap();
    clubs.like_event(fan.id(), club.id(), event_id).unwrap();
    assert!(matches!(
        clubs.like_event(fan.id(), club.id(), event_id).unwrap_err(),
        ServiceError::Domain(DomainError::DuplicateFeedback(_))
    ));

    let stored = clubs.get_club(club.id()).unwrap();
    let event = stored.event(event_id).unwrap();
    assert_eq!(event.views(), 2);
    assert_eq!(event.likes(), 1);

    clubs.unlike_event(fan.id(), club.id(), event_id).unwrap();
    clubs.remove_event(pat.id(), club.id(), event_id).unwrap();
    assert!(clubs.get_club(club.id()).unwrap().news().is_empty());
    assert!(matches!(
        clubs.view_event(club.id(), event_id).unwrap_err(),
        ServiceError::EventNotFound(_)
    ));
}

#[test]
fn stale_user_write_surfaces_as_conflict() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let raw = SqliteUserRepository::new(&conn);
    let stale = raw.get_user(pat.id()).unwrap().unwrap();

    clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();

    assert!(matches!(
        raw.save_user(&stale.entity, stale.version).unwrap_err(),
        RepoError::Conflict { .. }
    ));
}

#[test]
fn failed_user_save_rolls_back_accepted_application() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let rejecting = rejecting_service(&conn);
    let pat = sign_in(&users, "pat");
    let sam = sign_in(&users, "sam");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(sam.id(), club.id()).unwrap();

    assert!(matches!(
        rejecting
            .accept_application(pat.id(), club.id(), sam.id())
            .unwrap_err(),
        ServiceError::Repo(RepoError::Conflict { .. })
    ));

    let stored = clubs.get_club(club.id()).unwrap();
    assert_eq!(stored.size(), 1);
    assert!(!stored.has_user(sam.id()));
    assert_eq!(stored.applications(), [sam.id()]);
    assert!(users.get_user(sam.id()).unwrap().membership(club.id()).is_none());
    assert!(matches!(
        clubs.leave_club(sam.id(), club.id()).unwrap_err(),
        ServiceError::Domain(DomainError::NotAMember)
    ));

    let member_id = clubs
        .accept_application(pat.id(), club.id(), sam.id())
        .unwrap();
    assert_eq!(
        users.get_user(sam.id()).unwrap().membership(club.id()),
        Some(member_id)
    );
    clubs.leave_club(sam.id(), club.id()).unwrap();
    assert_eq!(clubs.get_club(club.id()).unwrap().size(), 1);
}

#[test]
fn failed_votes_leave_no_counter_behind() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let rejecting = rejecting_service(&conn);
    let pat = sign_in(&users, "pat");
    let voter = sign_in(&users, "vi");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    let review_id = clubs.submit_review(pat.id(), club.id(), 4, "nice").unwrap();
    let event_id = clubs
        .post_event(pat.id(), club.id(), NewEvent::titled("Open night"))
        .unwrap();

    for _ in 0..2 {
        assert!(rejecting
            .vote_on_review(voter.id(), club.id(), review_id, LIKE)
            .is_err());
        assert!(rejecting
            .like_event(voter.id(), club.id(), event_id)
            .is_err());
    }
    let stored = clubs.get_club(club.id()).unwrap();
    assert_eq!(stored.reviews()[0].likes(), 0);
    assert_eq!(stored.event(event_id).unwrap().likes(), 0);
    let stored_voter = users.get_user(voter.id()).unwrap();
    assert!(stored_voter.review_feedback(review_id).is_none());
    assert!(!stored_voter.likes_event(event_id));

    clubs
        .vote_on_review(voter.id(), club.id(), review_id, LIKE)
        .unwrap();
    clubs.like_event(voter.id(), club.id(), event_id).unwrap();
    let stored = clubs.get_club(club.id()).unwrap();
    assert_eq!(stored.reviews()[0].likes(), 1);
    assert_eq!(stored.event(event_id).unwrap().likes(), 1);
}

#[test]
fn failed_user_save_rolls_back_create_leave_and_disband() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let rejecting = rejecting_service(&conn);
    let pat = sign_in(&users, "pat");
    let mo = sign_in(&users, "mo");

    assert!(rejecting
        .create_club(pat.id(), NewClub::named("Go"))
        .is_err());
    assert!(clubs.list_clubs(&ClubFilter::default()).unwrap().is_empty());
    assert!(users.get_user(pat.id()).unwrap().memberships().is_empty());

    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(mo.id(), club.id()).unwrap();
    clubs
        .accept_application(pat.id(), club.id(), mo.id())
        .unwrap();

    assert!(rejecting.leave_club(mo.id(), club.id()).is_err());
    assert!(rejecting.kick_member(pat.id(), club.id(), mo.id()).is_err());
    assert!(clubs.get_club(club.id()).unwrap().has_user(mo.id()));
    assert!(users.get_user(mo.id()).unwrap().membership(club.id()).is_some());

    assert!(rejecting.disband_club(pat.id(), club.id()).is_err());
    assert_eq!(clubs.get_club(club.id()).unwrap().size(), 2);
    assert!(users.get_user(pat.id()).unwrap().membership(club.id()).is_some());
    assert!(users.get_user(mo.id()).unwrap().membership(club.id()).is_some());
}

#[test]
fn lookups_inside_a_flow_report_what_is_missing() {
    let conn = open_db_in_memory().unwrap();
    let (clubs, users) = services(&conn);
    let pat = sign_in(&users, "pat");
    let al = sign_in(&users, "al");
    let club = clubs.create_club(pat.id(), NewClub::named("Chess")).unwrap();
    clubs.apply_to_club(al.id(), club.id()).unwrap();

    let ghost = uuid::Uuid::new_v4();
    assert!(matches!(
        clubs
            .decline_application(pat.id(), club.id(), ghost)
            .unwrap_err(),
        ServiceError::UserNotFound(id) if id == ghost
    ));
    assert!(matches!(
        clubs.view_event(ghost, uuid::Uuid::new_v4()).unwrap_err(),
        ServiceError::ClubNotFound(id) if id == ghost
    ));
    assert!(matches!(
        users
            .update_settings(ghost, &UserSettingsPatch::default())
            .unwrap_err(),
        ServiceError::UserNotFound(id) if id == ghost
    ));

    clubs
        .decline_application(pat.id(), club.id(), al.id())
        .unwrap();
    assert!(clubs.get_club(club.id()).unwrap().applications().is_empty());
}
