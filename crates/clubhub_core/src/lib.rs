//! Domain core for the club directory.
//! Entities here are the single source of truth for membership, role and
//! feedback invariants; storage and services build on top of them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::actor::{Disbandment, MemberActor};
pub use model::club::{Club, ClubDocument, ClubId, NewClub};
pub use model::error::{Collection, DocumentError, DomainError, DomainResult, EntityKind};
pub use model::event::{Event, EventDocument, EventId, NewEvent};
pub use model::member::{Member, MemberDocument, MemberId};
pub use model::review::{Review, ReviewDocument, ReviewId};
pub use model::role::ClubRole;
pub use model::user::{FeedbackLedger, NewUser, User, UserDocument, UserId, DISLIKE, LIKE};
pub use repo::club_repo::{ClubFilter, ClubInfoPatch, ClubRepository, SqliteClubRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository, UserSettingsPatch};
pub use repo::{RepoError, RepoResult, UnitOfWork, Versioned};
pub use service::club_service::ClubService;
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
