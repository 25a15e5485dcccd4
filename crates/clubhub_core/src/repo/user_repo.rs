//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - Emails are unique across stored users.
//! - Users are never hard-deleted.

use crate::model::error::{DomainResult, EntityKind};
use crate::model::user::{User, UserDocument, UserId};
use crate::repo::{
    decode_document, encode_document, parse_version, to_sql_version, RepoError, RepoResult,
    Versioned,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, document, version FROM users";

/// Profile settings to overwrite; `None` leaves a field as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSettingsPatch {
    pub name: Option<String>,
    pub year: Option<String>,
    pub major: Option<String>,
}

impl UserSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.year.is_none() && self.major.is_none()
    }

    pub fn apply(&self, user: &mut User) -> DomainResult<()> {
        if let Some(name) = &self.name {
            user.set_name(name.clone())?;
        }
        if let Some(year) = &self.year {
            user.set_year(year.clone());
        }
        if let Some(major) = &self.major {
            user.set_major(major.clone());
        }
        Ok(())
    }
}

/// Persistence contract for user aggregates.
pub trait UserRepository {
    fn insert_user(&self, user: &User) -> RepoResult<u64>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<Versioned<User>>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<Versioned<User>>>;
    /// Replaces the stored user if it is still at `expected_version`.
    fn save_user(&self, user: &User, expected_version: u64) -> RepoResult<u64>;
    fn update_user_settings(
        &self,
        id: UserId,
        patch: &UserSettingsPatch,
    ) -> RepoResult<Versioned<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: String) -> RepoResult<Option<Versioned<User>>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE {column} = ?1;"),
                [value],
                read_raw_row,
            )
            .optional()?
            .map(parse_user_row)
            .transpose()
    }

    fn email_owner(&self, email: &str) -> RepoResult<Option<String>> {
        let owner = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1;",
                [email],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(owner)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &User) -> RepoResult<u64> {
        if self.get_user(user.id())?.is_some() {
            return Err(RepoError::AlreadyExists {
                kind: EntityKind::User,
                id: user.id(),
            });
        }
        if self.email_owner(user.email())?.is_some() {
            return Err(RepoError::EmailTaken(user.email().to_string()));
        }

        self.conn.execute(
            "INSERT INTO users (id, email, document, version) VALUES (?1, ?2, ?3, 1);",
            params![user.id().to_string(), user.email(), encode_document(user)?],
        )?;
        Ok(1)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<Versioned<User>>> {
        self.find_one("id", id.to_string())
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<Versioned<User>>> {
        self.find_one("email", email.to_string())
    }

    fn save_user(&self, user: &User, expected_version: u64) -> RepoResult<u64> {
        if let Some(owner) = self.email_owner(user.email())? {
            if owner != user.id().to_string() {
                return Err(RepoError::EmailTaken(user.email().to_string()));
            }
        }

        let changed = self.conn.execute(
            "UPDATE users
             SET
                email = ?1,
                document = ?2,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND version = ?4;",
            params![
                user.email(),
                encode_document(user)?,
                user.id().to_string(),
                to_sql_version(expected_version)?,
            ],
        )?;

        if changed == 0 {
            if self.get_user(user.id())?.is_some() {
                return Err(RepoError::Conflict {
                    kind: EntityKind::User,
                    id: user.id(),
                    expected: expected_version,
                });
            }
            return Err(RepoError::NotFound {
                kind: EntityKind::User,
                id: user.id(),
            });
        }
        Ok(expected_version + 1)
    }

    fn update_user_settings(
        &self,
        id: UserId,
        patch: &UserSettingsPatch,
    ) -> RepoResult<Versioned<User>> {
        let mut stored = self.get_user(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::User,
            id,
        })?;
        if patch.is_empty() {
            return Ok(stored);
        }

        patch.apply(&mut stored.entity)?;
        stored.version = self.save_user(&stored.entity, stored.version)?;
        Ok(stored)
    }
}

struct RawUserRow {
    id: String,
    document: String,
    version: i64,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawUserRow> {
    Ok(RawUserRow {
        id: row.get("id")?,
        document: row.get("document")?,
        version: row.get("version")?,
    })
}

fn parse_user_row(raw: RawUserRow) -> RepoResult<Versioned<User>> {
    let user: User = decode_document::<UserDocument, User>(&raw.document)?;
    if user.id().to_string() != raw.id {
        return Err(RepoError::InvalidData(format!(
            "users.id `{}` does not match document id `{}`",
            raw.id,
            user.id()
        )));
    }
    Ok(Versioned {
        entity: user,
        version: parse_version(raw.version)?,
    })
}
