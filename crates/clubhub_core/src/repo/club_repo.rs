//! Club repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist club aggregates as whole documents.
//! - Answer id, exact-name and all-of-tags lookups.
//!
//! # Invariants
//! - The `club_tags` index always mirrors the stored document's tags.
//! - Partial updates go through entity setters, so stored names stay valid.

use crate::model::club::{Club, ClubDocument, ClubId};
use crate::model::error::{DomainResult, EntityKind};
use crate::repo::{
    begin_write, decode_document, encode_document, finish_write, parse_version, to_sql_version,
    RepoError, RepoResult, UnitOfWork, Versioned,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const CLUB_SELECT_SQL: &str = "SELECT id, document, version FROM clubs c";

/// Load-by-filter options for clubs.
///
/// Empty filters match every club. `tags` uses all-of semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilter {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ClubFilter {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Scalar club fields to overwrite; `None` leaves a field as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubInfoPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub time: Option<String>,
    pub logo: Option<String>,
    pub contact: Option<String>,
    pub website: Option<String>,
}

impl ClubInfoPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.time.is_none()
            && self.logo.is_none()
            && self.contact.is_none()
            && self.website.is_none()
    }

    /// Applies the patch through the club's validated setters.
    ///
    /// The name is checked first, so a rejected patch changes nothing.
    pub fn apply(&self, club: &mut Club) -> DomainResult<()> {
        if let Some(name) = &self.name {
            club.set_name(name.clone())?;
        }
        if let Some(location) = &self.location {
            club.set_location(location.clone());
        }
        if let Some(time) = &self.time {
            club.set_time(time.clone());
        }
        if let Some(logo) = &self.logo {
            club.set_logo(logo.clone());
        }
        if let Some(contact) = &self.contact {
            club.set_contact(contact.clone());
        }
        if let Some(website) = &self.website {
            club.set_website(website.clone());
        }
        Ok(())
    }
}

/// Persistence contract for club aggregates.
pub trait ClubRepository {
    /// Stores a new club at version 1.
    fn insert_club(&self, club: &Club) -> RepoResult<u64>;
    fn get_club(&self, id: ClubId) -> RepoResult<Option<Versioned<Club>>>;
    fn find_clubs(&self, filter: &ClubFilter) -> RepoResult<Vec<Versioned<Club>>>;
    /// Replaces the stored club if it is still at `expected_version`.
    ///
    /// Returns the new version.
    fn save_club(&self, club: &Club, expected_version: u64) -> RepoResult<u64>;
    fn update_club_info(&self, id: ClubId, patch: &ClubInfoPatch) -> RepoResult<Versioned<Club>>;
    fn delete_club(&self, id: ClubId) -> RepoResult<()>;
}

/// SQLite-backed club repository.
pub struct SqliteClubRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClubRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn exists(&self, id: ClubId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM clubs WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn replace_tags(&self, club: &Club) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM club_tags WHERE club_id = ?1;",
            [club.id().to_string()],
        )?;
        let mut stmt = self
            .conn
            .prepare("INSERT INTO club_tags (club_id, tag) VALUES (?1, ?2);")?;
        for tag in club.tags() {
            stmt.execute(params![club.id().to_string(), tag])?;
        }
        Ok(())
    }
}

impl ClubRepository for SqliteClubRepository<'_> {
    fn insert_club(&self, club: &Club) -> RepoResult<u64> {
        if self.exists(club.id())? {
            return Err(RepoError::AlreadyExists {
                kind: EntityKind::Club,
                id: club.id(),
            });
        }

        let document = encode_document(club)?;
        let tx = begin_write(self.conn)?;
        self.conn.execute(
            "INSERT INTO clubs (id, name, document, version) VALUES (?1, ?2, ?3, 1);",
            params![club.id().to_string(), club.name(), document],
        )?;
        self.replace_tags(club)?;
        finish_write(tx)?;
        Ok(1)
    }

    fn get_club(&self, id: ClubId) -> RepoResult<Option<Versioned<Club>>> {
        self.conn
            .query_row(
                &format!("{CLUB_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_raw_row,
            )
            .optional()?
            .map(parse_club_row)
            .transpose()
    }

    fn find_clubs(&self, filter: &ClubFilter) -> RepoResult<Vec<Versioned<Club>>> {
        let mut sql = format!("{CLUB_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = &filter.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        let tags: BTreeSet<&String> = filter.tags.iter().collect();
        if !tags.is_empty() {
            let placeholders = vec!["?"; tags.len()].join(", ");
            sql.push_str(&format!(
                " AND (SELECT COUNT(DISTINCT t.tag) FROM club_tags t
                       WHERE t.club_id = c.id AND t.tag IN ({placeholders})) = ?"
            ));
            bind_values.extend(tags.iter().map(|tag| Value::Text((*tag).clone())));
            bind_values.push(Value::Integer(i64::try_from(tags.len()).map_err(|_| {
                RepoError::InvalidData("too many tags in filter".to_string())
            })?));
        }

        sql.push_str(" ORDER BY name ASC, id ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if filter.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(filter.offset)));
            }
        } else if filter.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(filter.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut clubs = Vec::new();
        while let Some(row) = rows.next()? {
            clubs.push(parse_club_row(read_raw_row(row)?)?);
        }
        Ok(clubs)
    }

    fn save_club(&self, club: &Club, expected_version: u64) -> RepoResult<u64> {
        let document = encode_document(club)?;
        let tx = begin_write(self.conn)?;
        let changed = self.conn.execute(
            "UPDATE clubs
             SET
                name = ?1,
                document = ?2,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND version = ?4;",
            params![
                club.name(),
                document,
                club.id().to_string(),
                to_sql_version(expected_version)?,
            ],
        )?;

        if changed == 0 {
            if self.exists(club.id())? {
                return Err(RepoError::Conflict {
                    kind: EntityKind::Club,
                    id: club.id(),
                    expected: expected_version,
                });
            }
            return Err(RepoError::NotFound {
                kind: EntityKind::Club,
                id: club.id(),
            });
        }

        self.replace_tags(club)?;
        finish_write(tx)?;
        Ok(expected_version + 1)
    }

    fn update_club_info(&self, id: ClubId, patch: &ClubInfoPatch) -> RepoResult<Versioned<Club>> {
        let mut stored = self.get_club(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Club,
            id,
        })?;
        if patch.is_empty() {
            return Ok(stored);
        }

        patch.apply(&mut stored.entity)?;
        stored.version = self.save_club(&stored.entity, stored.version)?;
        Ok(stored)
    }

    fn delete_club(&self, id: ClubId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM clubs WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Club,
                id,
            });
        }
        Ok(())
    }
}

impl UnitOfWork for SqliteClubRepository<'_> {
    fn atomically<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        self.conn.atomically(work)
    }
}

struct RawClubRow {
    id: String,
    document: String,
    version: i64,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawClubRow> {
    Ok(RawClubRow {
        id: row.get("id")?,
        document: row.get("document")?,
        version: row.get("version")?,
    })
}

fn parse_club_row(raw: RawClubRow) -> RepoResult<Versioned<Club>> {
    let club: Club = decode_document::<ClubDocument, Club>(&raw.document)?;
    if club.id().to_string() != raw.id {
        return Err(RepoError::InvalidData(format!(
            "clubs.id `{}` does not match document id `{}`",
            raw.id,
            club.id()
        )));
    }
    Ok(Versioned {
        entity: club,
        version: parse_version(raw.version)?,
    })
}
