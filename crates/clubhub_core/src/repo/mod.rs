//! Persistence contracts and the SQLite document store.
//!
//! # Responsibility
//! - Define the load-by-id / load-by-filter / save / partial-update
//!   contracts the service layer depends on.
//! - Store each aggregate as one JSON document, the same mapping the
//!   entities serialize to.
//!
//! # Invariants
//! - Every read re-validates the document through the entity constructors.
//! - Saves are conditional on the version the caller loaded; a stale save
//!   fails with [`RepoError::Conflict`] instead of overwriting.
//! - Writes issued inside [`UnitOfWork::atomically`] commit or roll back
//!   together.

use crate::db::DbError;
use crate::model::error::{DocumentError, DomainError, EntityKind};
use rusqlite::{Connection, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod club_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence failures.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: Uuid },
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("{kind} {id} changed since version {expected} was loaded")]
    Conflict {
        kind: EntityKind,
        id: Uuid,
        expected: u64,
    },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// An aggregate together with the store version it was loaded at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub entity: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.entity
    }
}

/// Groups writes to several aggregates into one atomic unit.
pub trait UnitOfWork {
    /// Runs `work` in one transaction; an `Err` rolls every write back.
    fn atomically<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;
}

impl UnitOfWork for Connection {
    fn atomically<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let tx = begin_write(self)?;
        let value = work()?;
        finish_write(tx)?;
        Ok(value)
    }
}

/// Opens a transaction unless `conn` is already inside one.
pub(crate) fn begin_write(conn: &Connection) -> RepoResult<Option<Transaction<'_>>> {
    if conn.is_autocommit() {
        Ok(Some(conn.unchecked_transaction()?))
    } else {
        Ok(None)
    }
}

pub(crate) fn finish_write(tx: Option<Transaction<'_>>) -> RepoResult<()> {
    if let Some(tx) = tx {
        tx.commit()?;
    }
    Ok(())
}

pub(crate) fn encode_document<T: Serialize>(entity: &T) -> RepoResult<String> {
    serde_json::to_string(entity).map_err(|err| DocumentError::Malformed(err).into())
}

/// Parses a stored document and rebuilds the entity, re-running validation.
pub(crate) fn decode_document<D, T>(text: &str) -> RepoResult<T>
where
    D: DeserializeOwned,
    T: TryFrom<D, Error = DomainError>,
{
    let document: D = serde_json::from_str(text).map_err(DocumentError::Malformed)?;
    let entity = T::try_from(document).map_err(DocumentError::Invalid)?;
    Ok(entity)
}

pub(crate) fn parse_version(raw: i64) -> RepoResult<u64> {
    u64::try_from(raw).map_err(|_| RepoError::InvalidData(format!("negative version `{raw}`")))
}

pub(crate) fn to_sql_version(version: u64) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("version `{version}` out of range")))
}
