//! Club directory domain model.
//!
//! # Responsibility
//! - Define the club, member, user, review and event entities.
//! - Enforce cross-entity consistency rules in memory, without I/O.
//!
//! # Invariants
//! - Every entity is identified by a stable, non-nil UUID and compares
//!   equal by identity only.
//! - Entities reference each other by id; the club owns its members, news
//!   and reviews, users own only their membership and feedback indexes.
//! - Every entity round-trips through its `*Document` shape, re-running
//!   constructor validation on the way back in.

pub mod actor;
pub mod club;
pub mod error;
pub mod event;
pub mod member;
pub mod review;
pub mod role;
pub mod user;
