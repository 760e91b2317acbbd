//! Approvals: one record per visit, and the state machine that moves them.
//!
//! ```text
//!   register ──► PENDING ──check_in──► CHECKED_IN ──check_out──► CHECKED_OUT
//!                                         ▲
//!   walk-in ──────────────────────────────┘
//! ```
//!
//! Transitions are pure: they take the current record and return the next
//! one, leaving persistence to the caller. Every returned record satisfies
//! [`Approval::is_consistent`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
  Pending,
  CheckedIn,
  CheckedOut,
}

impl ApprovalStatus {
  pub const ALL: [Self; 3] = [Self::Pending, Self::CheckedIn, Self::CheckedOut];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::CheckedIn => "CHECKED_IN",
      Self::CheckedOut => "CHECKED_OUT",
    }
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::CheckedOut) }
}

impl fmt::Display for ApprovalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A requested transition, reported back in
/// [`Error::InvalidTransition`](crate::Error::InvalidTransition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  CheckIn,
  CheckOut,
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::CheckIn => "check in",
      Self::CheckOut => "check out",
    })
  }
}

// ─── Approval ────────────────────────────────────────────────────────────────

/// One visit instance. A visitor may accumulate many approvals over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
  pub approval_id: Uuid,
  pub visitor_id:  Uuid,
  pub status:      ApprovalStatus,
  pub in_time:     Option<DateTime<Utc>>,
  pub out_time:    Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  /// Bumped on every persisted transition; writes are conditional on it.
  pub version:     u64,
}

impl Approval {
  /// A pre-registered visit awaiting arrival.
  pub fn pending(visitor_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      approval_id: Uuid::new_v4(),
      visitor_id,
      status: ApprovalStatus::Pending,
      in_time: None,
      out_time: None,
      created_at: now,
      version: 0,
    }
  }

  /// A walk-in visit, checked in on creation.
  pub fn walk_in(visitor_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      status: ApprovalStatus::CheckedIn,
      in_time: Some(now),
      ..Self::pending(visitor_id, now)
    }
  }

  /// PENDING → CHECKED_IN, stamping `in_time`.
  pub fn check_in(&self, at: DateTime<Utc>) -> Result<Self> {
    match self.status {
      ApprovalStatus::Pending => Ok(Self {
        status: ApprovalStatus::CheckedIn,
        in_time: Some(at),
        version: self.version + 1,
        ..self.clone()
      }),
      from => Err(self.rejected(Action::CheckIn, from)),
    }
  }

  /// CHECKED_IN → CHECKED_OUT, stamping `out_time`.
  ///
  /// `out_time` is clamped to `in_time` so a clock step backwards between the
  /// two transitions cannot produce an inverted interval.
  pub fn check_out(&self, at: DateTime<Utc>) -> Result<Self> {
    match (self.status, self.in_time) {
      (ApprovalStatus::CheckedIn, Some(in_time)) => Ok(Self {
        status: ApprovalStatus::CheckedOut,
        out_time: Some(at.max(in_time)),
        version: self.version + 1,
        ..self.clone()
      }),
      (from, _) => Err(self.rejected(Action::CheckOut, from)),
    }
  }

  /// Apply `action` to this record.
  pub fn apply(&self, action: Action, at: DateTime<Utc>) -> Result<Self> {
    match action {
      Action::CheckIn => self.check_in(at),
      Action::CheckOut => self.check_out(at),
    }
  }

  /// Whether status and timestamps agree with each other.
  pub fn is_consistent(&self) -> bool {
    match (self.status, self.in_time, self.out_time) {
      (ApprovalStatus::Pending, None, None) => true,
      (ApprovalStatus::CheckedIn, Some(_), None) => true,
      (ApprovalStatus::CheckedOut, Some(i), Some(o)) => i <= o,
      _ => false,
    }
  }

  fn rejected(&self, action: Action, from: ApprovalStatus) -> Error {
    Error::InvalidTransition { approval_id: self.approval_id, action, from }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Filter for [`RecordStore::list_approvals`](crate::store::RecordStore::list_approvals).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalQuery {
  pub status:     Option<ApprovalStatus>,
  pub visitor_id: Option<Uuid>,
}

/// Number of approvals in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
  pub pending:     u64,
  pub checked_in:  u64,
  pub checked_out: u64,
}

impl Occupancy {
  pub fn add(&mut self, status: ApprovalStatus, n: u64) {
    match status {
      ApprovalStatus::Pending => self.pending += n,
      ApprovalStatus::CheckedIn => self.checked_in += n,
      ApprovalStatus::CheckedOut => self.checked_out += n,
    }
  }
}
