//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Photo references are stored
//! as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use lobby_core::{
  approval::{Approval, ApprovalStatus},
  visitor::{PhotoRef, Visitor},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── ApprovalStatus ───────────────────────────────────────────────────────────

pub fn encode_status(s: ApprovalStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<ApprovalStatus> {
  ApprovalStatus::ALL
    .into_iter()
    .find(|status| status.as_str() == s)
    .ok_or_else(|| Error::Decode(format!("unknown approval status: {s:?}")))
}

// ─── Version ──────────────────────────────────────────────────────────────────

pub fn encode_version(v: u64) -> Result<i64> {
  i64::try_from(v).map_err(|_| Error::Decode(format!("version {v} out of range")))
}

pub fn decode_version(v: i64) -> Result<u64> {
  u64::try_from(v).map_err(|_| Error::Decode(format!("negative version {v}")))
}

// ─── PhotoRef ─────────────────────────────────────────────────────────────────

pub fn encode_photo(p: &PhotoRef) -> Result<String> { Ok(serde_json::to_string(p)?) }

pub fn decode_photo(s: &str) -> Result<PhotoRef> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const VISITOR_COLUMNS: &str = "visitor_id, name, email, phone, company, host, \
                                   purpose, id_proof, photo, created_at";

/// Raw strings read directly from a `visitors` row.
pub struct RawVisitor {
  pub visitor_id: String,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub company:    Option<String>,
  pub host:       Option<String>,
  pub purpose:    Option<String>,
  pub id_proof:   Option<String>,
  pub photo:      Option<String>,
  pub created_at: String,
}

impl RawVisitor {
  /// Read a row selected with [`VISITOR_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visitor_id: row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      phone:      row.get(3)?,
      company:    row.get(4)?,
      host:       row.get(5)?,
      purpose:    row.get(6)?,
      id_proof:   row.get(7)?,
      photo:      row.get(8)?,
      created_at: row.get(9)?,
    })
  }

  pub fn into_visitor(self) -> Result<Visitor> {
    Ok(Visitor {
      visitor_id: decode_uuid(&self.visitor_id)?,
      name:       self.name,
      email:      self.email,
      phone:      self.phone,
      company:    self.company,
      host:       self.host,
      purpose:    self.purpose,
      id_proof:   self.id_proof,
      photo:      self.photo.as_deref().map(decode_photo).transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const APPROVAL_COLUMNS: &str =
  "approval_id, visitor_id, status, in_time, out_time, created_at, version";

/// Raw values read directly from an `approvals` row.
pub struct RawApproval {
  pub approval_id: String,
  pub visitor_id:  String,
  pub status:      String,
  pub in_time:     Option<String>,
  pub out_time:    Option<String>,
  pub created_at:  String,
  pub version:     i64,
}

impl RawApproval {
  /// Read a row selected with [`APPROVAL_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      approval_id: row.get(0)?,
      visitor_id:  row.get(1)?,
      status:      row.get(2)?,
      in_time:     row.get(3)?,
      out_time:    row.get(4)?,
      created_at:  row.get(5)?,
      version:     row.get(6)?,
    })
  }

  /// Decode the row, refusing records that break the status/timestamp
  /// invariants.
  pub fn into_approval(self) -> Result<Approval> {
    let approval = Approval {
      approval_id: decode_uuid(&self.approval_id)?,
      visitor_id:  decode_uuid(&self.visitor_id)?,
      status:      decode_status(&self.status)?,
      in_time:     self.in_time.as_deref().map(decode_dt).transpose()?,
      out_time:    self.out_time.as_deref().map(decode_dt).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
      version:     decode_version(self.version)?,
    };
    if !approval.is_consistent() {
      return Err(Error::Corrupt(approval.approval_id));
    }
    Ok(approval)
  }
}
