//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use lobby_core::{
  approval::{Approval, ApprovalQuery, Occupancy},
  store::RecordStore,
  visitor::{NewVisitor, PhotoRef, Visitor, email_key},
};

use crate::{
  Error, Result,
  encode::{
    APPROVAL_COLUMNS, RawApproval, RawVisitor, VISITOR_COLUMNS, decode_status,
    encode_dt, encode_photo, encode_status, encode_uuid, encode_version,
  },
  schema::SCHEMA,
};

/// How long a statement waits on another connection's lock before failing
/// with `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lobby record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// Like [`SqliteStore::open`], with an explicit lock-wait timeout.
  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(busy_timeout).await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(DEFAULT_BUSY_TIMEOUT).await?;
    Ok(store)
  }

  async fn init_schema(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!(?busy_timeout, "sqlite schema ready");
    Ok(())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Visitors ──────────────────────────────────────────────────────────────

  async fn add_visitor(
    &self,
    input: NewVisitor,
    photo: Option<PhotoRef>,
  ) -> Result<Visitor> {
    let visitor = Visitor {
      visitor_id: Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      phone:      input.phone,
      company:    input.company,
      host:       input.host,
      purpose:    input.purpose,
      id_proof:   input.id_proof,
      photo,
      created_at: Utc::now(),
    };

    let id_str    = encode_uuid(visitor.visitor_id);
    let key       = visitor.email.as_deref().map(email_key);
    let photo_str = visitor.photo.as_ref().map(encode_photo).transpose()?;
    let at_str    = encode_dt(visitor.created_at);
    let row       = visitor.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO visitors (
             visitor_id, name, email, email_key, phone, company,
             host, purpose, id_proof, photo, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (email_key) DO NOTHING",
          rusqlite::params![
            id_str,
            row.name,
            row.email,
            key,
            row.phone,
            row.company,
            row.host,
            row.purpose,
            row.id_proof,
            photo_str,
            at_str,
          ],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::DuplicateEmail(visitor.email.unwrap_or_default()));
    }
    Ok(visitor)
  }

  async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVisitor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VISITOR_COLUMNS} FROM visitors WHERE visitor_id = ?1"),
            rusqlite::params![id_str],
            RawVisitor::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVisitor::into_visitor).transpose()
  }

  async fn find_visitor_by_email(&self, email: &str) -> Result<Option<Visitor>> {
    let key = email_key(email);

    let raw: Option<RawVisitor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VISITOR_COLUMNS} FROM visitors WHERE email_key = ?1"),
            rusqlite::params![key],
            RawVisitor::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVisitor::into_visitor).transpose()
  }

  async fn list_visitors(&self) -> Result<Vec<Visitor>> {
    let raws: Vec<RawVisitor> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {VISITOR_COLUMNS} FROM visitors ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], RawVisitor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitor::into_visitor).collect()
  }

  async fn delete_visitor(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM approvals WHERE visitor_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM visitors WHERE visitor_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Approvals ─────────────────────────────────────────────────────────────

  async fn add_approval(&self, approval: &Approval) -> Result<()> {
    let approval_id_str = encode_uuid(approval.approval_id);
    let visitor_id_str  = encode_uuid(approval.visitor_id);
    let status_str      = encode_status(approval.status);
    let in_time_str     = approval.in_time.map(encode_dt);
    let out_time_str    = approval.out_time.map(encode_dt);
    let created_str     = encode_dt(approval.created_at);
    let version         = encode_version(approval.version)?;

    // The visitor check and the insert are one statement, so a concurrent
    // delete cannot slip in between them.
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO approvals (
             approval_id, visitor_id, status, in_time, out_time, created_at, version
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
           WHERE EXISTS (SELECT 1 FROM visitors WHERE visitor_id = ?2)",
          rusqlite::params![
            approval_id_str,
            visitor_id_str,
            status_str,
            in_time_str,
            out_time_str,
            created_str,
            version,
          ],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::VisitorNotFound(approval.visitor_id));
    }
    Ok(())
  }

  async fn get_approval(&self, id: Uuid) -> Result<Option<Approval>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawApproval> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {APPROVAL_COLUMNS} FROM approvals WHERE approval_id = ?1"),
            rusqlite::params![id_str],
            RawApproval::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawApproval::into_approval).transpose()
  }

  async fn list_approvals(&self, query: &ApprovalQuery) -> Result<Vec<Approval>> {
    let status_str  = query.status.map(encode_status);
    let visitor_str = query.visitor_id.map(encode_uuid);

    let raws: Vec<RawApproval> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {APPROVAL_COLUMNS} FROM approvals
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR visitor_id = ?2)
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![status_str, visitor_str],
            RawApproval::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApproval::into_approval).collect()
  }

  async fn update_approval(
    &self,
    next: &Approval,
    expected_version: u64,
  ) -> Result<bool> {
    let id_str       = encode_uuid(next.approval_id);
    let status_str   = encode_status(next.status);
    let in_time_str  = next.in_time.map(encode_dt);
    let out_time_str = next.out_time.map(encode_dt);
    let version      = encode_version(next.version)?;
    let expected     = encode_version(expected_version)?;

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE approvals
           SET status = ?2, in_time = ?3, out_time = ?4, version = ?5
           WHERE approval_id = ?1 AND version = ?6",
          rusqlite::params![
            id_str,
            status_str,
            in_time_str,
            out_time_str,
            version,
            expected,
          ],
        )?)
      })
      .await?;

    Ok(updated == 1)
  }

  async fn occupancy(&self) -> Result<Occupancy> {
    let counts: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM approvals GROUP BY status")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut occupancy = Occupancy::default();
    for (status, n) in counts {
      occupancy.add(decode_status(&status)?, n.unsigned_abs());
    }
    Ok(occupancy)
  }
}
