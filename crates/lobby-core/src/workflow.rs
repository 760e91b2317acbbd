//! The approval workflow engine.
//!
//! [`Workflow`] is the single entry point for the visit lifecycle. It resolves
//! visitors through the [`Directory`], drives [`Approval`] records through the
//! state machine, and persists each transition with a version-guarded write so
//! that concurrent requests against the same approval cannot both succeed.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  approval::{Action, Approval, ApprovalQuery, Occupancy},
  directory::Directory,
  store::{PhotoStore, RecordStore},
  visitor::{NewVisitor, PhotoRef, PhotoUpload, Visitor},
};

/// Default upper bound on an accepted photo upload.
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Read-validate-write rounds before a transition gives up with
/// [`Error::Contention`].
const MAX_ATTEMPTS: u32 = 3;

pub struct Workflow<S, P> {
  directory:       Directory<S>,
  store:           Arc<S>,
  photos:          Arc<P>,
  max_photo_bytes: usize,
}

impl<S, P> Workflow<S, P>
where
  S: RecordStore,
  P: PhotoStore,
{
  pub fn new(store: Arc<S>, photos: Arc<P>) -> Self {
    Self {
      directory: Directory::new(Arc::clone(&store)),
      store,
      photos,
      max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
    }
  }

  pub fn with_max_photo_bytes(mut self, max: usize) -> Self {
    self.max_photo_bytes = max;
    self
  }

  pub fn directory(&self) -> &Directory<S> { &self.directory }

  // ── Entry paths ───────────────────────────────────────────────────────

  /// Register an expected visitor. The new approval starts PENDING.
  pub async fn pre_register(
    &self,
    input: NewVisitor,
    photo: Option<PhotoUpload>,
  ) -> Result<Approval> {
    self.open_visit(input, photo, Approval::pending).await
  }

  /// Register a walk-in. The new approval starts CHECKED_IN.
  pub async fn immediate_check_in(
    &self,
    input: NewVisitor,
    photo: Option<PhotoUpload>,
  ) -> Result<Approval> {
    self.open_visit(input, photo, Approval::walk_in).await
  }

  // ── Transitions ───────────────────────────────────────────────────────

  /// PENDING → CHECKED_IN.
  pub async fn check_in(&self, approval_id: Uuid) -> Result<Approval> {
    self.advance(approval_id, Action::CheckIn).await
  }

  /// CHECKED_IN → CHECKED_OUT.
  pub async fn check_out(&self, approval_id: Uuid) -> Result<Approval> {
    self.advance(approval_id, Action::CheckOut).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_approval(&self, approval_id: Uuid) -> Result<Approval> {
    self
      .store
      .get_approval(approval_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::ApprovalNotFound(approval_id))
  }

  pub async fn list_approvals(&self, query: &ApprovalQuery) -> Result<Vec<Approval>> {
    self.store.list_approvals(query).await.map_err(Into::into)
  }

  /// Every approval of one visitor, oldest first.
  pub async fn visitor_approvals(&self, visitor_id: Uuid) -> Result<Vec<Approval>> {
    self.directory.get_visitor(visitor_id).await?;
    let query = ApprovalQuery { visitor_id: Some(visitor_id), ..Default::default() };
    self.list_approvals(&query).await
  }

  pub async fn occupancy(&self) -> Result<Occupancy> {
    self.store.occupancy().await.map_err(Into::into)
  }

  /// The stored photo of a visitor along with its reference, which carries
  /// the media type.
  pub async fn visitor_photo(&self, visitor_id: Uuid) -> Result<(PhotoRef, Bytes)> {
    let visitor = self.directory.get_visitor(visitor_id).await?;
    let Some(photo) = visitor.photo else {
      return Err(Error::PhotoNotFound(visitor_id));
    };
    match self.photos.get(&photo).await.map_err(Into::<Error>::into)? {
      Some(data) => Ok((photo, data)),
      None => {
        tracing::warn!(%visitor_id, path = %photo.path, "referenced photo is missing");
        Err(Error::PhotoNotFound(visitor_id))
      }
    }
  }

  // ── Internals ─────────────────────────────────────────────────────────

  async fn open_visit(
    &self,
    input: NewVisitor,
    photo: Option<PhotoUpload>,
    open: fn(Uuid, DateTime<Utc>) -> Approval,
  ) -> Result<Approval> {
    let input = input.validate()?;
    let photo = photo
      .map(|p| p.validate(self.max_photo_bytes))
      .transpose()?;

    let visitor = self.resolve_visitor(input, photo).await?;
    let approval = open(visitor.visitor_id, Utc::now());
    self.store.add_approval(&approval).await.map_err(Into::<Error>::into)?;

    tracing::info!(
      approval_id = %approval.approval_id,
      visitor_id = %visitor.visitor_id,
      status = %approval.status,
      "visit opened"
    );
    Ok(approval)
  }

  /// Reuse the visitor registered under the same email, or create one.
  ///
  /// The photo is written only when a new visitor is created, and before the
  /// visitor row exists, so no store lock is held during the transfer.
  async fn resolve_visitor(
    &self,
    input: NewVisitor,
    photo: Option<PhotoUpload>,
  ) -> Result<Visitor> {
    let key = input.identity_key();
    if let Some(key) = &key
      && let Some(existing) = self.directory.find_by_email(key).await?
    {
      tracing::debug!(visitor_id = %existing.visitor_id, "reusing registered visitor");
      return Ok(existing);
    }

    let photo = match photo {
      Some(upload) => Some(self.photos.put(upload).await.map_err(Into::<Error>::into)?),
      None => None,
    };

    match self.directory.create_visitor(input, photo).await {
      // Lost a race with a concurrent registration under the same email.
      Err(Error::DuplicateVisitor(email)) => self
        .directory
        .find_by_email(&email)
        .await?
        .ok_or(Error::DuplicateVisitor(email)),
      other => other,
    }
  }

  /// Apply `action` with optimistic concurrency: re-read and re-validate
  /// whenever the conditional write finds the record already changed.
  async fn advance(&self, approval_id: Uuid, action: Action) -> Result<Approval> {
    for attempt in 1..=MAX_ATTEMPTS {
      let current = self.get_approval(approval_id).await?;
      let next = current.apply(action, Utc::now())?;

      let written = self
        .store
        .update_approval(&next, current.version)
        .await
        .map_err(Into::<Error>::into)?;
      if written {
        tracing::info!(
          approval_id = %approval_id,
          visitor_id = %next.visitor_id,
          status = %next.status,
          "approval transitioned"
        );
        return Ok(next);
      }

      tracing::warn!(
        approval_id = %approval_id,
        attempt,
        "approval changed concurrently; re-reading"
      );
    }
    Err(Error::Contention(approval_id))
  }
}
