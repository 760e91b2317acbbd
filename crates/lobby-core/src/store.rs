//! The `RecordStore` and `PhotoStore` traits.
//!
//! Storage backends (e.g. `lobby-store-sqlite`) implement these; the
//! [`Directory`](crate::directory::Directory) and
//! [`Workflow`](crate::workflow::Workflow) services are written against the
//! traits only.
//!
//! Backend errors must convert into [`crate::Error`] so the services can tell
//! a duplicate or a busy database apart from a generic failure.

use std::future::Future;

use bytes::Bytes;
use uuid::Uuid;

use crate::{
  approval::{Approval, ApprovalQuery, Occupancy},
  visitor::{NewVisitor, PhotoRef, PhotoUpload, Visitor},
};

/// Durable storage for visitors and approvals.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Visitors ──────────────────────────────────────────────────────────

  /// Persist a new visitor. Fails with a duplicate error if another visitor
  /// already holds the same email (case-insensitive).
  fn add_visitor(
    &self,
    input: NewVisitor,
    photo: Option<PhotoRef>,
  ) -> impl Future<Output = Result<Visitor, Self::Error>> + Send + '_;

  /// Retrieve a visitor by UUID. Returns `None` if not found.
  fn get_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Visitor>, Self::Error>> + Send + '_;

  /// Look a visitor up by email, ignoring case.
  fn find_visitor_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Visitor>, Self::Error>> + Send + 'a;

  /// All visitors in insertion order.
  fn list_visitors(
    &self,
  ) -> impl Future<Output = Result<Vec<Visitor>, Self::Error>> + Send + '_;

  /// Delete a visitor together with all of its approvals.
  ///
  /// Returns `false` if no such visitor existed.
  fn delete_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Approvals ─────────────────────────────────────────────────────────

  /// Persist a freshly created approval. Fails with a not-found error if
  /// `approval.visitor_id` does not exist at insertion time.
  fn add_approval<'a>(
    &'a self,
    approval: &'a Approval,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve an approval by UUID. Returns `None` if not found.
  fn get_approval(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Approval>, Self::Error>> + Send + '_;

  /// Approvals matching `query`, oldest first.
  fn list_approvals<'a>(
    &'a self,
    query: &'a ApprovalQuery,
  ) -> impl Future<Output = Result<Vec<Approval>, Self::Error>> + Send + 'a;

  /// Replace the stored approval with `next` if and only if the stored
  /// version still equals `expected_version`. Status, both timestamps and the
  /// version are written together or not at all.
  ///
  /// Returns `false` when the row is missing or its version has moved on.
  fn update_approval<'a>(
    &'a self,
    next: &'a Approval,
    expected_version: u64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Count approvals per status.
  fn occupancy(
    &self,
  ) -> impl Future<Output = Result<Occupancy, Self::Error>> + Send + '_;
}

/// Opaque storage for photo bytes.
pub trait PhotoStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Store `upload` and return a reference to it. Identical content may be
  /// deduplicated.
  fn put(
    &self,
    upload: PhotoUpload,
  ) -> impl Future<Output = Result<PhotoRef, Self::Error>> + Send + '_;

  /// Read back the bytes behind `photo`. Returns `None` if they are gone.
  fn get<'a>(
    &'a self,
    photo: &'a PhotoRef,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;
}
