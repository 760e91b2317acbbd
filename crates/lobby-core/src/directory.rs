//! The visitor directory: validated access to visitor identity records.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  store::RecordStore,
  visitor::{NewVisitor, PhotoRef, Visitor},
};

/// Owns visitor records. Cloning is cheap; clones share the store.
pub struct Directory<S> {
  store: Arc<S>,
}

impl<S> Clone for Directory<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: RecordStore> Directory<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Validate and persist a new visitor.
  ///
  /// An existing visitor with the same email is never overwritten; the call
  /// fails with [`Error::DuplicateVisitor`] instead.
  pub async fn create_visitor(
    &self,
    input: NewVisitor,
    photo: Option<PhotoRef>,
  ) -> Result<Visitor> {
    let input = input.validate()?;
    let visitor = self
      .store
      .add_visitor(input, photo)
      .await
      .map_err(Into::<Error>::into)?;
    tracing::info!(visitor_id = %visitor.visitor_id, "visitor created");
    Ok(visitor)
  }

  pub async fn get_visitor(&self, id: Uuid) -> Result<Visitor> {
    self
      .store
      .get_visitor(id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::VisitorNotFound(id))
  }

  /// Case-insensitive lookup by email.
  pub async fn find_by_email(&self, email: &str) -> Result<Option<Visitor>> {
    self.store.find_visitor_by_email(email).await.map_err(Into::into)
  }

  /// Snapshot of all visitors in insertion order.
  pub async fn list_visitors(&self) -> Result<Vec<Visitor>> {
    self.store.list_visitors().await.map_err(Into::into)
  }

  /// Delete a visitor and, with it, every approval that references it.
  pub async fn delete_visitor(&self, id: Uuid) -> Result<()> {
    if !self.store.delete_visitor(id).await.map_err(Into::<Error>::into)? {
      return Err(Error::VisitorNotFound(id));
    }
    tracing::info!(visitor_id = %id, "visitor deleted with its approvals");
    Ok(())
  }
}
