//! JSON REST API for Lobby.
//!
//! Exposes an axum [`Router`] backed by a [`Workflow`] over any
//! [`RecordStore`] and [`PhotoStore`]. TLS, CORS, timeouts and other transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lobby_api::api_router(workflow.clone()))
//! ```

pub mod approvals;
pub mod error;
pub mod extract;
pub mod intake;
pub mod visitors;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use lobby_core::{
  store::{PhotoStore, RecordStore},
  workflow::Workflow,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `workflow`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P>(workflow: Arc<Workflow<S, P>>) -> Router<()>
where
  S: RecordStore + 'static,
  P: PhotoStore + 'static,
{
  Router::new()
    // Directory
    .route("/visitors", get(visitors::list::<S, P>).post(visitors::create::<S, P>))
    .route(
      "/visitors/{id}",
      get(visitors::get_one::<S, P>).delete(visitors::delete_one::<S, P>),
    )
    .route("/visitors/{id}/approvals", get(visitors::approvals::<S, P>))
    .route("/visitors/{id}/photo", get(visitors::photo::<S, P>))
    // Visit intake
    .route("/visitors/register", post(visitors::register::<S, P>))
    .route("/visitors/preregister", post(visitors::register::<S, P>))
    .route("/visitors/checkin", post(visitors::walk_in::<S, P>))
    // Transitions, keyed by approval id
    .route("/visitors/{id}/checkin", patch(approvals::check_in::<S, P>))
    .route("/visitors/{id}/checkout", patch(approvals::check_out::<S, P>))
    // Approval queries
    .route("/approvals", get(approvals::list::<S, P>))
    .route("/approvals/{id}", get(approvals::get_one::<S, P>))
    .route("/occupancy", get(approvals::occupancy::<S, P>))
    .with_state(workflow)
}
