//! Handlers for approval transitions and queries.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `PATCH` | `/visitors/:approval_id/checkin` | PENDING → CHECKED_IN |
//! | `PATCH` | `/visitors/:approval_id/checkout` | CHECKED_IN → CHECKED_OUT |
//! | `GET`   | `/approvals` | Optional `?status=PENDING\|CHECKED_IN\|CHECKED_OUT&visitor_id=` |
//! | `GET`   | `/approvals/:id` | 404 if not found |
//! | `GET`   | `/occupancy` | Count per status |

use std::sync::Arc;

use axum::{Json, extract::State};
use lobby_core::{
  approval::{Approval, ApprovalQuery, Occupancy},
  store::{PhotoStore, RecordStore},
  workflow::Workflow,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Path, Query},
};

// ─── Transitions ──────────────────────────────────────────────────────────────

/// `PATCH /visitors/:approval_id/checkin`
pub async fn check_in<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(approval_id): Path<Uuid>,
) -> Result<Json<Approval>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.check_in(approval_id).await?))
}

/// `PATCH /visitors/:approval_id/checkout`
pub async fn check_out<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(approval_id): Path<Uuid>,
) -> Result<Json<Approval>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.check_out(approval_id).await?))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /approvals[?status=<status>][&visitor_id=<id>]`
pub async fn list<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Query(query): Query<ApprovalQuery>,
) -> Result<Json<Vec<Approval>>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.list_approvals(&query).await?))
}

/// `GET /approvals/:id`
pub async fn get_one<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Approval>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.get_approval(id).await?))
}

/// `GET /occupancy`
pub async fn occupancy<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
) -> Result<Json<Occupancy>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.occupancy().await?))
}
