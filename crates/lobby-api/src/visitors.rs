//! Handlers for `/visitors` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/visitors` | All visitors, insertion order |
//! | `POST`   | `/visitors` | JSON [`NewVisitor`]; 201 + visitor, 409 on duplicate email |
//! | `POST`   | `/visitors/register` | Multipart; 201 + PENDING approval |
//! | `POST`   | `/visitors/preregister` | Same as `/visitors/register` |
//! | `POST`   | `/visitors/checkin` | Multipart walk-in; 201 + CHECKED_IN approval |
//! | `GET`    | `/visitors/:id` | 404 if not found |
//! | `DELETE` | `/visitors/:id` | 204; also deletes the visitor's approvals |
//! | `GET`    | `/visitors/:id/approvals` | The visitor's visits, oldest first |
//! | `GET`    | `/visitors/:id/photo` | Stored photo bytes; 404 if the visitor has none |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::{StatusCode, header},
  response::IntoResponse,
};
use lobby_core::{
  approval::Approval,
  store::{PhotoStore, RecordStore},
  visitor::{NewVisitor, Visitor},
  workflow::Workflow,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{JsonBody, Path},
  intake,
};

// ─── Directory ────────────────────────────────────────────────────────────────

/// `GET /visitors`
pub async fn list<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
) -> Result<Json<Vec<Visitor>>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.directory().list_visitors().await?))
}

/// `POST /visitors` with a JSON [`NewVisitor`] body.
pub async fn create<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  JsonBody(body): JsonBody<NewVisitor>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  let visitor = wf.directory().create_visitor(body, None).await?;
  Ok((StatusCode::CREATED, Json(visitor)))
}

/// `GET /visitors/:id`
pub async fn get_one<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Visitor>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.directory().get_visitor(id).await?))
}

/// `DELETE /visitors/:id`
pub async fn delete_one<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  wf.directory().delete_visitor(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /visitors/:id/approvals`
pub async fn approvals<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Approval>>, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  Ok(Json(wf.visitor_approvals(id).await?))
}

/// `GET /visitors/:id/photo`
pub async fn photo<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  let (photo, data) = wf.visitor_photo(id).await?;
  let etag = format!("\"{}\"", photo.content_hash);
  Ok(([(header::CONTENT_TYPE, photo.media_type), (header::ETAG, etag)], data))
}

// ─── Visit intake ─────────────────────────────────────────────────────────────

/// `POST /visitors/register`: pre-register an expected visitor.
pub async fn register<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  let intake = intake::read(multipart?).await?;
  let approval = wf.pre_register(intake.visitor, intake.photo).await?;
  Ok((StatusCode::CREATED, Json(approval)))
}

/// `POST /visitors/checkin`: check a walk-in visitor straight in.
pub async fn walk_in<S, P>(
  State(wf): State<Arc<Workflow<S, P>>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  P: PhotoStore,
{
  let intake = intake::read(multipart?).await?;
  let approval = wf.immediate_check_in(intake.visitor, intake.photo).await?;
  Ok((StatusCode::CREATED, Json(approval)))
}
