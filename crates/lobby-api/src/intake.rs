//! Multipart decoding for the two visit-opening endpoints.
//!
//! Both endpoints take the visitor as a JSON string part and an optional
//! photo file part. Older clients use different part names, so each slot
//! accepts two spellings; the first listed wins when both are present.
//!
//! | Slot    | Part names                   |
//! |---------|------------------------------|
//! | visitor | `visitor`, `visitorJsonData` |
//! | photo   | `photo`, `photoFile`         |

use axum::extract::Multipart;
use lobby_core::visitor::{NewVisitor, PhotoUpload};

use crate::error::ApiError;

const VISITOR_PARTS: [&str; 2] = ["visitor", "visitorJsonData"];
const PHOTO_PARTS: [&str; 2] = ["photo", "photoFile"];

/// A decoded visit-opening request.
#[derive(Debug)]
pub struct VisitIntake {
  pub visitor: NewVisitor,
  pub photo:   Option<PhotoUpload>,
}

pub async fn read(mut multipart: Multipart) -> Result<VisitIntake, ApiError> {
  let mut visitor_json: [Option<String>; 2] = [None, None];
  let mut photos: [Option<PhotoUpload>; 2] = [None, None];

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    let name = field.name().unwrap_or_default().to_owned();

    if let Some(slot) = VISITOR_PARTS.iter().position(|p| *p == name) {
      let text = field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      visitor_json[slot] = Some(text);
    } else if let Some(slot) = PHOTO_PARTS.iter().position(|p| *p == name) {
      let media_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();
      let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      // Browsers send an empty file part when no file was chosen.
      if !data.is_empty() {
        photos[slot] = Some(PhotoUpload { media_type, data });
      }
    }
  }

  let [primary, fallback] = visitor_json;
  let json = primary.or(fallback).ok_or_else(|| {
    ApiError::BadRequest("missing `visitor` or `visitorJsonData` part".into())
  })?;
  let visitor: NewVisitor = serde_json::from_str(&json)
    .map_err(|e| ApiError::BadRequest(format!("visitor data: {e}")))?;

  let [primary, fallback] = photos;
  Ok(VisitIntake { visitor, photo: primary.or(fallback) })
}
