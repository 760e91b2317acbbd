//! Visitor identity records and photo attachments.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Digits a phone number must carry at minimum.
const MIN_PHONE_DIGITS: usize = 10;

// ─── Photos ──────────────────────────────────────────────────────────────────

/// A visitor photo stored on disk; no binary data lives in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
  /// Path relative to the configured `photo_dir`.
  pub path:         String,
  /// SHA-256 hex digest; identical uploads share one file.
  pub content_hash: String,
  pub media_type:   String,
}

/// Raw photo bytes as received from the gateway.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
  pub media_type: String,
  pub data:       Bytes,
}

impl PhotoUpload {
  /// Reject empty, oversized, or non-image uploads.
  pub fn validate(self, max_bytes: usize) -> Result<Self> {
    if !self.media_type.starts_with("image/") {
      return Err(Error::validation(
        "photo",
        format!("expected an image, got {:?}", self.media_type),
      ));
    }
    if self.data.is_empty() {
      return Err(Error::validation("photo", "upload is empty"));
    }
    if self.data.len() > max_bytes {
      return Err(Error::validation(
        "photo",
        format!("{} bytes exceeds the {max_bytes} byte limit", self.data.len()),
      ));
    }
    Ok(self)
  }
}

// ─── Visitor ─────────────────────────────────────────────────────────────────

/// A person's identity, independent of any particular visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
  pub visitor_id: Uuid,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub company:    Option<String>,
  /// The person being visited.
  pub host:       Option<String>,
  pub purpose:    Option<String>,
  /// Identity document presented at the desk, e.g. "Passport X1234567".
  pub id_proof:   Option<String>,
  pub photo:      Option<PhotoRef>,
  pub created_at: DateTime<Utc>,
}

// ─── NewVisitor ──────────────────────────────────────────────────────────────

/// Caller-supplied identity attributes. The store assigns `visitor_id` and
/// `created_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVisitor {
  #[serde(default)]
  pub name:     String,
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub company:  Option<String>,
  pub host:     Option<String>,
  pub purpose:  Option<String>,
  pub id_proof: Option<String>,
}

impl NewVisitor {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  /// Trim every field, drop blank optionals, and check the fields that have
  /// a format.
  pub fn validate(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::validation("name", "must not be blank"));
    }

    let email = normalise(self.email);
    if let Some(email) = &email {
      check_email(email)?;
    }

    let phone = normalise(self.phone);
    if let Some(phone) = &phone {
      check_phone(phone)?;
    }

    Ok(Self {
      name,
      email,
      phone,
      company: normalise(self.company),
      host: normalise(self.host),
      purpose: normalise(self.purpose),
      id_proof: normalise(self.id_proof),
    })
  }

  /// The deduplication key: the lower-cased email, when one was given.
  pub fn identity_key(&self) -> Option<String> {
    self.email.as_deref().map(email_key)
  }
}

/// Case-insensitive form of an email address used for identity matching.
pub fn email_key(email: &str) -> String { email.trim().to_lowercase() }

fn normalise(field: Option<String>) -> Option<String> {
  field
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}

fn check_email(email: &str) -> Result<()> {
  let valid = email
    .split_once('@')
    .is_some_and(|(local, domain)| {
      !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
    });
  if valid && !email.chars().any(char::is_whitespace) {
    Ok(())
  } else {
    Err(Error::validation("email", format!("{email:?} is not an email address")))
  }
}

fn check_phone(phone: &str) -> Result<()> {
  if let Some(c) = phone
    .chars()
    .find(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')')))
  {
    return Err(Error::validation("phone", format!("unexpected character {c:?}")));
  }
  let digits = phone.chars().filter(char::is_ascii_digit).count();
  if digits < MIN_PHONE_DIGITS {
    return Err(Error::validation(
      "phone",
      format!("needs at least {MIN_PHONE_DIGITS} digits"),
    ));
  }
  Ok(())
}
