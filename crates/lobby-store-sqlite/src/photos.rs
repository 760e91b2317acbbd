//! [`PhotoDir`]: content-addressed photo storage on the local filesystem.

use std::{io, path::PathBuf};

use bytes::Bytes;

use lobby_core::{
  store::PhotoStore,
  visitor::{PhotoRef, PhotoUpload},
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

/// Stores each photo once, named by the SHA-256 of its bytes.
#[derive(Debug, Clone)]
pub struct PhotoDir {
  root: PathBuf,
}

impl PhotoDir {
  /// Use `root` for photo files, creating it if needed.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  /// Absolute location of a stored photo.
  pub fn resolve(&self, photo: &PhotoRef) -> PathBuf { self.root.join(&photo.path) }
}

impl PhotoStore for PhotoDir {
  type Error = Error;

  async fn put(&self, upload: PhotoUpload) -> Result<PhotoRef> {
    let content_hash = hex::encode(Sha256::digest(&upload.data));
    let file_name = format!("{content_hash}.{}", extension_for(&upload.media_type));
    let path = self.root.join(&file_name);

    if !tokio::fs::try_exists(&path).await? {
      // Write under a unique temporary name, then rename into place so a
      // reader never sees a partial file.
      let tmp = self.root.join(format!(".{file_name}.{}", Uuid::new_v4()));
      tokio::fs::write(&tmp, &upload.data).await?;
      tokio::fs::rename(&tmp, &path).await?;
      tracing::debug!(path = %path.display(), bytes = upload.data.len(), "photo stored");
    }

    Ok(PhotoRef {
      path: file_name,
      content_hash,
      media_type: upload.media_type,
    })
  }

  async fn get(&self, photo: &PhotoRef) -> Result<Option<Bytes>> {
    match tokio::fs::read(self.resolve(photo)).await {
      Ok(data) => Ok(Some(Bytes::from(data))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

fn extension_for(media_type: &str) -> &'static str {
  match media_type {
    "image/jpeg" | "image/jpg" => "jpg",
    "image/png" => "png",
    "image/gif" => "gif",
    "image/webp" => "webp",
    "image/heic" => "heic",
    _ => "img",
  }
}
