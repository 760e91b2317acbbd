//! Integration tests for `SqliteStore`, `PhotoDir`, and the workflow running
//! on top of them against an in-memory database.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use lobby_core::{
  ErrorKind,
  approval::{Approval, ApprovalQuery, ApprovalStatus},
  store::{PhotoStore, RecordStore},
  visitor::{NewVisitor, PhotoUpload},
  workflow::Workflow,
};
use tempfile::TempDir;
use uuid::Uuid;

use crate::{PhotoDir, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn workflow() -> (Arc<Workflow<SqliteStore, PhotoDir>>, TempDir) {
  let dir = TempDir::new().expect("temp dir");
  let photos = PhotoDir::open(dir.path()).await.expect("photo dir");
  let wf = Workflow::new(Arc::new(store().await), Arc::new(photos));
  (Arc::new(wf), dir)
}

fn visitor(name: &str, email: &str) -> NewVisitor {
  NewVisitor {
    email: Some(email.into()),
    host: Some("Front desk".into()),
    purpose: Some("Interview".into()),
    ..NewVisitor::named(name)
  }
}

fn png(data: &'static [u8]) -> PhotoUpload {
  PhotoUpload { media_type: "image/png".into(), data: Bytes::from_static(data) }
}

// ─── Visitors ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_visitor() {
  let s = store().await;

  let added = s
    .add_visitor(visitor("Alice", "alice@example.com"), None)
    .await
    .unwrap();
  assert_eq!(added.name, "Alice");

  let fetched = s.get_visitor(added.visitor_id).await.unwrap().unwrap();
  assert_eq!(fetched, added);
}

#[tokio::test]
async fn get_visitor_missing_returns_none() {
  let s = store().await;
  assert!(s.get_visitor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_visitors_in_insertion_order() {
  let s = store().await;
  for name in ["Carol", "Alice", "Bob"] {
    s.add_visitor(NewVisitor::named(name), None).await.unwrap();
  }

  let names: Vec<_> = s
    .list_visitors()
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.name)
    .collect();
  assert_eq!(names, ["Carol", "Alice", "Bob"]);
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
  let s = store().await;
  s.add_visitor(visitor("Alice", "alice@example.com"), None)
    .await
    .unwrap();

  let err = s
    .add_visitor(visitor("Alice L.", "ALICE@example.com"), None)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateEmail(_)));
  assert_eq!(s.list_visitors().await.unwrap().len(), 1);
}

#[tokio::test]
async fn visitors_without_email_never_collide() {
  let s = store().await;
  s.add_visitor(NewVisitor::named("Anon"), None).await.unwrap();
  s.add_visitor(NewVisitor::named("Anon"), None).await.unwrap();
  assert_eq!(s.list_visitors().await.unwrap().len(), 2);
}

#[tokio::test]
async fn find_visitor_by_email_ignores_case() {
  let s = store().await;
  let alice = s
    .add_visitor(visitor("Alice", "Alice@Example.com"), None)
    .await
    .unwrap();

  let found = s.find_visitor_by_email("alice@EXAMPLE.com").await.unwrap();
  assert_eq!(found.map(|v| v.visitor_id), Some(alice.visitor_id));
  assert!(s.find_visitor_by_email("bob@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_visitor_cascades_to_approvals() {
  let s = store().await;
  let alice = s.add_visitor(NewVisitor::named("Alice"), None).await.unwrap();
  let approval = Approval::pending(alice.visitor_id, chrono::Utc::now());
  s.add_approval(&approval).await.unwrap();

  assert!(s.delete_visitor(alice.visitor_id).await.unwrap());
  assert!(s.get_visitor(alice.visitor_id).await.unwrap().is_none());
  assert!(s.get_approval(approval.approval_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_missing_visitor_returns_false() {
  let s = store().await;
  assert!(!s.delete_visitor(Uuid::new_v4()).await.unwrap());
}

// ─── Approvals ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_approval_for_unknown_visitor_errors() {
  let s = store().await;
  let orphan = Approval::pending(Uuid::new_v4(), chrono::Utc::now());

  let err = s.add_approval(&orphan).await.unwrap_err();
  assert!(matches!(err, crate::Error::VisitorNotFound(id) if id == orphan.visitor_id));
  assert!(s.get_approval(orphan.approval_id).await.unwrap().is_none());
}

#[tokio::test]
async fn approval_roundtrip_preserves_timestamps() {
  let s = store().await;
  let bob = s.add_visitor(NewVisitor::named("Bob"), None).await.unwrap();
  let approval = Approval::walk_in(bob.visitor_id, chrono::Utc::now());
  s.add_approval(&approval).await.unwrap();

  let fetched = s.get_approval(approval.approval_id).await.unwrap().unwrap();
  assert_eq!(fetched, approval);
}

#[tokio::test]
async fn update_approval_requires_matching_version() {
  let s = store().await;
  let bob = s.add_visitor(NewVisitor::named("Bob"), None).await.unwrap();
  let approval = Approval::pending(bob.visitor_id, chrono::Utc::now());
  s.add_approval(&approval).await.unwrap();

  let checked_in = approval.check_in(chrono::Utc::now()).unwrap();
  assert!(s.update_approval(&checked_in, 0).await.unwrap());

  // A second writer still holding version 0 must lose.
  let stale = approval.check_in(chrono::Utc::now()).unwrap();
  assert!(!s.update_approval(&stale, 0).await.unwrap());

  let stored = s.get_approval(approval.approval_id).await.unwrap().unwrap();
  assert_eq!(stored, checked_in);
}

#[tokio::test]
async fn list_approvals_filters_by_status_and_visitor() {
  let s = store().await;
  let alice = s.add_visitor(NewVisitor::named("Alice"), None).await.unwrap();
  let bob = s.add_visitor(NewVisitor::named("Bob"), None).await.unwrap();
  let now = chrono::Utc::now();

  s.add_approval(&Approval::pending(alice.visitor_id, now)).await.unwrap();
  s.add_approval(&Approval::walk_in(alice.visitor_id, now)).await.unwrap();
  s.add_approval(&Approval::pending(bob.visitor_id, now)).await.unwrap();

  let all = s.list_approvals(&ApprovalQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let pending = s
    .list_approvals(&ApprovalQuery {
      status: Some(ApprovalStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.len(), 2);

  let alice_pending = s
    .list_approvals(&ApprovalQuery {
      status:     Some(ApprovalStatus::Pending),
      visitor_id: Some(alice.visitor_id),
    })
    .await
    .unwrap();
  assert_eq!(alice_pending.len(), 1);
  assert_eq!(alice_pending[0].visitor_id, alice.visitor_id);
}

#[tokio::test]
async fn occupancy_counts_each_status() {
  let s = store().await;
  let v = s.add_visitor(NewVisitor::named("Dana"), None).await.unwrap();
  let now = chrono::Utc::now();

  s.add_approval(&Approval::pending(v.visitor_id, now)).await.unwrap();
  s.add_approval(&Approval::walk_in(v.visitor_id, now)).await.unwrap();
  let done = Approval::walk_in(v.visitor_id, now).check_out(now).unwrap();
  s.add_approval(&done).await.unwrap();

  let occ = s.occupancy().await.unwrap();
  assert_eq!((occ.pending, occ.checked_in, occ.checked_out), (1, 1, 1));
}

// ─── Photos ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn photo_dir_deduplicates_by_content() {
  let dir = TempDir::new().unwrap();
  let photos = PhotoDir::open(dir.path()).await.unwrap();

  let a = photos.put(png(b"same-bytes")).await.unwrap();
  let b = photos.put(png(b"same-bytes")).await.unwrap();
  let c = photos.put(png(b"other-bytes")).await.unwrap();

  assert_eq!(a, b);
  assert_ne!(a.content_hash, c.content_hash);
  assert!(a.path.ends_with(".png"));

  let stored = tokio::fs::read(photos.resolve(&a)).await.unwrap();
  assert_eq!(stored, b"same-bytes");
}

#[tokio::test]
async fn photo_dir_reads_back_stored_bytes() {
  let dir = TempDir::new().unwrap();
  let photos = PhotoDir::open(dir.path()).await.unwrap();

  let stored = photos.put(png(b"\x89PNG-face")).await.unwrap();
  let data = photos.get(&stored).await.unwrap().expect("photo bytes");
  assert_eq!(&data[..], b"\x89PNG-face");

  tokio::fs::remove_file(photos.resolve(&stored)).await.unwrap();
  assert!(photos.get(&stored).await.unwrap().is_none());
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pre_register_then_check_in_then_check_out() {
  let (wf, _dir) = workflow().await;

  let registered = wf
    .pre_register(NewVisitor::named("Alice"), None)
    .await
    .unwrap();
  assert_eq!(registered.status, ApprovalStatus::Pending);
  assert_eq!(registered.in_time, None);

  let checked_in = wf.check_in(registered.approval_id).await.unwrap();
  assert_eq!(checked_in.status, ApprovalStatus::CheckedIn);
  let t1 = checked_in.in_time.unwrap();

  let checked_out = wf.check_out(registered.approval_id).await.unwrap();
  assert_eq!(checked_out.status, ApprovalStatus::CheckedOut);
  assert_eq!(checked_out.in_time, Some(t1));
  assert!(checked_out.out_time.unwrap() >= t1);

  let stored = wf.get_approval(registered.approval_id).await.unwrap();
  assert_eq!(stored, checked_out);
}

#[tokio::test]
async fn immediate_check_in_skips_pending() {
  let (wf, _dir) = workflow().await;

  let approval = wf
    .immediate_check_in(NewVisitor::named("Bob"), None)
    .await
    .unwrap();
  assert_eq!(approval.status, ApprovalStatus::CheckedIn);
  assert!(approval.in_time.is_some());

  let pending = wf
    .list_approvals(&ApprovalQuery {
      status: Some(ApprovalStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(pending.is_empty());
}

#[tokio::test]
async fn check_out_before_check_in_leaves_state_unchanged() {
  let (wf, _dir) = workflow().await;
  let approval = wf.pre_register(NewVisitor::named("Eve"), None).await.unwrap();

  let err = wf.check_out(approval.approval_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);

  let stored = wf.get_approval(approval.approval_id).await.unwrap();
  assert_eq!(stored, approval);
}

#[tokio::test]
async fn second_check_in_is_rejected() {
  let (wf, _dir) = workflow().await;
  let approval = wf.pre_register(NewVisitor::named("Frank"), None).await.unwrap();

  let first = wf.check_in(approval.approval_id).await.unwrap();
  let err = wf.check_in(approval.approval_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);

  let stored = wf.get_approval(approval.approval_id).await.unwrap();
  assert_eq!(stored, first);
  assert_eq!(stored.status, ApprovalStatus::CheckedIn);
}

#[tokio::test]
async fn transitions_on_unknown_approval_are_not_found() {
  let (wf, _dir) = workflow().await;
  let id = Uuid::new_v4();
  assert_eq!(wf.check_in(id).await.unwrap_err().kind(), ErrorKind::NotFound);
  assert_eq!(wf.check_out(id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_have_exactly_one_winner() {
  let (wf, _dir) = workflow().await;
  let approval = wf.pre_register(NewVisitor::named("Grace"), None).await.unwrap();

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let wf = Arc::clone(&wf);
      let id = approval.approval_id;
      tokio::spawn(async move { wf.check_in(id).await })
    })
    .collect();

  let mut winners = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => winners += 1,
      Err(e) => assert!(
        matches!(e.kind(), ErrorKind::InvalidTransition | ErrorKind::Contention),
        "unexpected error: {e}"
      ),
    }
  }
  assert_eq!(winners, 1);

  let stored = wf.get_approval(approval.approval_id).await.unwrap();
  assert_eq!(stored.status, ApprovalStatus::CheckedIn);
  assert_eq!(stored.version, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_outs_have_exactly_one_winner() {
  let (wf, _dir) = workflow().await;
  let approval = wf
    .immediate_check_in(NewVisitor::named("Heidi"), None)
    .await
    .unwrap();

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let wf = Arc::clone(&wf);
      let id = approval.approval_id;
      tokio::spawn(async move { wf.check_out(id).await })
    })
    .collect();

  let mut winners = 0;
  for handle in handles {
    if handle.await.unwrap().is_ok() {
      winners += 1;
    }
  }
  assert_eq!(winners, 1);
}

#[tokio::test]
async fn registering_the_same_email_reuses_the_visitor() {
  let (wf, _dir) = workflow().await;

  let first = wf
    .pre_register(visitor("Ivan", "ivan@example.com"), None)
    .await
    .unwrap();
  let second = wf
    .immediate_check_in(visitor("Ivan P.", "IVAN@example.com"), None)
    .await
    .unwrap();

  assert_eq!(first.visitor_id, second.visitor_id);
  assert_ne!(first.approval_id, second.approval_id);
  assert_eq!(wf.directory().list_visitors().await.unwrap().len(), 1);

  let visits = wf.visitor_approvals(first.visitor_id).await.unwrap();
  assert_eq!(visits.len(), 2);
}

#[tokio::test]
async fn create_visitor_never_overwrites_by_email() {
  let (wf, _dir) = workflow().await;
  let dir = wf.directory();

  dir.create_visitor(visitor("Judy", "judy@example.com"), None)
    .await
    .unwrap();
  let err = dir
    .create_visitor(visitor("Someone Else", "judy@example.com"), None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let all = dir.list_visitors().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].name, "Judy");
}

#[tokio::test]
async fn invalid_input_creates_nothing() {
  let (wf, _dir) = workflow().await;

  let err = wf
    .pre_register(NewVisitor::named("  "), None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = wf
    .immediate_check_in(NewVisitor::named("Ken"), Some(PhotoUpload {
      media_type: "application/pdf".into(),
      data:       Bytes::from_static(b"%PDF"),
    }))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  assert!(wf.directory().list_visitors().await.unwrap().is_empty());
  assert!(wf.list_approvals(&ApprovalQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn photo_is_stored_and_referenced_on_new_visitors() {
  let (wf, dir) = workflow().await;

  let approval = wf
    .pre_register(visitor("Liz", "liz@example.com"), Some(png(b"liz-face")))
    .await
    .unwrap();
  let liz = wf.directory().get_visitor(approval.visitor_id).await.unwrap();
  let photo = liz.photo.expect("photo reference");
  assert_eq!(photo.media_type, "image/png");
  assert!(dir.path().join(&photo.path).exists());

  // A returning visitor keeps the original record, photo included.
  let again = wf
    .pre_register(visitor("Liz", "liz@example.com"), Some(png(b"new-face")))
    .await
    .unwrap();
  let liz_again = wf.directory().get_visitor(again.visitor_id).await.unwrap();
  assert_eq!(liz_again.photo.map(|p| p.content_hash), Some(photo.content_hash));
}

#[tokio::test]
async fn visitor_photo_is_served_with_its_media_type() {
  let (wf, _dir) = workflow().await;

  let approval = wf
    .immediate_check_in(
      NewVisitor::named("Quinn"),
      Some(PhotoUpload {
        media_type: "image/jpeg".into(),
        data:       Bytes::from_static(b"\xFF\xD8quinn"),
      }),
    )
    .await
    .unwrap();

  let (photo, data) = wf.visitor_photo(approval.visitor_id).await.unwrap();
  assert_eq!(photo.media_type, "image/jpeg");
  assert_eq!(&data[..], b"\xFF\xD8quinn");
}

#[tokio::test]
async fn visitor_without_photo_has_nothing_to_serve() {
  let (wf, _dir) = workflow().await;
  let approval = wf.pre_register(NewVisitor::named("Rae"), None).await.unwrap();

  let err = wf.visitor_photo(approval.visitor_id).await.unwrap_err();
  assert!(matches!(err, lobby_core::Error::PhotoNotFound(_)));
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = wf.visitor_photo(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, lobby_core::Error::VisitorNotFound(_)));
}

#[tokio::test]
async fn oversized_photo_is_rejected() {
  let (wf, _dir) = workflow().await;
  let wf = Arc::try_unwrap(wf)
    .ok()
    .expect("sole owner")
    .with_max_photo_bytes(4);

  let err = wf
    .pre_register(NewVisitor::named("Mo"), Some(png(b"too many bytes")))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn deleting_a_visitor_removes_its_visits() {
  let (wf, _dir) = workflow().await;
  let approval = wf
    .immediate_check_in(NewVisitor::named("Nina"), None)
    .await
    .unwrap();

  wf.directory().delete_visitor(approval.visitor_id).await.unwrap();

  let err = wf.get_approval(approval.approval_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  let err = wf.check_out(approval.approval_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn deleting_an_unknown_visitor_is_not_found() {
  let (wf, _dir) = workflow().await;
  let err = wf.directory().delete_visitor(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn occupancy_tracks_the_lifecycle() {
  let (wf, _dir) = workflow().await;
  let a = wf.pre_register(NewVisitor::named("Oscar"), None).await.unwrap();
  wf.immediate_check_in(NewVisitor::named("Pat"), None).await.unwrap();
  wf.check_in(a.approval_id).await.unwrap();
  wf.check_out(a.approval_id).await.unwrap();

  let occ = wf.occupancy().await.unwrap();
  assert_eq!((occ.pending, occ.checked_in, occ.checked_out), (0, 1, 1));
}

// ─── Lock contention ─────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_blocked_by_another_connection_report_contention() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("lobby.db");
  let store = SqliteStore::open_with_timeout(&path, Duration::from_millis(50))
    .await
    .unwrap();
  let photos = PhotoDir::open(dir.path().join("photos")).await.unwrap();
  let wf = Workflow::new(Arc::new(store.clone()), Arc::new(photos));
  let approval = wf.pre_register(NewVisitor::named("Sam"), None).await.unwrap();

  // A second connection takes the write lock and keeps it.
  let holder = rusqlite::Connection::open(&path).unwrap();
  holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

  let err = store
    .add_visitor(NewVisitor::named("Tess"), None)
    .await
    .unwrap_err();
  assert!(err.is_busy(), "unexpected error: {err}");
  let err = lobby_core::Error::from(err);
  assert_eq!(err.kind(), ErrorKind::Contention);
  assert!(err.is_retryable());

  let err = wf.check_in(approval.approval_id).await.unwrap_err();
  assert!(matches!(err, lobby_core::Error::StoreBusy));

  // Once the lock is released the same transition goes through.
  holder.execute_batch("ROLLBACK;").unwrap();
  let checked_in = wf.check_in(approval.approval_id).await.unwrap();
  assert_eq!(checked_in.status, ApprovalStatus::CheckedIn);
}
