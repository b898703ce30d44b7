//! Tests for the job store (use in-memory DB helper from db).

use std::time::Duration;

use uuid::Uuid;

use crate::error::VdqError;
use crate::media::{MediaFormat, NewMediaFormat, NewMediaSource};
use crate::policy::{Policy, PolicyEngine, Requester, Tier};
use crate::store::db::open_memory;
use crate::store::{JobStatus, JobStore, ProgressSnapshot, TerminalOutcome};

fn new_source(url: &str) -> NewMediaSource {
    NewMediaSource {
        canonical_url: url.to_string(),
        provider: "Youtube".to_string(),
        provider_video_id: "abc".to_string(),
        title: "Clip".to_string(),
        channel: "Chan".to_string(),
        thumbnail_url: String::new(),
        duration_secs: Some(60),
        raw_metadata: serde_json::json!({"id": "abc"}),
    }
}

fn new_format(id: &str, height: Option<u32>) -> NewMediaFormat {
    NewMediaFormat {
        format_id: id.to_string(),
        container: "mp4".to_string(),
        quality_label: height.map(|h| format!("{h}p")).unwrap_or_default(),
        width: None,
        height,
        codec_video: "avc1".to_string(),
        codec_audio: "mp4a".to_string(),
        is_audio_only: false,
        is_premium_only: false,
        size_bytes: None,
    }
}

async fn seed(store: &JobStore, height: u32) -> (Uuid, MediaFormat) {
    let src = store
        .get_or_create_source(&new_source("https://www.youtube.com/watch?v=abc"))
        .await
        .unwrap();
    let fmt = store
        .get_or_create_format(src.id, &new_format(&format!("f{height}"), Some(height)))
        .await
        .unwrap();
    (src.id, fmt)
}

fn free() -> (Requester, Policy) {
    let r = Requester::account("u1", Tier::Free);
    let p = PolicyEngine::default().resolve(&r);
    (r, p)
}

fn completed(name: &str) -> TerminalOutcome {
    TerminalOutcome::Completed {
        output_filename: name.to_string(),
    }
}

#[tokio::test]
async fn admit_counts_active_jobs_against_limit() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, policy) = free();

    for _ in 0..5 {
        store.admit_job(&req, &policy, src, &fmt).await.unwrap();
    }
    let err = store.admit_job(&req, &policy, src, &fmt).await.unwrap_err();
    assert!(matches!(err, VdqError::RateLimitExceeded { used: 5, limit: 5 }));
    assert_eq!(store.list_jobs().await.unwrap().len(), 5);

    // Other requesters are unaffected.
    let other = Requester::account("u2", Tier::Free);
    assert!(store.admit_job(&other, &policy, src, &fmt).await.is_ok());
}

#[tokio::test]
async fn denied_format_writes_nothing() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 1080).await;
    let (req, policy) = free();
    let err = store.admit_job(&req, &policy, src, &fmt).await.unwrap_err();
    assert!(matches!(err, VdqError::FormatNotAllowed(_)));
    assert!(store.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn unlimited_requester_is_never_denied() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 2160).await;
    let pro = Requester::account("p", Tier::Pro);
    let policy = PolicyEngine::default().resolve(&pro);
    for _ in 0..20 {
        store.admit_job(&pro, &policy, src, &fmt).await.unwrap();
    }
}

#[tokio::test]
async fn failed_jobs_free_quota_completed_jobs_keep_it() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, policy) = free();

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(store.admit_job(&req, &policy, src, &fmt).await.unwrap());
    }
    store
        .mark_terminal(ids[0], &TerminalOutcome::Failed { reason: "boom".into() })
        .await
        .unwrap();
    store.admit_job(&req, &policy, src, &fmt).await.unwrap();

    store.mark_terminal(ids[1], &completed("a.mp4")).await.unwrap();
    let usage = store.usage_today(&req).await.unwrap();
    assert_eq!(usage.success_count, 1);
    assert_eq!(usage.active_count, 4);
    assert_eq!(usage.downloads_today(), 5);
    assert!(store.admit_job(&req, &policy, src, &fmt).await.is_err());
}

#[tokio::test]
async fn completion_credit_is_idempotent() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, policy) = free();
    let id = store.admit_job(&req, &policy, src, &fmt).await.unwrap();

    assert!(store.mark_terminal(id, &completed("clip.mp4")).await.unwrap());
    assert!(!store.mark_terminal(id, &completed("clip.mp4")).await.unwrap());
    assert!(!store.record_completion_for_quota(&req, id).await.unwrap());
    assert_eq!(store.usage_today(&req).await.unwrap().success_count, 1);

    let other = Uuid::new_v4();
    assert!(store.record_completion_for_quota(&req, other).await.unwrap());
    assert!(!store.record_completion_for_quota(&req, other).await.unwrap());
    assert_eq!(store.usage_today(&req).await.unwrap().success_count, 2);
}

#[tokio::test]
async fn progress_moves_to_downloading_and_never_regresses() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, _) = free();
    let id = store.create_job(&req, src, fmt.id).await.unwrap();

    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());

    let snap = |done: u64, total: Option<u64>| ProgressSnapshot {
        downloaded_bytes: done,
        total_bytes: total,
        speed_kibps: Some(512.0),
        eta_secs: Some(3),
    };

    assert!(store.append_progress(id, &snap(250, Some(1000))).await.unwrap());
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert_eq!(job.progress_percent, 25);
    let started = job.started_at.unwrap();

    // A restarted stream reports fewer bytes: percent holds.
    store.append_progress(id, &snap(100, Some(1000))).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.progress_percent, 25);
    assert_eq!(job.bytes_downloaded, 100);
    assert_eq!(job.started_at, Some(started));

    // Unknown total: percent unchanged, stored total kept.
    store.append_progress(id, &snap(999, None)).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.progress_percent, 99);
    assert_eq!(job.bytes_total, Some(1000));

    // Overshoot is clamped to the total.
    store.append_progress(id, &snap(5000, Some(1000))).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.bytes_downloaded, 1000);
    assert_eq!(job.progress_percent, 100);
    assert!(job.output_filename.is_none());
}

#[tokio::test]
async fn progress_without_any_total_keeps_percent_zero() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let id = store.create_job(&free().0, src, fmt.id).await.unwrap();
    let snap = ProgressSnapshot {
        downloaded_bytes: 4096,
        ..Default::default()
    };
    store.append_progress(id, &snap).await.unwrap();
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert_eq!(job.progress_percent, 0);
    assert_eq!(job.bytes_downloaded, 4096);
}

#[tokio::test]
async fn terminal_states_are_final() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, _) = free();

    // queued -> completed is allowed and sets the filename.
    let id = store.create_job(&req, src, fmt.id).await.unwrap();
    assert!(store.mark_terminal(id, &completed("x.webm")).await.unwrap());
    let job = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert_eq!(job.output_filename.as_deref(), Some("x.webm"));
    assert!(job.completed_at.is_some());

    // No progress or failure after completion.
    let snap = ProgressSnapshot {
        downloaded_bytes: 1,
        total_bytes: Some(2),
        ..Default::default()
    };
    assert!(!store.append_progress(id, &snap).await.unwrap());
    let failed = TerminalOutcome::Failed { reason: "late".into() };
    assert!(!store.mark_terminal(id, &failed).await.unwrap());

    // Failed keeps no filename.
    let id2 = store.create_job(&req, src, fmt.id).await.unwrap();
    assert!(store.mark_terminal(id2, &failed).await.unwrap());
    let job2 = store.get_job(id2).await.unwrap().unwrap();
    assert_eq!(job2.status, JobStatus::Failed);
    assert_eq!(job2.failure_reason.as_deref(), Some("late"));
    assert!(job2.output_filename.is_none());
}

#[tokio::test]
async fn cancel_only_from_queued() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, _) = free();

    let queued = store.create_job(&req, src, fmt.id).await.unwrap();
    assert!(store.cancel_job(queued).await.unwrap());
    assert_eq!(
        store.get_job(queued).await.unwrap().unwrap().status,
        JobStatus::Cancelled
    );
    assert!(!store.mark_terminal(queued, &completed("a.mp4")).await.unwrap());

    let running = store.create_job(&req, src, fmt.id).await.unwrap();
    let snap = ProgressSnapshot {
        downloaded_bytes: 10,
        total_bytes: Some(100),
        ..Default::default()
    };
    store.append_progress(running, &snap).await.unwrap();
    assert!(!store.cancel_job(running).await.unwrap());
    assert_eq!(
        store.get_job(running).await.unwrap().unwrap().status,
        JobStatus::Downloading
    );
}

#[tokio::test]
async fn claim_is_exclusive_and_recoverable() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, _) = free();
    let a = store.create_job(&req, src, fmt.id).await.unwrap();
    let b = store.create_job(&req, src, fmt.id).await.unwrap();

    let first = store.claim_next_queued_job().await.unwrap().unwrap();
    let second = store.claim_next_queued_job().await.unwrap().unwrap();
    assert_ne!(first, second);
    assert!([a, b].contains(&first) && [a, b].contains(&second));
    assert!(store.claim_next_queued_job().await.unwrap().is_none());

    assert_eq!(store.recover_claimed_jobs().await.unwrap(), 2);
    assert!(store.claim_next_queued_job().await.unwrap().is_some());

    store.mark_terminal(first, &completed("a.mp4")).await.unwrap();
    store.mark_terminal(second, &completed("b.mp4")).await.unwrap();
    assert_eq!(store.recover_claimed_jobs().await.unwrap(), 0);
    assert!(store.claim_next_queued_job().await.unwrap().is_none());
}

#[tokio::test]
async fn history_and_remove() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let id = store.create_job(&free().0, src, fmt.id).await.unwrap();

    store.record_attempt(id, 1, false, Some("timeout")).await.unwrap();
    store.record_attempt(id, 2, true, None).await.unwrap();
    let history = store.list_history(Some(id)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].attempt, 2);
    assert!(history[0].success);
    assert_eq!(history[1].reason.as_deref(), Some("timeout"));
    assert_eq!(store.get_job(id).await.unwrap().unwrap().attempts, 2);

    assert!(store.remove_job(id).await.unwrap());
    assert!(store.get_job(id).await.unwrap().is_none());
    assert!(store.list_history(None).await.unwrap().is_empty());
    assert!(!store.remove_job(id).await.unwrap());
}

#[tokio::test]
async fn media_get_or_create_never_overwrites() {
    let store = open_memory().await.unwrap();
    let first = store
        .get_or_create_source(&new_source("https://example.com/v/1"))
        .await
        .unwrap();
    let mut changed = new_source("https://example.com/v/1");
    changed.title = "Renamed".to_string();
    let again = store.get_or_create_source(&changed).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.title, "Clip");
    assert_eq!(again.raw_metadata["id"], "abc");

    let f1 = store
        .get_or_create_format(first.id, &new_format("22", Some(720)))
        .await
        .unwrap();
    let f2 = store
        .get_or_create_format(first.id, &new_format("22", Some(1080)))
        .await
        .unwrap();
    assert_eq!(f1, f2);
    assert_eq!(store.get_format(f1.id).await.unwrap(), Some(f1));
    assert!(store.get_source(Uuid::new_v4()).await.unwrap().is_none());
}

#[test]
fn state_machine_edges() {
    use JobStatus::*;
    assert!(Queued.can_transition(Downloading));
    assert!(Downloading.can_transition(Downloading));
    assert!(Queued.can_transition(Completed));
    assert!(Downloading.can_transition(Failed));
    assert!(Queued.can_transition(Cancelled));
    assert!(!Downloading.can_transition(Cancelled));
    assert!(!Completed.can_transition(Failed));
    assert!(!Failed.can_transition(Queued));
    assert!(!Cancelled.can_transition(Downloading));
    assert_eq!(JobStatus::parse("bogus"), Failed);
}

#[tokio::test]
async fn mark_terminal_follows_state_machine() {
    let store = open_memory().await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, _) = free();

    assert!(!store.mark_terminal(Uuid::new_v4(), &completed("none.mp4")).await.unwrap());

    let id = store.create_job(&req, src, fmt.id).await.unwrap();
    let snap = ProgressSnapshot {
        downloaded_bytes: 10,
        total_bytes: Some(100),
        ..Default::default()
    };
    store.append_progress(id, &snap).await.unwrap();
    assert!(!JobStatus::Downloading.can_transition(JobStatus::Cancelled));
    assert!(!store.mark_terminal(id, &TerminalOutcome::Cancelled).await.unwrap());
    assert!(store.mark_terminal(id, &completed("done.mp4")).await.unwrap());
    assert!(!store.mark_terminal(id, &completed("again.mp4")).await.unwrap());
    assert_eq!(store.usage_today(&req).await.unwrap().success_count, 1);
}

#[tokio::test]
async fn abandoned_write_transaction_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_at(dir.path().join("jobs.db")).await.unwrap();
    let (src, fmt) = seed(&store, 720).await;
    let (req, policy) = free();

    // A writer cancelled while holding the write lock.
    let abandoned = async {
        let mut tx = store.begin_immediate().await?;
        sqlx::query(
            "INSERT INTO usage_counters (requester_key, day, success_count) VALUES ('ghost', '2000-01-01', 1)",
        )
        .execute(&mut *tx)
        .await?;
        std::future::pending::<()>().await;
        Ok::<_, VdqError>(())
    };
    assert!(tokio::time::timeout(Duration::from_millis(50), abandoned)
        .await
        .is_err());

    // The lock is released well before the busy timeout.
    let admitted = tokio::time::timeout(
        Duration::from_secs(5),
        store.admit_job(&req, &policy, src, &fmt),
    )
    .await
    .expect("write lock still held");
    assert!(admitted.is_ok());

    let ghosts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM usage_counters WHERE requester_key = 'ghost'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
    assert_eq!(ghosts, 0);
}
