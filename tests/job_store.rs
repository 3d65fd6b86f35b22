use std::sync::Arc;
use std::time::Duration;

use file_converter::job_store::{JobId, JobStore, DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL};
use file_converter::SourceFile;

fn upload(name: &str) -> SourceFile {
    SourceFile {
        url: format!("https://files.example/{name}"),
        name: Some(name.to_string()),
        size: 1024,
        content_type: None,
    }
}

#[tokio::test]
async fn job_is_consumed_exactly_once() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let id = store.create(upload("photo.jpg"), "jpg".into());

    let job = store.consume(&id).expect("first consume returns the job");
    assert_eq!(job.id, id);
    assert_eq!(job.source_ext, "jpg");
    assert_eq!(job.source.name.as_deref(), Some("photo.jpg"));

    assert!(store.consume(&id).is_none(), "second consume must find nothing");
    assert!(!store.contains(&id));
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let id: JobId = "6f1c1f5e-6c1e-4a43-9a3e-7b7f0c6d2a11".parse().unwrap();
    assert!(store.consume(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn consume_after_ttl_finds_nothing_even_before_sweep() {
    // Sweep interval far beyond the test so only the consume-side check applies.
    let store = JobStore::new(Duration::from_secs(15 * 60), Duration::from_secs(24 * 3600));
    let id = store.create(upload("notes.md"), "md".into());

    tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;

    assert!(store.contains(&id), "not swept yet");
    assert!(store.consume(&id).is_none(), "expired job must not resolve");
    assert!(!store.contains(&id), "expired job is dropped on lookup");
}

#[tokio::test(start_paused = true)]
async fn job_within_ttl_is_still_consumable() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let id = store.create(upload("notes.md"), "md".into());

    tokio::time::sleep(Duration::from_secs(14 * 60)).await;

    assert!(store.consume(&id).is_some());
}

#[tokio::test(start_paused = true)]
async fn background_sweep_removes_abandoned_jobs() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let old = store.create(upload("old.png"), "png".into());

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    let fresh = store.create(upload("fresh.png"), "png".into());

    // The tick at minute 16 is the first to see `old` past its TTL.
    tokio::time::sleep(Duration::from_secs(6 * 60 + 30)).await;

    assert!(!store.contains(&old), "sweep should have removed the old job");
    assert!(store.contains(&fresh), "fresh job must survive the sweep");
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_sweep_reports_removed_count() {
    let store = JobStore::new(Duration::from_secs(60), Duration::from_secs(24 * 3600));
    store.create(upload("a.txt"), "txt".into());
    store.create(upload("b.txt"), "txt".into());
    tokio::time::advance(Duration::from_secs(61)).await;
    store.create(upload("c.txt"), "txt".into());

    assert_eq!(store.sweep_expired(), 2);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn remove_is_idempotent() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let id = store.create(upload("a.pdf"), "pdf".into());
    assert!(store.remove(&id));
    assert!(!store.remove(&id));
    assert!(store.consume(&id).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_never_share_a_job() {
    let store = Arc::new(JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL));
    let ids: Vec<_> = (0..50)
        .map(|i| store.create(upload(&format!("f{i}.png")), "png".into()))
        .collect();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let ids = ids.clone();
        handles.push(tokio::spawn(async move {
            let mut won = 0usize;
            for id in &ids {
                if store.consume(id).is_some() {
                    won += 1;
                }
                store.sweep_expired();
            }
            won
        }));
    }

    let total: usize = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("consumer task panicked"))
        .sum();
    assert_eq!(total, ids.len(), "each job handed out exactly once");
    assert!(store.is_empty());
}

#[tokio::test]
async fn shutdown_stops_sweeper_but_keeps_jobs() {
    let store = JobStore::new(DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL);
    let id = store.create(upload("a.md"), "md".into());
    store.shutdown();
    store.shutdown();
    assert!(store.consume(&id).is_some());
}
