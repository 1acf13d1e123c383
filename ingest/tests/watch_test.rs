mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ingest::files::ReplayWatcher;
use ingest::{FileCandidate, IngestConfig, IngestError, MemoryStore, ShutdownPolicy};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::common::{
    pipeline, pipeline_with_decoder, stored_elsewhere, write_garbage, write_replay, FailingStore, SlowDecoder,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn ingests_candidates_until_the_stream_ends() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = FileCandidate::from_path(&write_replay(dir.path(), "first.rep", 1)?)?;
    let second = FileCandidate::from_path(&write_replay(dir.path(), "second.rep", 2)?)?;
    let copy = FileCandidate::from_path(&write_replay(dir.path(), "copy.rep", 1)?)?;
    let known = stored_elsewhere(&write_replay(dir.path(), "known.rep", 3)?)?;
    let known_here = FileCandidate::from_path(&dir.path().join("known.rep"))?;

    let store = Arc::new(MemoryStore::new());
    store.mark_stored(&known).await;

    let (tx, rx) = mpsc::channel(8);
    let (_err_tx, err_rx) = mpsc::channel(8);
    for candidate in [first, second, copy, known_here] {
        tx.send(candidate).await?;
    }
    drop(tx);

    let watch = pipeline(store.clone(), IngestConfig::new(dir.path()).with_watch(true));
    let outcome = timeout(TEST_TIMEOUT, watch.run_watch(rx, err_rx)).await??;

    assert!(!outcome.is_cancelled());
    assert_eq!(outcome.summary().discovered, 4);
    assert_eq!(outcome.summary().skipped_existing, 2);
    assert_eq!(outcome.summary().persisted, 2);
    assert_eq!(store.len().await, 3);
    Ok(())
}

#[tokio::test]
async fn watcher_errors_and_bad_files_are_not_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let good = FileCandidate::from_path(&write_replay(dir.path(), "good.rep", 1)?)?;
    let bad = FileCandidate::from_path(&write_garbage(dir.path(), "bad.rep")?)?;
    let store = Arc::new(MemoryStore::new());

    let (tx, rx) = mpsc::channel(8);
    let (err_tx, err_rx) = mpsc::channel(8);
    err_tx.send(notify::Error::generic("inotify queue overflow")).await?;
    tx.send(bad).await?;
    tx.send(good).await?;
    drop(tx);
    drop(err_tx);

    let watch = pipeline(store.clone(), IngestConfig::new(dir.path()).with_watch(true));
    let outcome = timeout(TEST_TIMEOUT, watch.run_watch(rx, err_rx)).await??;

    assert_eq!(outcome.summary().persisted, 1);
    assert_eq!(outcome.summary().failed.len(), 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_returns_cancelled_after_draining() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let candidate = FileCandidate::from_path(&write_replay(dir.path(), "a.rep", 1)?)?;
    let store = Arc::new(MemoryStore::new());

    let (tx, rx) = mpsc::channel(8);
    let (_err_tx, err_rx) = mpsc::channel(8);
    tx.send(candidate).await?;

    let watch = pipeline(
        store.clone(),
        IngestConfig::new(dir.path())
            .with_watch(true)
            .with_shutdown_policy(ShutdownPolicy::Drain),
    );
    let token = watch.cancellation_token();
    let run = tokio::spawn(async move { watch.run_watch(rx, err_rx).await });

    timeout(TEST_TIMEOUT, async {
        while store.is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("replay was never stored")?;
    token.cancel();

    let outcome = timeout(TEST_TIMEOUT, run).await???;
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.summary().persisted, 1);
    // the sender is still open; cancellation alone ended the run
    drop(tx);
    Ok(())
}

#[tokio::test]
async fn abandon_drops_in_flight_decodes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let candidate = FileCandidate::from_path(&write_replay(dir.path(), "a.rep", 1)?)?;
    let store = Arc::new(MemoryStore::new());
    let decoder = Arc::new(SlowDecoder::new(Duration::from_millis(500)));
    let started = decoder.started.clone();

    let (tx, rx) = mpsc::channel(8);
    let (_err_tx, err_rx) = mpsc::channel(8);
    tx.send(candidate).await?;

    let watch = pipeline_with_decoder(
        store.clone(),
        decoder,
        IngestConfig::new(dir.path())
            .with_watch(true)
            .with_shutdown_policy(ShutdownPolicy::Abandon),
    );
    let token = watch.cancellation_token();
    let run = tokio::spawn(async move { watch.run_watch(rx, err_rx).await });

    timeout(TEST_TIMEOUT, started.notified())
        .await
        .context("decode never started")?;
    token.cancel();

    let outcome = timeout(TEST_TIMEOUT, run).await???;
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.summary().persisted, 0);
    assert_eq!(outcome.summary().parsed, 0);

    // the blocking decode finishes on its own; nothing may be stored after it
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(store.is_empty().await);
    drop(tx);
    Ok(())
}

#[tokio::test]
async fn writer_failure_ends_the_watch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let candidate = FileCandidate::from_path(&write_replay(dir.path(), "a.rep", 1)?)?;

    let (tx, rx) = mpsc::channel(8);
    let (_err_tx, err_rx) = mpsc::channel(8);
    tx.send(candidate).await?;

    let watch = pipeline(Arc::new(FailingStore::default()), IngestConfig::new(dir.path()).with_watch(true));
    let result = timeout(TEST_TIMEOUT, watch.run_watch(rx, err_rx)).await?;

    assert!(matches!(result, Err(IngestError::Storage(_))), "got {:?}", result);
    drop(tx);
    Ok(())
}

#[tokio::test]
async fn filesystem_watcher_reports_new_replays() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let watcher = ReplayWatcher::start(dir.path(), "rep")?;
    let (_guard, mut candidates, _errors) = watcher.split();

    // give the OS watch a moment to register
    tokio::time::sleep(Duration::from_millis(100)).await;
    write_garbage(dir.path(), "notes.txt")?;
    let path = write_replay(dir.path(), "fresh.rep", 4)?;

    let candidate = timeout(TEST_TIMEOUT, candidates.recv())
        .await?
        .context("watcher closed")?;
    assert_eq!(candidate.name, "fresh.rep");
    assert_eq!(candidate.checksum, ingest::files::checksum_file(&path)?);
    Ok(())
}
