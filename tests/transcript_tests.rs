// Integration tests for transcript persistence

use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tempfile::TempDir;
use voxscribe::TranscriptSink;

fn new_feed() -> Arc<Mutex<Vec<voxscribe::TranscriptSegment>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_appends_preserve_order_on_disk_and_feed() -> Result<()> {
    let dir = TempDir::new()?;
    let feed = new_feed();
    let mut sink = TranscriptSink::create(dir.path(), Arc::clone(&feed))?;

    sink.append("one")?;
    sink.append("two")?;
    sink.append("three")?;
    let path = sink.close()?;

    let content = fs::read_to_string(path)?;
    assert_eq!(content, "one\ntwo\nthree\n");

    let feed_texts: Vec<String> =
        feed.lock().unwrap().iter().map(|s| s.text.clone()).collect();
    assert_eq!(feed_texts, vec!["one", "two", "three"]);
    Ok(())
}

#[test]
fn test_artifact_name_follows_timestamp_pattern() -> Result<()> {
    let dir = TempDir::new()?;
    let sink = TranscriptSink::create(dir.path(), new_feed())?;

    let name = sink.path().file_name().unwrap().to_string_lossy().to_string();

    // transcription_YYYY-MM-DD_HH-MM-SS.txt
    assert!(name.starts_with("transcription_"), "got {name}");
    assert!(name.ends_with(".txt"));
    let stamp = &name["transcription_".len()..name.len() - ".txt".len()];
    assert_eq!(stamp.len(), 19);
    assert_eq!(&stamp[4..5], "-");
    assert_eq!(&stamp[10..11], "_");
    Ok(())
}

#[test]
fn test_each_line_is_flushed_incrementally() -> Result<()> {
    let dir = TempDir::new()?;
    let mut sink = TranscriptSink::create(dir.path(), new_feed())?;

    sink.append("already safe")?;

    // Readable before close: an aborted session keeps what was written
    let content = fs::read_to_string(sink.path())?;
    assert_eq!(content, "already safe\n");

    sink.close()?;
    Ok(())
}

#[test]
fn test_empty_session_leaves_well_formed_empty_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let sink = TranscriptSink::create(dir.path(), new_feed())?;
    let path = sink.close()?;

    assert!(path.exists());
    assert_eq!(fs::read_to_string(path)?, "");
    Ok(())
}

#[test]
fn test_drop_releases_the_handle_without_losing_content() -> Result<()> {
    let dir = TempDir::new()?;
    let path;
    {
        let mut sink = TranscriptSink::create(dir.path(), new_feed())?;
        path = sink.path().to_path_buf();
        sink.append("written before drop")?;
        // No close(): the Drop guard covers abnormal exit paths
    }

    assert_eq!(fs::read_to_string(path)?, "written before drop\n");
    Ok(())
}
