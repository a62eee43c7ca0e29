//! End-to-end runs through `TrackerService::from_config`, with page
//! snapshots and a local feed directory standing in for the platforms.

use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use serde_json::json;

use content_tracker::collect::providers::twitter::SEL_TWEET_TEXT;
use content_tracker::config::TrackerConfig;
use content_tracker::model::Platform;
use content_tracker::service::TrackerService;
use content_tracker::track::SourceStatus;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("tracker.toml");
    fs::write(
        &path,
        format!(
            r#"
data_dir = "{}"

[collector]
snapshot_dir = "snapshots"
retry_attempts = 1
retry_backoff_secs = 0

[pacing]
source_delay_secs = 0
item_delay_secs = 0
analyzer_delay_secs = 0

[analyzer]
provider = "mock"
"#,
            dir.display()
        ),
    )
    .unwrap();
    path
}

fn write_snapshots(dir: &Path) {
    let snaps = dir.join("snapshots");
    fs::create_dir_all(snaps.join("youtube")).unwrap();
    fs::create_dir_all(snaps.join("twitter")).unwrap();
    fs::create_dir_all(snaps.join("instagram")).unwrap();

    let recent = (Utc::now() - Duration::hours(2)).to_rfc3339();
    let stale = (Utc::now() - Duration::days(30)).to_rfc3339();
    fs::write(
        snaps.join("youtube").join("chan.xml"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <title>Chan</title>
 <entry>
  <yt:videoId>vid00000001</yt:videoId>
  <title>Weekly roundup</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=vid00000001"/>
  <published>{recent}</published>
  <media:group>
   <media:thumbnail url="https://i.ytimg.com/vi/vid00000001/hqdefault.jpg" width="480" height="360"/>
   <media:description>This week we cover the compiler release and a pile of community news.</media:description>
  </media:group>
 </entry>
 <entry>
  <yt:videoId>vid00000000</yt:videoId>
  <title>Old video</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=vid00000000"/>
  <published>{stale}</published>
 </entry>
</feed>
"#
        ),
    )
    .unwrap();

    let tweet = json!({
        "body_text": "Alice @alice",
        "entries": [{
            "id": "1789",
            "link": "/alice/status/1789",
            "texts": { SEL_TWEET_TEXT: ["Shipping the new release today, thanks to everyone who helped #rust"] },
            "labels": ["12 Likes", "3 Reposts", "1 Reply"]
        }]
    });
    fs::write(snaps.join("twitter").join("alice.json"), tweet.to_string()).unwrap();
    fs::write(
        snaps.join("instagram").join("ghost.json"),
        json!({ "status": "not_found" }).to_string(),
    )
    .unwrap();
}

fn service(dir: &Path) -> TrackerService {
    write_snapshots(dir);
    let cfg = TrackerConfig::load_from_file(&write_config(dir)).unwrap();
    TrackerService::from_config(&cfg).unwrap()
}

#[tokio::test]
async fn snapshot_cycle_processes_every_platform() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.update_source_list(Platform::Youtube, &["@chan"]).unwrap();
    svc.update_source_list(Platform::Twitter, &["alice"]).unwrap();
    svc.update_source_list(Platform::Instagram, &["@ghost"]).unwrap();

    let report = svc.check_now().await.unwrap();
    assert_eq!(report.sources.len(), 3);
    assert_eq!(report.error_count(), 0, "{:?}", report.errors());
    assert_eq!(report.sources_skipped(), 1);
    assert!(matches!(report.sources[2].status, SourceStatus::Skipped(_)));

    // stale video falls outside the recency window
    assert_eq!(report.sources[0].new_items.len(), 1);
    assert_eq!(report.sources[0].new_items[0].item_id, "vid00000001");
    assert_eq!(report.sources[1].new_items[0].item_id, "1789");

    let tweet = svc.get_record("twitter_alice_1789").unwrap();
    assert!(tweet.starts_with("Platform: TWITTER"));
    assert!(tweet.contains("TOPIC AND THEME: Mock topic"));
    assert!(tweet.contains("ORIGINAL CONTENT:\nShipping the new release today"));
    assert!(tweet.contains("Likes: 12"));

    let videos = svc.list_records(Some(Platform::Youtube), 10).unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].platform, Some(Platform::Youtube));

    assert!(tmp.path().join("tracking_log.json").exists());
    assert!(report.report_path.as_ref().unwrap().starts_with(tmp.path().join("tracking_results")));

    let again = svc.check_now().await.unwrap();
    assert_eq!(again.items_processed(), 0);
}

#[tokio::test]
async fn source_lists_round_trip_through_the_service() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());

    let written = svc
        .update_source_list(Platform::Twitter, &["  @alice ", "", "bob"])
        .unwrap();
    assert_eq!(written, vec!["alice", "bob"]);

    let raw = fs::read_to_string(tmp.path().join("handletwitter.txt")).unwrap();
    assert!(raw.starts_with("# Twitter sources to track\n# Updated at "));

    let listed = svc.list_sources(Some(Platform::Twitter)).unwrap();
    let handles: Vec<_> = listed.iter().map(|s| s.handle.as_str()).collect();
    assert_eq!(handles, ["alice", "bob"]);
    assert!(svc.list_sources(Some(Platform::Instagram)).unwrap().is_empty());
}

#[tokio::test]
async fn records_reject_path_traversal() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    assert!(svc.get_record("../tracker").is_err());
    assert!(svc.get_record("twitter_nobody_1").is_err());
    assert!(svc.list_records(None, 10).unwrap().is_empty());
}
