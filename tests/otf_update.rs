//! On-the-fly pipeline tests against a local stand-in for the GitHub API.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use bedrockpack::github::GithubClient;
use bedrockpack::otf::{Otf, OtfConfig};
use bedrockpack::{PackError, ResourcePack};
use common::*;

/// Remote repository double: one commit SHA and one zipball at a time.
/// An empty SHA makes the commit listing answer with an empty array.
#[derive(Default)]
struct MockRepo {
    sha: Mutex<String>,
    zip: Mutex<Vec<u8>>,
    downloads: AtomicUsize,
}

impl MockRepo {
    fn set(&self, sha: &str, zip: Vec<u8>) {
        *self.sha.lock().unwrap() = sha.to_owned();
        *self.zip.lock().unwrap() = zip;
    }
}

async fn commits(State(repo): State<Arc<MockRepo>>) -> Json<serde_json::Value> {
    let sha = repo.sha.lock().unwrap().clone();
    if sha.is_empty() {
        Json(serde_json::json!([]))
    } else {
        Json(serde_json::json!([{ "sha": sha }]))
    }
}

async fn zipball(State(repo): State<Arc<MockRepo>>) -> Vec<u8> {
    repo.downloads.fetch_add(1, Ordering::SeqCst);
    repo.zip.lock().unwrap().clone()
}

async fn spawn_mock_github(repo: Arc<MockRepo>) -> std::net::SocketAddr {
    let app = Router::new()
        .route("/repos/:org/:repo/commits", get(commits))
        .route("/repos/:org/:repo/zipball/:sha", get(zipball))
        .with_state(repo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A repository tree archive the way GitHub serves it: everything under a
/// single `org-repo-sha/` directory, with repo housekeeping files present.
fn repo_zip(sha: &str, blocks_json: &str) -> Vec<u8> {
    let manifest = manifest_json();
    let icon = tiny_png();
    let root = format!("acme-pack-{sha}");
    let entries: Vec<(String, &[u8])> = vec![
        (format!("{root}/manifest.json"), manifest.as_bytes()),
        (format!("{root}/pack_icon.png"), icon.as_slice()),
        (format!("{root}/textures/blocks.json"), blocks_json.as_bytes()),
        (format!("{root}/README.md"), b"# readme".as_slice()),
        (format!("{root}/.gitignore"), b"*.bak".as_slice()),
        (format!("{root}/.github/workflows/ci.yml"), b"on: push".as_slice()),
    ];
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, content)| (name.as_str(), *content))
        .collect();
    build_zip(&borrowed)
}

fn otf_against(addr: std::net::SocketAddr) -> Arc<Otf> {
    Otf::with_client(
        OtfConfig {
            org: "acme".into(),
            repo: "pack".into(),
            branch: "main".into(),
            token: None,
        },
        GithubClient::with_base_url(format!("http://{addr}"), None),
    )
}

#[tokio::test]
async fn first_build_publishes_and_unchanged_ticks_do_nothing() {
    let repo = Arc::new(MockRepo::default());
    repo.set("abc123", repo_zip("abc123", BLOCKS_JSON));
    let addr = spawn_mock_github(Arc::clone(&repo)).await;

    let otf = otf_against(addr);
    let listener = Arc::new(RecordingListener::default());
    otf.set_listener(listener.clone());

    otf.start().await.unwrap();
    assert_eq!(repo.downloads.load(Ordering::SeqCst), 1);

    let events = listener.events();
    assert_eq!(events.len(), 1);
    let ListenerEvent::Added { uuid: first_uuid, key } = &events[0] else {
        panic!("expected an add, got {events:?}");
    };
    assert_eq!(key.len(), 32);

    // the remote did not move: no download, no listener traffic
    otf.tick().await.unwrap();
    assert_eq!(repo.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(listener.events().len(), 1);

    // the published pack is encrypted, pruned, minified and decryptable
    let served = listener.last_added();
    assert_eq!(served.uuid(), first_uuid.as_str());
    let mut pack = ResourcePack::from_bytes(served.data()).unwrap();
    assert!(pack.is_encrypted());
    assert!(pack.file("README.md").is_none());
    assert!(pack.file(".gitignore").is_none());
    assert!(pack.file(".github/workflows/ci.yml").is_none());

    pack.decrypt(served.content_key().as_bytes()).unwrap();
    assert_eq!(
        pack.file("textures/blocks.json").unwrap(),
        BLOCKS_JSON_MINIFIED.as_bytes()
    );

    otf.stop();
}

#[tokio::test]
async fn remote_update_swaps_add_then_remove() {
    let repo = Arc::new(MockRepo::default());
    repo.set("abc123", repo_zip("abc123", BLOCKS_JSON));
    let addr = spawn_mock_github(Arc::clone(&repo)).await;

    let otf = otf_against(addr);
    let listener = Arc::new(RecordingListener::default());
    otf.set_listener(listener.clone());

    otf.tick().await.unwrap();
    let first = listener.last_added();

    repo.set(
        "def456",
        repo_zip("def456", "{\"stone\": {\"sound\": \"grass\"}}"),
    );
    otf.tick().await.unwrap();
    assert_eq!(repo.downloads.load(Ordering::SeqCst), 2);

    let events = listener.events();
    assert_eq!(events.len(), 3);
    let second = listener.last_added();
    assert_ne!(second.uuid(), first.uuid());
    assert_eq!(
        events[1],
        ListenerEvent::Added {
            uuid: second.uuid().to_owned(),
            key: second.content_key().to_owned(),
        }
    );
    // the previous pack goes away only after the new one is live
    assert_eq!(
        events[2],
        ListenerEvent::Removed {
            uuid: first.uuid().to_owned(),
        }
    );

    assert_eq!(otf.current_pack().unwrap().uuid(), second.uuid());
}

#[tokio::test]
async fn identical_content_rebuilds_deterministically() {
    let repo = Arc::new(MockRepo::default());
    repo.set("abc123", repo_zip("abc123", BLOCKS_JSON));
    let addr = spawn_mock_github(Arc::clone(&repo)).await;

    let a = otf_against(addr);
    a.tick().await.unwrap();
    let b = otf_against(addr);
    b.tick().await.unwrap();

    // Per-file keys are random, so the archives differ byte for byte; the
    // published identity and pack key are content-addressed and must not.
    let pack_a = a.current_pack().unwrap();
    let pack_b = b.current_pack().unwrap();
    assert_eq!(pack_a.uuid(), pack_b.uuid());
    assert_eq!(pack_a.content_key(), pack_b.content_key());
}

#[tokio::test]
async fn start_fails_when_the_commit_listing_is_empty() {
    let repo = Arc::new(MockRepo::default());
    let addr = spawn_mock_github(Arc::clone(&repo)).await;

    let otf = otf_against(addr);
    assert!(matches!(
        otf.start().await,
        Err(PackError::RemoteApi(_))
    ));
    assert!(otf.current_pack().is_none());
}

#[tokio::test]
async fn commit_listing_maps_status_errors_to_remote_api() {
    let repo = Arc::new(MockRepo::default());
    repo.set("abc123", repo_zip("abc123", BLOCKS_JSON));
    let addr = spawn_mock_github(Arc::clone(&repo)).await;

    // wrong base path: everything answers 404
    let client = GithubClient::with_base_url(format!("http://{addr}/missing"), None);
    assert!(matches!(
        client.last_commit("acme", "pack", "main").await,
        Err(PackError::RemoteApi(_))
    ));
    assert!(matches!(
        client.download_zipball("acme", "pack", "abc123").await,
        Err(PackError::RemoteApi(_))
    ));
}
