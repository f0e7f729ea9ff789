//! The on-the-fly pipeline: republish a GitHub repository as an encrypted
//! resource pack whenever the tracked branch advances.
//!
//! One tick polls the latest commit SHA and, when it changed, downloads the
//! tree archive, normalizes and optimizes it, derives the content key and
//! the manifest UUIDs from the pack hash, encrypts, and swaps the result
//! onto the attached listener. Identical content always republishes under
//! identical key and UUIDs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::github::GithubClient;
use crate::keys;
use crate::listener::{PackListener, ServedPack};
use crate::pack::ResourcePack;
use crate::Result;

const UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct OtfConfig {
    pub org: String,
    pub repo: String,
    pub branch: String,
    /// Personal access token, required only for private repositories.
    pub token: Option<String>,
}

#[derive(Default)]
struct OtfState {
    /// Commit SHA of the last successfully published build.
    commit: String,
    current: Option<ServedPack>,
}

pub struct Otf {
    config: OtfConfig,
    client: GithubClient,
    state: Mutex<OtfState>,
    listener: Mutex<Option<Arc<dyn PackListener>>>,
    cancel: CancellationToken,
}

impl Otf {
    pub fn new(config: OtfConfig) -> Arc<Self> {
        let client = GithubClient::new(config.token.clone());
        Self::with_client(config, client)
    }

    /// Build against a custom API client; tests use this to target a local
    /// stand-in for the GitHub API.
    pub fn with_client(config: OtfConfig, client: GithubClient) -> Arc<Self> {
        Arc::new(Self {
            config,
            client,
            state: Mutex::new(OtfState::default()),
            listener: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    fn repo_slug(&self) -> String {
        format!(
            "{}/{}:{}",
            self.config.org, self.config.repo, self.config.branch
        )
    }

    /// Run the first build synchronously, then keep rebuilding on a 10
    /// minute ticker until [`Otf::stop`] is called. A failing first build
    /// aborts startup; later tick failures are logged and the ticker keeps
    /// running. Ticks never overlap.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.tick().await?;

        let otf = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UPDATE_INTERVAL);
            // an interval fires immediately once; that build already ran
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = otf.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = otf.tick().await {
                            error!(repo = %otf.repo_slug(), error = %err, "pack update tick failed");
                        }
                    }
                }
            }
        });
        Ok(())
    }

    /// Stop the background ticker. The currently published pack stays on
    /// the listener.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Attach the listener that serves packs to clients. When a build is
    /// already live it is published immediately.
    pub fn set_listener(&self, listener: Arc<dyn PackListener>) {
        *self.listener.lock().expect("listener lock") = Some(listener);
        self.publish_current();
    }

    pub fn listener(&self) -> Option<Arc<dyn PackListener>> {
        self.listener.lock().expect("listener lock").clone()
    }

    /// The most recently published pack, if any.
    pub fn current_pack(&self) -> Option<ServedPack> {
        self.state.lock().expect("state lock").current.clone()
    }

    fn publish_current(&self) {
        let Some(listener) = self.listener() else {
            return;
        };
        if let Some(pack) = self.current_pack() {
            listener.add_resource_pack(pack);
        }
    }

    /// Run one poll/rebuild cycle immediately. Returns without touching
    /// anything when the remote SHA matches the last published build.
    pub async fn tick(&self) -> Result<()> {
        let commit = self
            .client
            .last_commit(&self.config.org, &self.config.repo, &self.config.branch)
            .await?;

        let (unchanged, first_build) = {
            let state = self.state.lock().expect("state lock");
            (state.commit == commit, state.commit.is_empty())
        };
        if unchanged {
            return Ok(());
        }
        if !first_build {
            info!(repo = %self.repo_slug(), new_commit = %commit, "detected pack update, rebuilding");
        }

        info!(repo = %self.repo_slug(), commit = %commit, "downloading pack");
        let archive = self
            .client
            .download_zipball(&self.config.org, &self.config.repo, &commit)
            .await?;

        info!("loading pack");
        let mut pack = ResourcePack::from_bytes(&archive)?;
        drop(archive);

        pack.delete_file("README.md");
        pack.delete_files_by_prefix(".git"); // .github, .gitignore, ...

        info!("minifying json files");
        pack.minify_json_files()?;

        info!("compressing png files");
        pack.compress_png_files()?;

        let hash = pack.compute_hash();
        let content_key = keys::generate_key_from_seed(&hash);

        info!("regenerating uuids");
        pack.regenerate_uuid(Some(&hash))?;

        info!("encrypting pack");
        pack.encrypt(content_key.as_bytes())?;

        info!("serializing pack");
        let compiled_bytes = pack.to_bytes()?;
        drop(pack);

        // Serve only bytes that load back cleanly.
        let compiled = ResourcePack::from_bytes(&compiled_bytes)?;
        let served = ServedPack::new(compiled.uuid().to_owned(), content_key, compiled_bytes);

        info!(repo = %self.repo_slug(), pack_uuid = %served.uuid(), "pack updated");

        let previous = {
            let mut state = self.state.lock().expect("state lock");
            let previous = state.current.take();
            state.commit = commit;
            state.current = Some(served.clone());
            previous
        };

        if let Some(listener) = self.listener() {
            listener.add_resource_pack(served);
            if let Some(previous) = previous {
                listener.remove_resource_pack(previous.uuid());
            }
        }
        Ok(())
    }
}
