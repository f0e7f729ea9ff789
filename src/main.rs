//! bedrockpack CLI: encrypt or decrypt a pack zip in place, or run the
//! on-the-fly pipeline against a GitHub repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bedrockpack::keys;
use bedrockpack::listener::{PackListener, ServedPack};
use bedrockpack::otf::{Otf, OtfConfig};
use bedrockpack::ResourcePack;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Encrypt, decrypt and continuously rebuild Bedrock-edition resource packs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Decrypt a resource pack in place using its content key")]
    Decrypt {
        /// Path to the resource pack zip
        path: PathBuf,
        /// The 32-byte ASCII content key
        key: String,
    },
    #[command(
        about = "Encrypt a resource pack in place",
        long_about = "Encrypts the resource pack with the given key, or with a freshly \
                      generated one. JSON files are minified, PNG files recompressed and \
                      all manifest UUIDs regenerated first. The key is written next to \
                      the pack as <path>.key.txt."
    )]
    Encrypt {
        /// Path to the resource pack zip
        path: PathBuf,
        /// Optional 32-byte ASCII content key; generated when omitted
        key: Option<String>,
    },
    #[command(
        about = "Continuously rebuild an encrypted pack from a GitHub repository",
        long_about = "Polls the repository every 10 minutes and, whenever the branch \
                      advances, rebuilds, encrypts and republishes the pack into the \
                      output directory as <uuid>.zip plus <uuid>.key.txt. Runs until \
                      interrupted."
    )]
    Serve {
        /// Repository as org/name
        repo: String,
        #[arg(long, default_value = "main")]
        branch: String,
        /// Personal access token for private repositories
        #[arg(long)]
        token: Option<String>,
        /// Directory the live pack is published into
        #[arg(long, default_value = "served-packs")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Decrypt { path, key } => decrypt_command(&path, &key),
        Commands::Encrypt { path, key } => encrypt_command(&path, key),
        Commands::Serve {
            repo,
            branch,
            token,
            out,
        } => serve_command(repo, branch, token, out).await,
    }
}

fn decrypt_command(path: &Path, key: &str) -> anyhow::Result<()> {
    println!("{} {}", "loading".cyan().bold(), path.display());
    let mut pack =
        ResourcePack::load(path).with_context(|| format!("load {}", path.display()))?;

    let backup = suffixed_path(path, ".bak");
    println!("{} {}", "backing up to".cyan().bold(), backup.display());
    pack.save(&backup)?;

    println!("{} with key {}", "decrypting".cyan().bold(), key.yellow());
    pack.decrypt(key.as_bytes())?;
    pack.save(path)?;

    println!("{}", "resource pack decrypted".green().bold());
    Ok(())
}

fn encrypt_command(path: &Path, key: Option<String>) -> anyhow::Result<()> {
    println!("{} {}", "loading".cyan().bold(), path.display());
    let mut pack =
        ResourcePack::load(path).with_context(|| format!("load {}", path.display()))?;

    let backup = suffixed_path(path, ".bak");
    println!("{} {}", "backing up to".cyan().bold(), backup.display());
    pack.save(&backup)?;

    let key = key.unwrap_or_else(keys::generate_key);

    println!("{}", "regenerating manifest uuids".cyan().bold());
    pack.regenerate_uuid(None)?;
    println!("new pack uuid: {}", pack.uuid().green());

    println!("{}", "minifying json files".cyan().bold());
    pack.minify_json_files()?;

    println!("{}", "compressing png files".cyan().bold());
    pack.compress_png_files()?;

    println!("{} with key {}", "encrypting".cyan().bold(), key.yellow());
    pack.encrypt(key.as_bytes())?;
    pack.save(path)?;

    let key_path = suffixed_path(path, ".key.txt");
    std::fs::write(&key_path, key.as_bytes())
        .with_context(|| format!("write {}", key_path.display()))?;

    println!(
        "{} (key saved to {})",
        "resource pack encrypted".green().bold(),
        key_path.display()
    );
    Ok(())
}

async fn serve_command(
    repo: String,
    branch: String,
    token: Option<String>,
    out: PathBuf,
) -> anyhow::Result<()> {
    let (org, name) = repo
        .split_once('/')
        .ok_or_else(|| anyhow::anyhow!("repository must be given as org/name"))?;
    std::fs::create_dir_all(&out)
        .with_context(|| format!("create output directory {}", out.display()))?;

    let otf = Otf::new(OtfConfig {
        org: org.to_owned(),
        repo: name.to_owned(),
        branch,
        token,
    });
    otf.start().await.context("first pack build failed")?;
    otf.set_listener(Arc::new(DirListener { root: out }));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    otf.stop();
    Ok(())
}

/// Appends `suffix` to the full file name: `pack.zip` -> `pack.zip.bak`.
fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Publishes each live pack as `<uuid>.zip` + `<uuid>.key.txt` under a
/// directory, and deletes both when the pack is swapped out.
struct DirListener {
    root: PathBuf,
}

impl PackListener for DirListener {
    fn add_resource_pack(&self, pack: ServedPack) {
        let zip_path = self.root.join(format!("{}.zip", pack.uuid()));
        if let Err(err) = std::fs::write(&zip_path, pack.data()) {
            error!(path = %zip_path.display(), error = %err, "failed to publish pack");
            return;
        }
        let key_path = self.root.join(format!("{}.key.txt", pack.uuid()));
        if let Err(err) = std::fs::write(&key_path, pack.content_key()) {
            error!(path = %key_path.display(), error = %err, "failed to publish content key");
            return;
        }
        info!(path = %zip_path.display(), "pack published");
    }

    fn remove_resource_pack(&self, uuid: &str) {
        let _ = std::fs::remove_file(self.root.join(format!("{uuid}.zip")));
        let _ = std::fs::remove_file(self.root.join(format!("{uuid}.key.txt")));
        info!(uuid, "previous pack removed");
    }
}
