use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use socialfeed::{Composer, Config, HttpClient, MediaFile, MemorySessionStore};

#[derive(Parser, Debug)]
struct Args {
    /// Text of the post. Can be left out when attaching media.
    #[arg(long, default_value = "")]
    content: String,

    /// Only visible to you.
    #[arg(long)]
    private: bool,

    /// Images or videos to attach, in display order. Up to 4.
    #[arg(long = "media")]
    media: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config().context("Couldn't load config")?;
    let token =
        env::var("ACCESS_TOKEN").context("ACCESS_TOKEN environment variable must be set")?;
    let api = Arc::new(HttpClient::new(
        config,
        MemorySessionStore::with_token(token),
    )?);

    let mut composer = Composer::new(api);
    composer.set_content(args.content);
    composer.set_private(args.private);

    for path in &args.media {
        println!("Uploading {}...", path.display());
        let file = MediaFile::from_path(path)?;
        composer
            .attach(file)
            .await
            .with_context(|| format!("Couldn't attach {}", path.display()))?;
    }

    println!("Publishing post...");
    let post = composer.submit().await.context("Publishing failed")?;

    println!("Published post {} with {} attachment(s)", post.id, post.media.len());
    Ok(())
}
