use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use socialfeed::{
    gallery, home_feed, profile_feed, Config, HttpClient, InfiniteScroll, LoadState,
    MemorySessionStore, Post, ProfileId,
};

#[derive(Parser, Debug)]
struct Args {
    /// Only show posts by this profile id.
    #[arg(long, conflicts_with = "gallery")]
    owner: Option<String>,

    /// Only show posts with images or videos, one line per attachment.
    #[arg(long)]
    gallery: bool,

    /// How many pages to scroll through before stopping.
    #[arg(long, default_value_t = 3)]
    pages: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config().context("Couldn't load config")?;
    let session = match std::env::var("ACCESS_TOKEN") {
        Ok(token) => MemorySessionStore::with_token(token),
        Err(_) => MemorySessionStore::default(),
    };
    let api = Arc::new(HttpClient::new(config.clone(), session)?);

    let feed = match (&args.owner, args.gallery) {
        (Some(owner), _) => profile_feed(api, ProfileId::from(owner.as_str()), config.page_size),
        (None, true) => gallery(api),
        (None, false) => home_feed(api, config.page_size),
    };

    feed.refresh().await.context("Couldn't load the first page")?;

    let scroll = InfiniteScroll::new(feed);
    let sentinel = scroll.attach();
    for _ in 1..args.pages {
        let Some(load) = sentinel.intersected(1.0).await else {
            break;
        };
        load.await.context("Page load task panicked")??;
    }
    drop(sentinel);

    let feed = scroll.feed();
    if args.gallery {
        for (post, media) in feed.gallery_entries().await {
            println!("{}  {}", post.id, media.resolved_url(&config));
        }
    } else {
        for post in feed.items().await {
            print_post(&post);
        }
    }

    let end = match feed.state().await {
        LoadState::Exhausted => "end of feed",
        _ => "more available",
    };
    println!("-- {} posts, {} page(s), {end}", feed.len().await, feed.cursor().await);
    Ok(())
}

fn print_post(post: &Post) {
    let author = post.owner_name.as_deref().unwrap_or(&post.owner_id.0);
    let liked = if post.is_liked { "*" } else { " " };
    println!(
        "{} {liked} {:>4} likes  {author}: {}",
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.like_count,
        post.content.as_deref().unwrap_or("")
    );
    if post.has_media() {
        println!("    [{} attachment(s)]", post.media.len());
    }
}
