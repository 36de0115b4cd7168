use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use socialfeed::notifications::PREVIEW_PAGE_SIZE;
use socialfeed::{Config, HttpClient, Inbox, MemorySessionStore, Notification};

#[derive(Parser, Debug)]
struct Args {
    /// Only list notifications that haven't been read.
    #[arg(long)]
    unread_only: bool,

    /// Mark everything as read after listing.
    #[arg(long)]
    mark_all: bool,

    /// Show the short preview list instead of a full page.
    #[arg(long)]
    preview: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config().context("Couldn't load config")?;
    let token =
        env::var("ACCESS_TOKEN").context("ACCESS_TOKEN environment variable must be set")?;
    let page_size = if args.preview {
        PREVIEW_PAGE_SIZE
    } else {
        config.page_size
    };
    let api = Arc::new(HttpClient::new(
        config,
        MemorySessionStore::with_token(token),
    )?);

    let inbox = Inbox::new(api, page_size, args.unread_only);
    inbox
        .refresh()
        .await
        .context("Couldn't load notifications")?;

    println!("{} unread", inbox.unread_count());
    for notification in inbox.feed().items().await {
        print_notification(&notification);
    }

    if args.mark_all {
        inbox.mark_all_read().await?;
        println!("Marked all as read");
    }
    Ok(())
}

fn print_notification(notification: &Notification) {
    let marker = if notification.is_read { " " } else { "•" };
    let actor = notification
        .actor
        .as_ref()
        .map(|actor| actor.display_name.as_deref().unwrap_or(&actor.username))
        .unwrap_or("someone");
    let kind: String = notification.kind.clone().into();
    println!(
        "{marker} {} {actor} ({kind}) {}",
        notification.created_at.format("%Y-%m-%d %H:%M"),
        notification.body.as_deref().unwrap_or("")
    );
}
