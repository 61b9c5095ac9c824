use eyre::Context;
use invidious_api_client::invidious_api::{InstanceSelector, ReqwestTransport};
use invidious_api_client::{ClientConfig, connect};
use std::io::IsTerminal;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: invidious-cli <instances | video <id> | comments <id> | dislikes <id>>";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("read configuration")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["instances"] => list_instances(&config).await,
        ["video", id] => show_video(&config, id).await,
        ["comments", id] => show_comments(&config, id).await,
        ["dislikes", id] => show_dislikes(&config, id).await,
        _ => eyre::bail!(USAGE),
    }
}

async fn list_instances(config: &ClientConfig) -> eyre::Result<()> {
    let transport = ReqwestTransport::with_user_agent(&config.user_agent)?;
    let selector = InstanceSelector::new(transport).with_directory_url(&config.directory_url);
    let instances = selector.get_instances(&[("sort_by", "health")]).await?;

    for instance in instances.iter() {
        let users = instance
            .stats()
            .and_then(|stats| stats.total_users())
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        let uptime = instance
            .monitor()
            .and_then(|monitor| monitor.ratio_30d())
            .and_then(|ratio| ratio.ratio())
            .map_or_else(|| "?".to_string(), |r| format!("{r:.2}%"));
        println!(
            "{} {:<40} {:<6} users={users} uptime30d={uptime}",
            instance.flag().unwrap_or("  "),
            instance.uri().unwrap_or("-"),
            instance.kind().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn show_video(config: &ClientConfig, id: &str) -> eyre::Result<()> {
    let client = connect(config).await?;
    let video = client.get_video(id).await?;

    println!("{}", video.title().unwrap_or("<untitled>"));
    println!("  by        {}", video.author().unwrap_or("?"));
    if let Some(published) = video.published() {
        println!("  published {published} ({})", video.published_text().unwrap_or("?"));
    }
    if let Some(views) = video.view_count() {
        println!("  views     {views}");
    }
    if let Some(url) = video.youtube_url() {
        println!("  youtube   {url}");
    }
    for thumbnail in video.video_thumbnails().context("list thumbnails")? {
        println!(
            "  thumbnail {:<10} {}",
            thumbnail.quality().unwrap_or("?"),
            thumbnail.url().unwrap_or("?")
        );
    }
    Ok(())
}

async fn show_comments(config: &ClientConfig, id: &str) -> eyre::Result<()> {
    let client = connect(config).await?;
    let mut pages = client.comment_pages(id)?;

    let mut total = 0;
    while let Some(page) = pages.next().await {
        let page = page.context("fetch comments")?;
        for comment in page.iter()? {
            total += 1;
            println!(
                "[{}] {}: {}",
                comment.like_count().unwrap_or(0),
                comment.author().unwrap_or("?"),
                comment.content().unwrap_or("").replace('\n', " ")
            );
            if comment.reply_count() > 0 {
                println!("    ({} replies)", comment.reply_count());
            }
        }
        if page.continuation().is_none() {
            eprintln!("==> last page");
        }
    }
    eprintln!("==> {total} comments on {} pages", pages.pages_fetched());
    Ok(())
}

async fn show_dislikes(config: &ClientConfig, id: &str) -> eyre::Result<()> {
    let client = connect(config).await?;
    let votes = client.get_dislike_count(id).await?;

    println!("{}", votes.id);
    println!("  likes    {}", votes.likes.map_or("?".to_string(), |n| n.to_string()));
    println!("  dislikes {}", votes.dislikes.map_or("?".to_string(), |n| n.to_string()));
    if let Some(rating) = votes.rating {
        println!("  rating   {rating:.2}");
    }
    Ok(())
}
