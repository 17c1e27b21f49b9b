//! `vsearch` command-line client.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsearch_client::UploadFile;
use vsearch_models::{format_seconds, parse_timestamp, SearchOptions, VideoId};
use vsearch_session::VideoSession;

#[derive(Parser, Debug)]
#[command(name = "vsearch", author, version, about = "Search inside your videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is up
    Health,
    /// List indexed videos
    Videos,
    /// Upload and index a video file
    Upload {
        /// Video file to upload
        path: PathBuf,
    },
    /// Search indexed videos with a text query
    Search {
        query: String,

        /// Restrict the search to one video
        #[arg(long)]
        video_id: Option<String>,

        /// Number of frames to retrieve
        #[arg(short, long)]
        k: Option<u32>,

        /// Minimum similarity score
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Keep individual frame windows instead of merging them
        #[arg(long)]
        no_merge: bool,
    },
    /// Show the playback window around a timestamp
    Segment {
        video_id: String,

        /// HH:MM:SS, MM:SS or plain seconds
        timestamp: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let session = VideoSession::from_env().context("Failed to configure the backend client")?;

    match cli.command {
        Command::Health => health(&session).await,
        Command::Videos => videos(&session).await,
        Command::Upload { path } => upload(&session, path).await,
        Command::Search {
            query,
            video_id,
            k,
            threshold,
            no_merge,
        } => {
            let mut options = SearchOptions::default().merge_segments(!no_merge);
            if let Some(k) = k {
                options = options.k(k);
            }
            if let Some(threshold) = threshold {
                options = options.similarity_threshold(threshold);
            }
            search(&session, &query, video_id.map(VideoId::from), options).await
        }
        Command::Segment {
            video_id,
            timestamp,
        } => segment(&session, video_id.into(), &timestamp).await,
    }
}

/// Colored output for terminals, JSON when `LOG_FORMAT=json`. Logs go to stderr.
fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vsearch=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn health(session: &VideoSession) -> Result<()> {
    let status = session.health_status().await?;
    println!(
        "{} ({} videos, {} frames indexed)",
        status.status, status.videos_indexed, status.frames_indexed
    );
    if !status.is_healthy() {
        bail!("backend reports status '{}'", status.status);
    }
    Ok(())
}

async fn videos(session: &VideoSession) -> Result<()> {
    let videos = session.refresh_library().await?;
    if videos.is_empty() {
        println!("No videos indexed");
        return Ok(());
    }
    for video in videos {
        println!(
            "{:<24} {:>10}  {}",
            video.id().as_str(),
            format_seconds(video.duration_seconds()),
            video.display_name()
        );
    }
    Ok(())
}

async fn upload(session: &VideoSession, path: PathBuf) -> Result<()> {
    let file = UploadFile::from_path(&path).await?;
    info!(file = %path.display(), bytes = file.len(), "Uploading");

    let progress = session.store().subscribe(|state| {
        if state.is_uploading() {
            eprint!("\rUploading... {:>5.1}%", state.upload_progress());
        }
    });

    let cancel = {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling upload");
                session.cancel_upload();
            }
        })
    };

    let result = session.start_upload(file).await;
    cancel.abort();
    session.store().unsubscribe(progress);
    eprintln!();

    let video = result?;
    println!(
        "Uploaded {} as {} ({})",
        video.display_name(),
        video.id(),
        format_seconds(video.duration_seconds())
    );
    Ok(())
}

async fn search(
    session: &VideoSession,
    query: &str,
    video_id: Option<VideoId>,
    options: SearchOptions,
) -> Result<()> {
    let segments = session
        .searches()
        .run_search(video_id.as_ref(), query, options)
        .await?;
    if segments.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }
    for (rank, segment) in segments.iter().enumerate() {
        println!(
            "{:>3}. {}  {} - {}  score {:.3}  {}",
            rank + 1,
            segment.video_id,
            format_seconds(segment.start_timestamp),
            format_seconds(segment.end_timestamp),
            segment.score,
            session.frame_url(&segment.thumbnail_ref)
        );
    }
    Ok(())
}

async fn segment(session: &VideoSession, video_id: VideoId, timestamp: &str) -> Result<()> {
    let seconds = parse_timestamp(timestamp)
        .with_context(|| format!("Invalid timestamp '{}'", timestamp))?;
    let info = session.video_segment(&video_id, seconds).await?;
    println!(
        "{}  {} - {} (center {})",
        info.video_id,
        format_seconds(info.start_time),
        format_seconds(info.end_time),
        format_seconds(info.center_timestamp)
    );
    println!("{}", session.video_url(&info.video_url));
    Ok(())
}
