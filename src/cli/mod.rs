use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::domain::reference::{ExternalId, normalize_reference};
use crate::domain::track::{Level, Track};
use crate::domain::video::{NewVideo, Video, VideoPatch};
use crate::metadata::{OEmbedClient, TitleResolver, enrich};
use crate::storage::operations::{Change, Outcome, Store};

#[derive(Parser)]
#[command(name = "blockdeck")]
#[command(version = "0.1")]
#[command(about = "Block-by-block practice tracker for online videos")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "blockdeck.toml")]
    pub config: PathBuf,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a video by URL or id
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        instrument: Option<String>,
        /// Video length in seconds
        #[arg(long)]
        duration: Option<u32>,
        /// Block size in seconds
        #[arg(long)]
        block_size: Option<u32>,
    },
    /// List videos
    List,
    /// Show a video and its practice track
    Show {
        /// Internal video id, or the video URL / external id
        id: String,
    },
    /// Update video details; a new duration resamples the track
    Update {
        /// Internal video id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Remove a video together with its track
    Remove {
        /// Internal video id
        id: String,
    },
    /// Change the block size of a track
    BlockSize {
        /// Video URL or external id
        video: String,
        seconds: u32,
    },
    /// Record the practice level of one block
    Level {
        /// Video URL or external id
        video: String,
        index: usize,
        level: u8,
    },
    /// Run http server exposing the library
    Serve,
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();
}

fn external_id(reference: &str) -> anyhow::Result<ExternalId> {
    normalize_reference(reference)
        .with_context(|| format!("'{reference}' is not a recognized video reference"))
}

fn title_resolver(cfg: &config::MetadataConfig) -> Option<OEmbedClient> {
    cfg.fetch_titles.then(|| OEmbedClient::new(cfg))
}

fn print_video(video: &Video) {
    println!("{}  {}", video.id, video.title);
    println!("  url:        {}", video.url);
    println!("  duration:   {}s", video.duration_sec);
    if let Some(instrument) = &video.instrument {
        println!("  instrument: {instrument}");
    }
    if let Some(note) = &video.note {
        println!("  note:       {note}");
    }
}

fn print_track(track: &Track) {
    let levels = track
        .levels
        .iter()
        .map(|l| l.value().to_string())
        .collect::<Vec<_>>()
        .join("");
    let practiced = track.levels.iter().filter(|l| **l == Level::MAX).count();
    println!(
        "  track:      {} blocks of {}s, {} fully practiced",
        track.levels.len(),
        track.block_size_sec,
        practiced
    );
    println!("              [{levels}]");
}

/// Adds a video, looking up its title when the caller gave none.
fn add_video(
    store: &mut Store,
    titles: Option<&dyn TitleResolver>,
    params: NewVideo,
) -> anyhow::Result<(Video, Option<Track>)> {
    let params = enrich(params, titles, None);
    let video = store.add_video(&params)?;
    let track = store.get_track(&video.video_id)?;
    Ok((video, track))
}

/// Finds a video by internal id, falling back to its URL or external id.
fn show_video(store: &Store, id: &str) -> anyhow::Result<(Video, Option<Track>)> {
    let video = match store.get_video(id)? {
        Some(video) => Some(video),
        None => match normalize_reference(id) {
            Some(video_id) => store.get_video_by_external_id(&video_id)?,
            None => None,
        },
    };
    let Some(video) = video else {
        bail!("video {id} not found");
    };
    let track = store.get_track(&video.video_id)?;
    Ok((video, track))
}

fn update_video(
    store: &mut Store,
    id: &str,
    patch: &VideoPatch,
) -> anyhow::Result<(Video, Option<Track>)> {
    match store.update_video(id, patch)? {
        Outcome::Applied(video) => {
            let track = store.get_track(&video.video_id)?;
            Ok((video, track))
        }
        Outcome::NotFound => bail!("video {id} not found"),
    }
}

fn remove_video(store: &mut Store, id: &str) -> anyhow::Result<Video> {
    match store.remove_video(id)? {
        Outcome::Applied(video) => Ok(video),
        Outcome::NotFound => bail!("video {id} not found"),
    }
}

/// Returns the resampled track, or `None` when the block size did not change.
fn change_block_size(
    store: &mut Store,
    video: &str,
    seconds: u32,
) -> anyhow::Result<Option<Track>> {
    let video_id = external_id(video)?;
    match store.update_track_block_size(&video_id, seconds)? {
        Change::Applied(track) => Ok(Some(track)),
        Change::Unchanged => Ok(None),
        Change::NotFound => bail!("no track for {video_id}"),
    }
}

/// Returns the updated track, or `None` when the block already had that level.
fn record_level(
    store: &mut Store,
    video: &str,
    index: usize,
    level: u8,
) -> anyhow::Result<Option<Track>> {
    let video_id = external_id(video)?;
    if level > Level::MAX.value() {
        bail!("level must be at most {}", Level::MAX.value());
    }
    match store.set_level(&video_id, index, Level::new(level))? {
        Change::Applied(track) => Ok(Some(track)),
        Change::Unchanged => Ok(None),
        Change::NotFound => bail!("no track for {video_id}"),
    }
}

fn print_video_with_track(video: &Video, track: Option<&Track>) {
    print_video(video);
    match track {
        Some(track) => print_track(track),
        None => log::warn!("video {} has no track", video.id),
    }
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = Config::load(&cli.config)?;

    let mut store =
        Store::new(&cfg.database, cfg.defaults).context("Failed to initialize storage")?;

    match cli.command {
        Commands::Add {
            url,
            title,
            instrument,
            duration,
            block_size,
        } => {
            let titles = title_resolver(&cfg.metadata);
            let params = NewVideo {
                url,
                title,
                instrument,
                duration_sec: duration,
                block_size_sec: block_size,
            };
            let (video, track) = add_video(
                &mut store,
                titles.as_ref().map(|t| t as &dyn TitleResolver),
                params,
            )?;
            print_video_with_track(&video, track.as_ref());
        }

        Commands::List => {
            let videos = store.list_videos()?;
            if videos.is_empty() {
                println!("No videos yet");
            }
            for video in &videos {
                println!(
                    "{}  {}  {}s  {}",
                    video.id, video.video_id, video.duration_sec, video.title
                );
            }
        }

        Commands::Show { id } => {
            let (video, track) = show_video(&store, &id)?;
            print_video_with_track(&video, track.as_ref());
        }

        Commands::Update {
            id,
            title,
            instrument,
            note,
            duration,
        } => {
            let patch = VideoPatch {
                title,
                instrument,
                note,
                duration_sec: duration,
            };
            let (video, track) = update_video(&mut store, &id, &patch)?;
            print_video_with_track(&video, track.as_ref());
        }

        Commands::Remove { id } => {
            let video = remove_video(&mut store, &id)?;
            println!("Removed {} ({})", video.title, video.video_id);
        }

        Commands::BlockSize { video, seconds } => {
            match change_block_size(&mut store, &video, seconds)? {
                Some(track) => print_track(&track),
                None => println!("Block size is already {seconds}s"),
            }
        }

        Commands::Level {
            video,
            index,
            level,
        } => match record_level(&mut store, &video, index, level)? {
            Some(track) => print_track(&track),
            None => println!("Block {index} is already at level {level}"),
        },

        Commands::Serve => {
            let titles = title_resolver(&cfg.metadata)
                .map(|t| Box::new(t) as crate::http::server::SharedTitleResolver);
            let http_server = crate::http::server::HttpServer::new(store, titles, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }
    }

    Ok(())
}
