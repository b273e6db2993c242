use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use codex_engine::{
    ActivePoller, Backend, CompletedUpload, EngineConfig, HttpBackend, LibraryPoller, MediaAsset, NotesDraft,
    NotificationChannel, PlaybackSync, Player, SelectedFile, TimeCode, UPLOAD_FAILED_MESSAGE,
    UploadPhase, UploadPipeline, attach_playback_urls, processing_count, run_search,
    sort_newest_first,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Command, Config};
use crate::player::SimulatedPlayer;

/// Extra media assumed after the last chapter when no duration is given.
const DEFAULT_TAIL_SECS: f64 = 60.0;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let client = config.api_client().context("invalid backend configuration")?;
    let backend = Arc::new(HttpBackend::new(client));
    let engine = config.engine_config();

    match config.command {
        Command::Upload { path, wait } => upload(backend, &engine, &path, wait).await,
        Command::Watch => watch(backend, &engine).await,
        Command::Library { urls, json } => library(backend.as_ref(), urls, json).await,
        Command::Search { query, json } => search(backend.as_ref(), &query.join(" "), json).await,
        Command::Play {
            asset_id,
            start,
            chapter,
            duration,
            speed,
            notes,
        } => {
            let options = PlayOptions {
                start,
                chapter,
                duration,
                speed,
                notes,
            };
            play(backend.as_ref(), asset_id, options).await
        }
    }
}

async fn upload(
    backend: Arc<HttpBackend>,
    engine: &EngineConfig,
    path: &Path,
    wait: bool,
) -> anyhow::Result<()> {
    let file = SelectedFile::from_path(path).await?;
    let notifications = Arc::new(NotificationChannel::new(engine.notification_ttl));
    let poller = wait.then(|| {
        LibraryPoller::new(
            Arc::clone(&backend),
            Arc::clone(&notifications),
            engine.poll_interval,
        )
        .activate()
    });
    let refresh = poller.as_ref().map(ActivePoller::refresher);

    let pipeline = UploadPipeline::new(Arc::clone(&backend), engine.upload.clone()).on_complete(
        move |done| {
            info!(title = %done.title, "upload registered");
            if let Some(refresh) = &refresh {
                refresh.request();
            }
        },
    );
    pipeline.select_file(file)?;

    let printer = print_upload_progress(&pipeline);
    let outcome = pipeline.start().await;
    printer.abort();
    let completed = outcome.map_err(|_| anyhow!(UPLOAD_FAILED_MESSAGE))?;
    println!("uploaded \"{}\" as {}", completed.title, completed.storage_key);

    // Let the success display elapse so the completion callback runs.
    tokio::time::sleep(engine.upload.success_display + Duration::from_millis(50)).await;

    let Some(poller) = poller else {
        return Ok(());
    };
    println!("waiting for \"{}\" to be processed...", completed.title);
    let printer = print_notifications(&notifications);
    let mut library = poller.library();
    let processed = async {
        while library.changed().await.is_ok() {
            if is_processed(&library.borrow_and_update(), &completed) {
                return true;
            }
        }
        false
    };
    let finished = tokio::select! {
        finished = processed => finished,
        _ = tokio::signal::ctrl_c() => false,
    };
    poller.deactivate().await;
    printer.abort();

    if finished {
        println!("\"{}\" is ready for search.", completed.title);
    }
    Ok(())
}

fn print_upload_progress<B>(pipeline: &UploadPipeline<B>) -> JoinHandle<()>
where
    B: Backend + ?Sized,
{
    let mut updates = pipeline.subscribe();
    tokio::spawn(async move {
        let mut last = None;
        while updates.changed().await.is_ok() {
            let view = {
                let session = updates.borrow_and_update();
                (session.phase, session.progress)
            };
            if last != Some(view) {
                println!("{:>12} {:>3}%", view.0, view.1);
                last = Some(view);
            }
            if matches!(view.0, UploadPhase::Succeeded | UploadPhase::Failed) {
                break;
            }
        }
    })
}

fn print_notifications(notifications: &NotificationChannel) -> JoinHandle<()> {
    let mut updates = notifications.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let shown = updates.borrow_and_update().clone();
            if shown.visible {
                println!("* {}", shown.message);
            }
        }
    })
}

async fn watch(backend: Arc<HttpBackend>, engine: &EngineConfig) -> anyhow::Result<()> {
    let notifications = Arc::new(NotificationChannel::new(engine.notification_ttl));
    let poller =
        LibraryPoller::new(backend, Arc::clone(&notifications), engine.poll_interval).activate();
    let printer = print_notifications(&notifications);
    let mut library = poller.library();
    println!("watching library (ctrl-c to stop)");

    let listen = async {
        let mut last = None;
        while library.changed().await.is_ok() {
            let summary = {
                let assets = library.borrow_and_update();
                (assets.len(), processing_count(&assets))
            };
            if last != Some(summary) {
                println!("{} assets, {} processing", summary.0, summary.1);
                last = Some(summary);
            }
        }
    };
    tokio::select! {
        _ = listen => {}
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
    }

    poller.deactivate().await;
    printer.abort();
    Ok(())
}

async fn library(backend: &HttpBackend, urls: bool, json: bool) -> anyhow::Result<()> {
    let mut assets = backend.list_assets().await?;
    sort_newest_first(&mut assets);
    if urls {
        attach_playback_urls(backend, &mut assets).await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
        return Ok(());
    }

    for asset in &assets {
        let status = if asset.processed { "ready" } else { "processing" };
        println!(
            "{:>6}  {:<10}  {}  {} ({} chapters)",
            asset.id,
            status,
            asset.created_at.format("%Y-%m-%d %H:%M"),
            asset.title,
            asset.chapters.len()
        );
        if let Some(url) = &asset.playback_url {
            println!("        {url}");
        }
    }
    println!(
        "{} assets, {} still processing",
        assets.len(),
        processing_count(&assets)
    );
    Ok(())
}

async fn search(backend: &HttpBackend, query: &str, json: bool) -> anyhow::Result<()> {
    let results = run_search(backend, query).await.context("search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no matches");
        return Ok(());
    }

    for result in &results {
        let marker = if result.is_best_match() { "best match" } else { "" };
        println!(
            "{:>3}. {} (asset {}) {marker}",
            result.rank + 1,
            result.title,
            result.asset_id
        );
        if let Some(start) = result.deep_link {
            println!("     jump to {start}: codex play {} --start {start}", result.asset_id);
        }
        if let Some(description) = &result.description {
            println!("     {description}");
        }
        for chapter in &result.chapters {
            println!("     [{}] {}", chapter.timestamp, chapter.label);
        }
    }
    Ok(())
}

struct PlayOptions {
    start: Option<TimeCode>,
    chapter: Option<usize>,
    duration: Option<f64>,
    speed: f64,
    notes: bool,
}

async fn play(backend: &HttpBackend, asset_id: u64, options: PlayOptions) -> anyhow::Result<()> {
    let asset = find_asset(backend, asset_id).await?;
    let duration = options
        .duration
        .unwrap_or_else(|| default_duration(&asset));

    println!("{} ({})", asset.title, TimeCode::from_position(duration));
    let mut sync = PlaybackSync::new(asset.chapters, SimulatedPlayer::new(Some(duration)))
        .with_deep_link(options.start);
    for (chapter, width) in sync.chapters().iter().zip(sync.segment_widths()) {
        println!("  [{}] {:<40} {width:>5.1}%", chapter.timestamp, chapter.label);
    }

    if sync.on_loaded_metadata().is_none() {
        sync.player_mut().play();
    }
    if let Some(index) = options.chapter {
        sync.seek_to_chapter(index)?;
    }

    let mut notes = NotesDraft::new();
    let mut active = None;
    let tick = Duration::from_secs(1);
    let mut clock = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
    loop {
        let current = sync.active_chapter();
        if current != active {
            if let Some(chapter) = sync.active_chapter_entry() {
                println!("> [{}] {}", chapter.timestamp, chapter.label);
                if options.notes {
                    notes.capture(sync.player().position());
                    notes.push_str(&chapter.label);
                }
            }
            active = current;
        }
        if !sync.player().is_playing() {
            break;
        }

        tokio::select! {
            _ = clock.tick() => sync.player_mut().advance(options.speed),
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    println!(
        "stopped at {}",
        TimeCode::from_position(sync.player().position())
    );
    if options.notes && !notes.as_str().is_empty() {
        println!("\n{}", notes.as_str());
    }
    Ok(())
}

async fn find_asset(backend: &HttpBackend, asset_id: u64) -> anyhow::Result<MediaAsset> {
    backend
        .list_assets()
        .await?
        .into_iter()
        .find(|asset| asset.id == asset_id)
        .with_context(|| format!("asset {asset_id} not found"))
}

/// True once the asset committed under `completed.storage_key` is processed.
/// Titles are file names and may repeat, so they are not used for matching.
fn is_processed(assets: &[MediaAsset], completed: &CompletedUpload) -> bool {
    assets
        .iter()
        .any(|asset| asset.storage_key == completed.storage_key && asset.processed)
}

fn default_duration(asset: &MediaAsset) -> f64 {
    asset
        .chapters
        .as_slice()
        .last()
        .map_or(0.0, |chapter| chapter.timestamp.as_secs_f64())
        + DEFAULT_TAIL_SECS
}
