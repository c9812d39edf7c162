use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{Cli, Commands, OutputFormat, ScriptSource, SetsAction, VideosAction};
use crate::config::Config;
use crate::models::OwnerId;
use crate::output::{self, VideoPage};
use crate::sanitize::sanitize;
use crate::scripts::{generate_script_set, OpenAiScriptGenerator};
use crate::store::{FileStore, RecordStore, StoreError};
use crate::utils::{default_video_title, paginate, total_pages};
use crate::video::{JobState, LifecycleEvent, RunOutcome, VideoLifecycle, VideoRequest};

/// Loaded configuration plus the acting user and their store
struct Session {
    config: Config,
    owner: OwnerId,
    store: Arc<dyn RecordStore>,
    quiet: bool,
}

impl Session {
    async fn open(user: Option<&str>, quiet: bool) -> Result<Self> {
        let config = Config::load().await?;
        let owner = config.owner(user)?;
        let data_dir = config.data_dir()?;
        tracing::debug!(owner = %owner, "Using data directory {}", data_dir.display());
        Ok(Self {
            owner,
            store: Arc::new(FileStore::new(data_dir)),
            config,
            quiet,
        })
    }

    fn format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or_else(|| OutputFormat::from_config(&self.config.app.default_output_format))
    }
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command, user, quiet, ..
    } = cli;
    let user = user.as_deref();

    match command {
        Commands::Sanitize { text, file } => sanitize_command(text, file),
        Commands::Config { show } => config_command(show).await,
        Commands::Scripts {
            topic,
            variations,
            format,
            no_save,
        } => {
            let session = Session::open(user, quiet).await?;
            scripts_command(&session, &topic, variations, format, no_save).await
        }
        Commands::Video {
            source,
            variant,
            avatar,
            voice,
            title,
            format,
        } => {
            let session = Session::open(user, quiet).await?;
            let (script, default_title) = resolve_script(&session, source, variant).await?;
            let request = VideoRequest {
                script,
                avatar_id: avatar,
                voice_id: voice,
                title: title.or(default_title),
            };
            video_command(&session, request, format).await
        }
        Commands::Videos { action } => {
            let session = Session::open(user, quiet).await?;
            match action {
                VideosAction::List { page, format } => list_videos_command(&session, page, format).await,
                VideosAction::Delete { id } => delete_video_command(&session, &id).await,
            }
        }
        Commands::Sets { action } => {
            let session = Session::open(user, quiet).await?;
            match action {
                SetsAction::List { format } => {
                    let sets = session.store.list_script_sets(&session.owner).await?;
                    println!("{}", output::format_script_sets(&sets, session.format(format))?);
                    Ok(())
                }
                SetsAction::Show { id, format } => {
                    let set = session.store.get_script_set(&id).await?;
                    if set.owner_id != session.owner {
                        anyhow::bail!("Script set {} not found", id);
                    }
                    println!("{}", output::format_script_set(&set, session.format(format))?);
                    Ok(())
                }
            }
        }
    }
}

fn sanitize_command(text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs_err::read_to_string(&path).context("Failed to read script file")?,
        (None, None) => anyhow::bail!("Provide script text or --file"),
    };
    println!("{}", sanitize(&raw));
    Ok(())
}

async fn config_command(show: bool) -> Result<()> {
    let config = Config::load().await?;
    if show {
        config.display();
    } else {
        println!("Configuration file: {}", Config::config_path()?.display());
        println!("Edit it to change providers, defaults and polling. Use --show to print the active values.");
    }
    Ok(())
}

async fn scripts_command(
    session: &Session,
    topic: &str,
    variations: Option<u8>,
    format: Option<OutputFormat>,
    no_save: bool,
) -> Result<()> {
    let config = &session.config;
    let generator = OpenAiScriptGenerator::new(
        config.scripts.base_url.clone(),
        config.script_api_key(),
        config.scripts.model.clone(),
    );
    let num_variations = variations.unwrap_or(config.scripts.default_variations);
    let store = if no_save { None } else { Some(session.store.as_ref()) };

    let progress = spinner(session.quiet)?;
    progress.set_message(format!("Writing {} scripts...", num_variations));
    let result = generate_script_set(&generator, store, &session.owner, topic, num_variations).await;
    progress.finish_and_clear();

    let batch = result?;
    println!("{}", output::format_script_batch(&batch, session.format(format))?);
    Ok(())
}

/// Script text and default title for a video request
async fn resolve_script(
    session: &Session,
    source: ScriptSource,
    variant: Option<u32>,
) -> Result<(String, Option<String>)> {
    if let Some(text) = source.text {
        return Ok((text, None));
    }
    if let Some(path) = source.file {
        let text = fs_err::read_to_string(&path).context("Failed to read script file")?;
        return Ok((text, None));
    }

    let set_id = source.set.context("Provide --text, --file or --set")?;
    let variant = variant.context("--set requires --variant")?;
    let set = match session.store.get_script_set(&set_id).await {
        Ok(set) if set.owner_id == session.owner => set,
        Ok(_) | Err(StoreError::NotFound(_)) => anyhow::bail!("Script set {} not found", set_id),
        Err(e) => return Err(e.into()),
    };
    let script = set
        .variant(variant)
        .with_context(|| format!("Script set {} has no variation {}", set_id, variant))?;

    Ok((script.content.clone(), Some(default_video_title(script.id))))
}

async fn video_command(session: &Session, request: VideoRequest, format: Option<OutputFormat>) -> Result<()> {
    let lifecycle = VideoLifecycle::from_config(&session.config, session.store.clone());
    let cancel = CancellationToken::new();

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let progress = spinner(session.quiet)?;
    progress.set_message("Submitting video job...");
    let listener = tokio::spawn({
        let progress = progress.clone();
        let mut events = lifecycle.subscribe();
        async move {
            loop {
                match events.recv().await {
                    Ok(event) => progress.set_message(describe_event(&event)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
    });

    let started = Instant::now();
    let result = lifecycle.run(request, &session.owner, cancel).await;
    interrupt.abort();
    listener.abort();
    progress.finish_and_clear();

    match result? {
        RunOutcome::Cancelled { job_id } => {
            eprintln!(
                "{} Stopped waiting for job {}. The provider may still finish rendering it.",
                style("Cancelled.").yellow(),
                job_id
            );
            Ok(())
        }
        RunOutcome::Finished(report) => {
            let elapsed = started.elapsed().as_secs_f64();
            println!("{}", output::format_video_report(&report, session.format(format), elapsed)?);
            match report.failure() {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
    }
}

async fn list_videos_command(session: &Session, page: usize, format: Option<OutputFormat>) -> Result<()> {
    let videos = session.store.list_videos(&session.owner).await?;
    let page_size = session.config.app.page_size;
    let pages = total_pages(videos.len(), page_size);
    let page = page.clamp(1, pages);

    let view = VideoPage {
        videos: paginate(&videos, page, page_size),
        page,
        total_pages: pages,
        total: videos.len(),
    };
    println!("{}", output::format_video_page(&view, session.format(format))?);
    Ok(())
}

async fn delete_video_command(session: &Session, id: &str) -> Result<()> {
    match session.store.get_video(id).await {
        Ok(video) if video.owner_id == session.owner => {}
        Ok(_) | Err(StoreError::NotFound(_)) => anyhow::bail!("Video {} not found", id),
        Err(e) => return Err(e.into()),
    }
    session.store.delete_video(id).await?;
    tracing::info!(record_id = %id, "Deleted video");
    println!("Deleted video {}", id);
    Ok(())
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(120));
    Ok(progress)
}

fn describe_event(event: &LifecycleEvent) -> String {
    match event {
        LifecycleEvent::StateChanged { state, job_id } => match (state, job_id) {
            (JobState::Submitting, _) => "Submitting video job...".to_string(),
            (JobState::Polling, Some(job_id)) => format!("Rendering video (job {})...", job_id),
            (JobState::Polling, None) => "Rendering video...".to_string(),
            (JobState::Completed { .. }, _) => "Video ready, saving to gallery...".to_string(),
            (JobState::Failed { message }, _) => format!("Failed: {}", message),
            (JobState::TimedOut { message }, _) => message.clone(),
        },
        LifecycleEvent::Rejected { message } => format!("Rejected: {}", message),
        LifecycleEvent::Saved { record_id } => format!("Saved as {}", record_id),
        LifecycleEvent::PersistenceFailed { message } => format!("Save failed: {}", message),
        LifecycleEvent::Cancelled { job_id } => format!("Cancelled job {}", job_id),
    }
}
