use anyhow::Result;
use console::style;
use serde_json::json;
use std::fmt::Write;

use crate::cli::OutputFormat;
use crate::models::{GeneratedVideo, ScriptSet};
use crate::scripts::ScriptBatch;
use crate::utils::{format_duration, preview};
use crate::video::{JobReport, JobState};

const PREVIEW_CHARS: usize = 60;

/// One page of the video gallery
pub struct VideoPage<'a> {
    pub videos: &'a [GeneratedVideo],
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Render freshly generated scripts
pub fn format_script_batch(batch: &ScriptBatch, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "topic": batch.topic,
            "scripts": batch.scripts,
            "setId": batch.record_id,
            "saveError": batch.persistence_error.as_ref().map(|e| e.to_string()),
        }))?),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(out, "{} {}", style("Topic:").bold(), batch.topic)?;
            for script in &batch.scripts {
                writeln!(out)?;
                writeln!(out, "{}", style(format!("Script {}", script.id)).cyan().bold())?;
                writeln!(out, "{}", script.content)?;
            }
            writeln!(out)?;
            match (&batch.record_id, &batch.persistence_error) {
                (Some(id), _) => write!(
                    out,
                    "Saved as set {}. Render one with: scriptreel video --set {} --variant <N>",
                    style(id).green(),
                    id
                )?,
                (None, Some(e)) => write!(out, "{} {}", style("Scripts were not saved:").yellow(), e)?,
                (None, None) => write!(out, "Scripts were not saved.")?,
            }
            Ok(out)
        }
    }
}

/// Render every variation of one stored set
pub fn format_script_set(set: &ScriptSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(set)?),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(out, "{} {}", style("Set:").bold(), set.id)?;
            writeln!(out, "{} {}", style("Topic:").bold(), set.topic)?;
            write!(out, "{} {}", style("Created:").bold(), set.created_at.format("%Y-%m-%d %H:%M"))?;
            for script in &set.scripts {
                writeln!(out)?;
                writeln!(out)?;
                writeln!(out, "{}", style(format!("Script {}", script.id)).cyan().bold())?;
                write!(out, "{}", script.content)?;
            }
            Ok(out)
        }
    }
}

/// Render the list of stored script sets
pub fn format_script_sets(sets: &[ScriptSet], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(sets)?),
        OutputFormat::Text => {
            if sets.is_empty() {
                return Ok("No script sets yet. Create one with: scriptreel scripts <TOPIC>".to_string());
            }
            let lines: Vec<String> = sets
                .iter()
                .map(|set| {
                    format!(
                        "{}  {}  {} ({} scripts)",
                        style(&set.id).dim(),
                        set.created_at.format("%Y-%m-%d %H:%M"),
                        preview(&set.topic, PREVIEW_CHARS),
                        set.scripts.len()
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// Render the final state of a video run
pub fn format_video_report(report: &JobReport, format: OutputFormat, elapsed_secs: f64) -> Result<String> {
    let job = &report.job;
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "job": job,
            "recordId": report.record_id,
            "saveError": report.persistence_error.as_ref().map(|e| e.to_string()),
            "elapsedSecs": elapsed_secs.round(),
        }))?),
        OutputFormat::Text => {
            let mut out = String::new();
            if let Some(job_id) = job.job_id() {
                writeln!(out, "{} {}", style("Job:").bold(), job_id)?;
            }
            match job.state() {
                JobState::Completed {
                    video_url,
                    thumbnail_url,
                } => {
                    writeln!(
                        out,
                        "{} in {}",
                        style("Video ready").green().bold(),
                        format_duration(elapsed_secs)
                    )?;
                    writeln!(out, "{} {}", style("URL:").bold(), video_url)?;
                    if let Some(thumbnail) = thumbnail_url {
                        writeln!(out, "{} {}", style("Thumbnail:").bold(), thumbnail)?;
                    }
                    match (&report.record_id, &report.persistence_error) {
                        (Some(id), _) => write!(out, "Saved to your gallery as {}", id)?,
                        (None, Some(e)) => write!(
                            out,
                            "{} {}. The video is still available at the URL above.",
                            style("Could not save to your gallery:").yellow(),
                            e
                        )?,
                        (None, None) => {}
                    }
                }
                JobState::TimedOut { message } => {
                    write!(out, "{} {}", style("Timed out:").yellow().bold(), message)?
                }
                JobState::Failed { message } => write!(out, "{} {}", style("Failed:").red().bold(), message)?,
                JobState::Submitting | JobState::Polling => write!(out, "Status: {}", job.state().label())?,
            }
            Ok(out.trim_end().to_string())
        }
    }
}

/// Render one gallery page
pub fn format_video_page(page: &VideoPage<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "videos": page.videos,
            "page": page.page,
            "totalPages": page.total_pages,
            "total": page.total,
        }))?),
        OutputFormat::Text => {
            if page.total == 0 {
                return Ok("No videos yet. Render one with: scriptreel video --text <SCRIPT>".to_string());
            }
            let mut out = String::new();
            for video in page.videos {
                writeln!(
                    out,
                    "{}  {}  {}",
                    style(&video.id).dim(),
                    video.created_at.format("%Y-%m-%d %H:%M"),
                    video
                        .title
                        .clone()
                        .unwrap_or_else(|| preview(&video.cleaned_script, PREVIEW_CHARS))
                )?;
                writeln!(out, "    {}", video.video_url)?;
            }
            write!(
                out,
                "Page {} of {} ({} videos)",
                page.page, page.total_pages, page.total
            )?;
            Ok(out)
        }
    }
}
