use crate::error::{RenderError, Result};
use layercut_core::config::EditorConfig;
use layercut_core::media::{ExportSegment, ExportSink};
use layercut_core::segments::default_title;
use layercut_core::timecode::sanitize_title;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Encoder settings taken from the editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub codec: String,
    pub extension: String,
}

impl From<&EditorConfig> for ExportSettings {
    fn from(config: &EditorConfig) -> Self {
        Self {
            codec: config.codec.clone(),
            extension: config.output_extension.clone(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

/// One ffmpeg invocation writing one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub segment: ExportSegment,
    pub output_path: PathBuf,
    pub args: Vec<String>,
}

/// Every file an export will write, resolved up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPlan {
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    pub jobs: Vec<ExportJob>,
}

/// Progress update during an export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub completed: usize,
    pub total: usize,
    /// File being written, `None` once finished.
    pub current: Option<PathBuf>,
}

impl ExportProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl ExportPlan {
    /// Resolve output names and ffmpeg arguments for `segments`, in order.
    pub fn build(
        video_path: &Path,
        segments: &[ExportSegment],
        output_dir: &Path,
        settings: &ExportSettings,
    ) -> Result<Self> {
        if segments.is_empty() {
            return Err(RenderError::NoSegments);
        }

        let jobs = segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let name = output_file_name(video_path, segment, index, &settings.extension);
                let output_path = output_dir.join(name);
                let args = build_ffmpeg_args(video_path, segment, &settings.codec, &output_path);
                ExportJob {
                    segment: segment.clone(),
                    output_path,
                    args,
                }
            })
            .collect();

        Ok(Self {
            video_path: video_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            jobs,
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.jobs.iter().map(|j| j.output_path.clone()).collect()
    }

    fn check_inputs(&self) -> Result<()> {
        if !self.video_path.exists() {
            return Err(RenderError::FileNotFound(self.video_path.clone()));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}

/// `{video_stem}_l{layer}-{title}.{ext}`. An empty title becomes `partNNN`
/// from the segment's position in the export.
pub fn output_file_name(
    video_path: &Path,
    segment: &ExportSegment,
    index: usize,
    extension: &str,
) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let mut title = sanitize_title(&segment.title);
    if title.is_empty() {
        title = default_title(index + 1);
    }
    format!("{stem}_l{}-{title}.{extension}", segment.layer)
}

/// Build ffmpeg args for one segment.
pub fn build_ffmpeg_args(
    video_path: &Path,
    segment: &ExportSegment,
    codec: &str,
    output_path: &Path,
) -> Vec<String> {
    let frame_count = (segment.end_frame - segment.start_frame).max(0);
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{:.3}", segment.start_seconds()),
        "-i".to_string(),
        video_path.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{:.3}", segment.duration_seconds()),
        "-frames:v".to_string(),
        frame_count.to_string(),
        "-c:v".to_string(),
        codec.to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Run the plan one file at a time. `progress(completed, total)` is called
/// before each file and once at the end. The first failure stops the export;
/// files already written stay on disk.
pub fn execute(plan: &ExportPlan, progress: &mut dyn FnMut(usize, usize)) -> Result<Vec<PathBuf>> {
    plan.check_inputs()?;
    let total = plan.len();

    for (index, job) in plan.jobs.iter().enumerate() {
        progress(index, total);
        debug!(args = ?job.args, "running ffmpeg");

        let output = std::process::Command::new("ffmpeg")
            .args(&job.args)
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(output = %job.output_path.display(), "ffmpeg failed");
            return Err(RenderError::FfmpegFailed(last_line(&stderr, output.status)));
        }
        info!(output = %job.output_path.display(), "segment exported");
    }

    progress(total, total);
    Ok(plan.outputs())
}

/// Async variant of [`execute`]; progress goes out on a watch channel.
pub async fn execute_async(
    plan: &ExportPlan,
    progress_tx: tokio::sync::watch::Sender<ExportProgress>,
) -> Result<Vec<PathBuf>> {
    use std::process::Stdio;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::process::Command;

    plan.check_inputs()?;
    let total = plan.len();

    for (index, job) in plan.jobs.iter().enumerate() {
        let _ = progress_tx.send(ExportProgress {
            completed: index,
            total,
            current: Some(job.output_path.clone()),
        });
        debug!(args = ?job.args, "running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let mut last = String::new();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    last = line;
                }
            }
        }

        let status = child.wait().await.map_err(RenderError::Io)?;
        if !status.success() {
            warn!(output = %job.output_path.display(), "ffmpeg failed");
            return Err(RenderError::FfmpegFailed(last_line(&last, status)));
        }
        info!(output = %job.output_path.display(), "segment exported");
    }

    let _ = progress_tx.send(ExportProgress {
        completed: total,
        total,
        current: None,
    });
    Ok(plan.outputs())
}

// ---------------------------------------------------------------------------
// ExportSink
// ---------------------------------------------------------------------------

/// [`ExportSink`] that shells out to ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegExporter {
    pub settings: ExportSettings,
}

impl FfmpegExporter {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            settings: ExportSettings::from(config),
        }
    }

    pub fn plan(
        &self,
        video_path: &Path,
        segments: &[ExportSegment],
        output_dir: &Path,
    ) -> Result<ExportPlan> {
        ExportPlan::build(video_path, segments, output_dir, &self.settings)
    }
}

impl ExportSink for FfmpegExporter {
    fn export(
        &self,
        video_path: &Path,
        segments: &[ExportSegment],
        output_dir: &Path,
        progress: &mut dyn FnMut(usize, usize),
    ) -> layercut_core::error::Result<Vec<PathBuf>> {
        let plan = self.plan(video_path, segments, output_dir)?;
        Ok(execute(&plan, progress)?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a failed ffmpeg spawn; a missing binary gets its own variant.
pub(crate) fn spawn_error(e: std::io::Error) -> RenderError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RenderError::FfmpegNotFound
    } else {
        RenderError::Io(e)
    }
}

fn last_line(stderr: &str, status: std::process::ExitStatus) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("ffmpeg exited with {status}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
