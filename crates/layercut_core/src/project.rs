use crate::error::{CoreError, Result};
use crate::media::{MediaInfo, MediaProbe};
use crate::types::*;
use std::path::{Path, PathBuf};
use tracing::info;

impl VideoProject {
    /// Start an empty project for a probed video.
    pub fn new(video_path: impl Into<PathBuf>, media: MediaInfo) -> Self {
        let segments = SegmentManager::new(media.frame_rate, media.total_frames);
        Self {
            video_path: video_path.into(),
            output_path: None,
            media,
            segments,
            file_path: None,
        }
    }

    /// Length of the video in seconds.
    pub fn duration(&self) -> f64 {
        self.media.duration_seconds()
    }

    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            video_path: self.video_path.clone(),
            output_path: self.output_path.clone(),
            segment_list: self.segments.to_records(),
        }
    }

    /// Write the project as pretty-printed JSON and remember where it went.
    /// Appends `.json` when `path` has no extension.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_extension(path.as_ref());
        let json = serde_json::to_string_pretty(&self.to_file())?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), segments = self.segments.len(), "project saved");
        self.file_path = Some(path.clone());
        Ok(path)
    }

    /// Save back to the file this project was loaded from or last saved to.
    pub fn save_in_place(&mut self) -> Result<PathBuf> {
        let path = self.file_path.clone().ok_or_else(|| {
            CoreError::InvalidOperation("project has not been saved yet".into())
        })?;
        self.save(path)
    }

    /// Load a project file, probing its video for frame rate and length.
    pub fn load(path: impl AsRef<Path>, probe: &dyn MediaProbe) -> Result<Self> {
        let path = path.as_ref();
        let file = read_file(path)?;
        let media = probe.probe(&file.video_path)?;
        let project = Self::from_file(file, media, Some(path.to_path_buf()))?;
        info!(
            path = %path.display(),
            segments = project.segments.len(),
            "project loaded"
        );
        Ok(project)
    }

    /// Build a project from an already parsed file and known media info.
    pub fn from_file(
        file: ProjectFile,
        media: MediaInfo,
        file_path: Option<PathBuf>,
    ) -> Result<Self> {
        let segments =
            SegmentManager::from_records(media.frame_rate, media.total_frames, file.segment_list)?;
        Ok(Self {
            video_path: file.video_path,
            output_path: file.output_path,
            media,
            segments,
            file_path,
        })
    }

    /// Folder exports go to: the configured output path, otherwise the
    /// video's own folder.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_path {
            Some(dir) => dir.clone(),
            None => self
                .video_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

/// Parse a project file without touching the video it points to.
pub fn read_file(path: impl AsRef<Path>) -> Result<ProjectFile> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let file: ProjectFile = serde_json::from_str(&data)?;
    Ok(file)
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("json")
    }
}
