use crate::args::{Command, SortKey};
use anyhow::{bail, Context, Result};
use layercut_core::config::EditorConfig;
use layercut_core::editor::{EditOutcome, Editor};
use layercut_core::media::ExportSegment;
use layercut_core::project::read_file;
use layercut_core::timecode::{format_time, parse_time, TimeFormat};
use layercut_core::types::{ProjectFile, VideoProject};
use layercut_render::export::{execute_async, ExportProgress, FfmpegExporter};
use layercut_render::probe::{probe_media, FfprobeProbe};
use layercut_render::snapshot::{extract_snapshot, snapshot_file_name};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn dispatch(command: Command, config: &EditorConfig) -> Result<()> {
    match command {
        Command::Help => Ok(()),
        Command::Probe { video } => probe(&video),
        Command::New {
            video,
            project,
            output,
        } => new_project(&video, &project, output),
        Command::List { project, layer } => {
            let file = read_file(&project)
                .with_context(|| format!("failed to read {}", project.display()))?;
            for line in format_listing(&file, layer, config.time_format) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Mark {
            project,
            layer,
            start,
            end,
            title,
        } => {
            let mut vp = load_project(&project)?;
            let id = mark_segment(&mut vp, config, layer, &start, &end, title.as_deref())?;
            vp.save_in_place()?;
            println!("{id}");
            Ok(())
        }
        Command::Delete { project, id } => {
            let mut vp = load_project(&project)?;
            let mut editor = Editor::new(config.clone());
            editor.delete_segment(&mut vp.segments, id)?;
            vp.save_in_place()?;
            Ok(())
        }
        Command::Reindex { project } => {
            let mut vp = load_project(&project)?;
            Editor::new(config.clone()).reindex(&mut vp.segments)?;
            vp.save_in_place()?;
            Ok(())
        }
        Command::Sort { project, key } => {
            let mut vp = load_project(&project)?;
            let mut editor = Editor::new(config.clone());
            match key {
                SortKey::Title => editor.sort_by_title(&mut vp.segments)?,
                SortKey::Start => editor.sort_by_start_time(&mut vp.segments)?,
            };
            vp.save_in_place()?;
            Ok(())
        }
        Command::Export {
            project,
            all_layers,
            layer,
            output,
        } => export(&project, all_layers, layer, output, config),
        Command::Snapshot {
            project,
            at,
            output,
        } => snapshot(&project, &at, output, config),
    }
}

fn load_project(path: &Path) -> Result<VideoProject> {
    VideoProject::load(path, &FfprobeProbe)
        .with_context(|| format!("failed to load project {}", path.display()))
}

fn probe(video: &Path) -> Result<()> {
    let info = probe_media(video).with_context(|| format!("failed to probe {}", video.display()))?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn new_project(video: &Path, project: &Path, output: Option<PathBuf>) -> Result<()> {
    let media = probe_media(video).with_context(|| format!("failed to probe {}", video.display()))?;
    let mut vp = VideoProject::new(video, media);
    vp.output_path = output;
    let saved = vp
        .save(project)
        .with_context(|| format!("failed to write {}", project.display()))?;
    println!("{}", saved.display());
    Ok(())
}

/// Mark one segment the way the start/end buttons would: the start snaps
/// forward and the end snaps back to free time on `layer`.
pub fn mark_segment(
    project: &mut VideoProject,
    config: &EditorConfig,
    layer: u32,
    start: &str,
    end: &str,
    title: Option<&str>,
) -> Result<u32> {
    check_layer(layer, config)?;
    let start = parse_time(start)?;
    let end = parse_time(end)?;

    let timeline = &mut project.segments;
    let mut editor = Editor::new(config.clone());
    editor.set_layer(layer)?;
    editor.seek_time(timeline, start);
    editor.set_start_point(timeline)?;
    editor.seek_time(timeline, end);

    let id = match editor.set_end_point(timeline)? {
        EditOutcome::SegmentAdded { id, .. } => id,
        other => bail!("unexpected edit outcome: {other:?}"),
    };
    if let Some(title) = title {
        editor.rename_segment(timeline, id, title)?;
    }
    Ok(id)
}

/// Reject layers outside `1..=layer_count` instead of letting the editor
/// clamp them.
fn check_layer(layer: u32, config: &EditorConfig) -> Result<()> {
    if layer == 0 || layer > config.layer_count {
        bail!("layer must be between 1 and {}", config.layer_count);
    }
    Ok(())
}

/// One line per segment, in file order.
pub fn format_listing(file: &ProjectFile, layer: Option<u32>, format: TimeFormat) -> Vec<String> {
    file.segment_list
        .iter()
        .filter(|r| layer.map_or(true, |l| r.layer == l))
        .map(|r| {
            let id = r.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
            format!(
                "{id:>4}  L{}  {}  {}  {}  {}",
                r.layer,
                format_time(r.start, format),
                format_time(r.end, format),
                format_time(r.end - r.start, format),
                r.title
            )
        })
        .collect()
}

/// Segments an export of `layer` (or every layer) would write.
pub fn export_targets(
    project: &VideoProject,
    config: &EditorConfig,
    layer: u32,
    all_layers: bool,
) -> Result<Vec<ExportSegment>> {
    check_layer(layer, config)?;
    let mut editor = Editor::new(config.clone());
    editor.set_layer(layer)?;
    Ok(editor.export_targets(&project.segments, all_layers)?)
}

fn export(
    project: &Path,
    all_layers: bool,
    layer: u32,
    output: Option<PathBuf>,
    config: &EditorConfig,
) -> Result<()> {
    let vp = load_project(project)?;
    let targets = export_targets(&vp, config, layer, all_layers)?;
    let output_dir = output.unwrap_or_else(|| vp.output_dir());

    let plan = FfmpegExporter::new(config).plan(&vp.video_path, &targets, &output_dir)?;
    info!(files = plan.len(), dir = %output_dir.display(), "export started");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let written = runtime.block_on(async {
        let (progress_tx, mut progress_rx) =
            tokio::sync::watch::channel(ExportProgress::default());

        // Spawn progress reporter
        let reporter = tokio::spawn(async move {
            while progress_rx.changed().await.is_ok() {
                let progress = progress_rx.borrow().clone();
                if let Some(current) = &progress.current {
                    info!(
                        completed = progress.completed,
                        total = progress.total,
                        file = %current.display(),
                        "exporting"
                    );
                }
            }
        });

        let result = execute_async(&plan, progress_tx).await;
        let _ = reporter.await;
        result
    })?;

    info!(files = written.len(), "export complete");
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn snapshot(project: &Path, at: &str, output: Option<PathBuf>, config: &EditorConfig) -> Result<()> {
    let vp = load_project(project)?;
    let seconds = parse_time(at)?;
    let mut editor = Editor::new(config.clone());
    let frame = editor.seek_time(&vp.segments, seconds);

    let dir = output.unwrap_or_else(|| vp.output_dir());
    let name = snapshot_file_name(&vp.video_path, frame, vp.media.frame_rate);
    let saved = extract_snapshot(&vp.video_path, frame, vp.media.frame_rate, &dir.join(name))?;
    println!("{}", saved.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layercut_core::editor::EditWarning;
    use layercut_core::media::MediaInfo;

    fn make_project() -> VideoProject {
        VideoProject::new("/videos/talk.mp4", MediaInfo::new(30.0, 300))
    }

    #[test]
    fn mark_adds_titled_segment() {
        let mut vp = make_project();
        let config = EditorConfig::default();
        let id = mark_segment(&mut vp, &config, 2, "00:01", "3.5", Some("intro")).unwrap();

        let seg = vp.segments.get_by_id(id).unwrap();
        assert_eq!(seg.layer, 2);
        assert_eq!(seg.title, "intro");
        assert_eq!((seg.start_frame, seg.end_frame), (30, 105));
    }

    #[test]
    fn mark_snaps_around_existing_segments() {
        let mut vp = make_project();
        vp.segments.append(1, 60, 90, None);
        let config = EditorConfig::default();

        let id = mark_segment(&mut vp, &config, 1, "2.5", "5", None).unwrap();
        let seg = vp.segments.get_by_id(id).unwrap();
        assert_eq!((seg.start_frame, seg.end_frame), (90, 150));
        assert_eq!(seg.title, "part002");
    }

    #[test]
    fn mark_reports_editor_warnings() {
        let mut vp = make_project();
        vp.segments.append(1, 0, 300, None);
        let config = EditorConfig::default();

        let err = mark_segment(&mut vp, &config, 1, "1", "2", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EditWarning>(),
            Some(&EditWarning::NoFreeSpaceForStart)
        );
        assert!(mark_segment(&mut vp, &config, 4, "1", "2", None).is_err());
        assert!(mark_segment(&mut vp, &config, 2, "soon", "2", None).is_err());
        assert_eq!(vp.segments.len(), 1);
    }

    #[test]
    fn export_targets_reject_unconfigured_layer() {
        let mut vp = make_project();
        vp.segments.append(3, 0, 30, Some("third".into()));
        vp.segments.append(1, 30, 60, None);
        let config = EditorConfig::default();

        let err = export_targets(&vp, &config, 7, false).unwrap_err();
        assert!(err.to_string().contains("between 1 and 3"));
        assert!(export_targets(&vp, &config, 0, false).is_err());

        let third = export_targets(&vp, &config, 3, false).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].title, "third");
        assert_eq!(export_targets(&vp, &config, 1, true).unwrap().len(), 2);
    }

    #[test]
    fn listing_filters_by_layer() {
        let mut vp = make_project();
        vp.segments.append(1, 0, 45, None);
        vp.segments.append(2, 30, 60, Some("b-roll".into()));
        let file = vp.to_file();

        let all = format_listing(&file, None, TimeFormat::MinutesColon);
        assert_eq!(all.len(), 2);
        assert!(all[0].contains("00:00.000"));
        assert!(all[0].contains("00:01.500"));
        assert!(all[0].ends_with("part001"));

        let layer2 = format_listing(&file, Some(2), TimeFormat::Seconds);
        assert_eq!(layer2.len(), 1);
        assert!(layer2[0].contains("L2"));
        assert!(layer2[0].ends_with("b-roll"));
    }
}
