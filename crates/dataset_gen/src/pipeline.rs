// crates/dataset_gen/src/pipeline.rs
//! Batch rendering-and-labeling over sessions × the viewpoint grid.
//!
//! Concurrency model: the grid is split into fixed-size batches; each
//! batch's tasks run concurrently, batches run strictly in sequence. The
//! batch boundary is a hard barrier that caps how many renderer processes
//! and scratch files exist at once. Any task failure aborts the whole run;
//! there are no retries and no cancellation of tasks already in flight.

use crate::classes::CAPTCHA_CHARS;
use crate::{labels, session};
use anyhow::{ensure, Context, Result};
use rand::Rng;
use render_core::povray::RenderConfig;
use render_core::{RenderService, SessionScene, Viewpoint};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const GRID_MIN_DEG: i32 = -85;
const GRID_MAX_DEG: i32 = 85;
const GRID_STEP_DEG: usize = 5;

const MANIFEST_FILE: &str = "captcha.yaml";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub out_dir: PathBuf,
    pub sessions: u32,
    /// Fan-out limit: concurrent render tasks per batch.
    pub batch_size: usize,
    pub val_fraction: f64,
}

/// The fixed camera grid: every (pitch, yaw) in [-85°, 85°] stepped by 5°.
pub fn viewpoint_grid() -> Vec<Viewpoint> {
    let mut grid = Vec::new();
    for pitch in (GRID_MIN_DEG..=GRID_MAX_DEG).step_by(GRID_STEP_DEG) {
        for yaw in (GRID_MIN_DEG..=GRID_MAX_DEG).step_by(GRID_STEP_DEG) {
            grid.push(Viewpoint::new(pitch, yaw));
        }
    }
    grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Split {
    Train,
    Val,
}

impl Split {
    const ALL: [Split; 2] = [Split::Train, Split::Val];

    fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }

    /// Per-sample draw (not per-session; near-identical renders of one
    /// session can land on both sides of the split).
    fn draw(rng: &mut impl Rng, val_fraction: f64) -> Split {
        if rng.gen::<f64>() < val_fraction {
            Split::Val
        } else {
            Split::Train
        }
    }
}

pub async fn run(cfg: PipelineConfig, render_cfg: RenderConfig) -> Result<()> {
    ensure!(cfg.batch_size > 0, "batch size must be at least 1");
    ensure!(
        (0.0..=1.0).contains(&cfg.val_fraction),
        "val fraction must be within [0, 1]"
    );

    let grid = viewpoint_grid();
    prepare_output_dirs(&cfg.out_dir).await?;

    let image_size = render_cfg.image_size;
    let service = Arc::new(RenderService::new(render_cfg));

    tracing::info!(
        sessions = cfg.sessions,
        views_per_session = grid.len(),
        batch_size = cfg.batch_size,
        "generating dataset"
    );

    for i in 0..cfg.sessions {
        let scene = Arc::new(session::generate_session(&mut rand::thread_rng(), &grid));
        tracing::info!(
            session = i + 1,
            total = cfg.sessions,
            session_id = %scene.session_id,
            "rendering session"
        );

        for batch in grid.chunks(cfg.batch_size) {
            let handles: Vec<_> = batch
                .iter()
                .copied()
                .map(|vp| {
                    let service = service.clone();
                    let scene = scene.clone();
                    let out_dir = cfg.out_dir.clone();
                    let val_fraction = cfg.val_fraction;
                    tokio::spawn(async move {
                        render_one_sample(&service, &scene, vp, &out_dir, image_size, val_fraction)
                            .await
                    })
                })
                .collect();

            // Barrier: every task of this batch settles before the next
            // batch starts; the first failure aborts the run.
            let results = futures::future::try_join_all(handles)
                .await
                .context("render task panicked")?;
            for result in results {
                result?;
            }
        }

        // The session will never be requested again; drop its composites
        // and (best-effort) its scratch files.
        service.invalidate_session(&scene.session_id);
        service.cleanup_session_scratch(&scene.session_id).await;
    }

    write_manifest(&cfg.out_dir).await?;
    tracing::info!(out_dir = %cfg.out_dir.display(), "dataset complete");
    Ok(())
}

/// Renders and labels one (session, viewpoint) sample and writes the
/// image/label pair.
async fn render_one_sample(
    service: &RenderService,
    scene: &SessionScene,
    vp: Viewpoint,
    out_dir: &Path,
    image_size: u32,
    val_fraction: f64,
) -> Result<()> {
    let outcome = service
        .render_and_label(scene, vp)
        .await
        .with_context(|| format!("rendering session {} at {}", scene.session_id, vp.key()))?;

    let split = Split::draw(&mut rand::thread_rng(), val_fraction);
    let stem = format!("{}_rx{}_ry{}", scene.session_id, vp.pitch, vp.yaw);

    let image_path = out_dir
        .join("images")
        .join(split.as_str())
        .join(format!("{stem}.png"));
    tokio::fs::write(&image_path, &outcome.image)
        .await
        .with_context(|| format!("writing {}", image_path.display()))?;

    let lines = labels::format_label_lines(&outcome.regions, &scene.glyphs, image_size)?;
    let label_path = out_dir
        .join("labels")
        .join(split.as_str())
        .join(format!("{stem}.txt"));
    tokio::fs::write(&label_path, lines)
        .await
        .with_context(|| format!("writing {}", label_path.display()))?;

    Ok(())
}

/// Clears any previous `images/` and `labels/` trees and recreates the
/// split directory structure.
async fn prepare_output_dirs(out_dir: &Path) -> Result<()> {
    for tree in ["images", "labels"] {
        let root = out_dir.join(tree);
        match tokio::fs::remove_dir_all(&root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("clearing {}", root.display())),
        }
        for split in Split::ALL {
            tokio::fs::create_dir_all(root.join(split.as_str()))
                .await
                .with_context(|| format!("creating {} {} directory", tree, split.as_str()))?;
        }
    }
    Ok(())
}

/// Writes the YOLO dataset manifest: absolute root path, split subpaths and
/// the id → character table.
async fn write_manifest(out_dir: &Path) -> Result<()> {
    let root = tokio::fs::canonicalize(out_dir)
        .await
        .with_context(|| format!("resolving {}", out_dir.display()))?;

    let mut yaml = String::new();
    let _ = writeln!(yaml, "path: {}", root.display());
    let _ = writeln!(yaml, "train: images/train");
    let _ = writeln!(yaml, "val: images/val");
    yaml.push('\n');
    let _ = writeln!(yaml, "names:");
    for (id, ch) in CAPTCHA_CHARS.iter().enumerate() {
        let _ = writeln!(yaml, "  {id}: \"{ch}\"");
    }

    let path = out_dir.join(MANIFEST_FILE);
    tokio::fs::write(&path, yaml)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_1225_poses_inclusive_of_bounds() {
        let grid = viewpoint_grid();
        assert_eq!(grid.len(), 35 * 35);
        assert_eq!(grid.first(), Some(&Viewpoint::new(-85, -85)));
        assert_eq!(grid.last(), Some(&Viewpoint::new(85, 85)));
        assert!(grid.contains(&Viewpoint::new(0, 0)));
        assert!(grid.iter().all(|vp| vp.pitch % 5 == 0 && vp.yaw % 5 == 0));
    }

    #[test]
    fn split_draw_respects_fraction_extremes() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert_eq!(Split::draw(&mut rng, 0.0), Split::Train);
            assert_eq!(Split::draw(&mut rng, 1.0), Split::Val);
        }
    }

    #[tokio::test]
    async fn manifest_lists_root_splits_and_class_table() {
        let dir = std::env::temp_dir().join(format!("dataset_gen_test_{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        write_manifest(&dir).await.unwrap();
        let yaml = tokio::fs::read_to_string(dir.join(MANIFEST_FILE)).await.unwrap();

        assert!(yaml.starts_with("path: "));
        assert!(yaml.contains("train: images/train"));
        assert!(yaml.contains("val: images/val"));
        assert!(yaml.contains("  0: \"A\""));
        assert!(yaml.contains("  35: \"=\""));
        assert_eq!(yaml.matches(": \"").count(), CAPTCHA_CHARS.len());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn output_dirs_are_cleared_and_recreated() {
        let dir = std::env::temp_dir().join(format!("dataset_gen_dirs_{}", uuid::Uuid::new_v4()));
        let stale = dir.join("images").join("train").join("old.png");
        tokio::fs::create_dir_all(stale.parent().unwrap()).await.unwrap();
        tokio::fs::write(&stale, b"stale").await.unwrap();

        prepare_output_dirs(&dir).await.unwrap();

        assert!(!stale.exists());
        for tree in ["images", "labels"] {
            for split in ["train", "val"] {
                assert!(dir.join(tree).join(split).is_dir());
            }
        }

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
