// crates/dataset_gen/src/main.rs
mod classes;
mod labels;
mod pipeline;
mod session;

use clap::Parser;
use render_core::povray::RenderConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// `dataset_gen` - renders synthetic 3D-glyph captcha sessions across the
/// full viewpoint grid and writes a YOLO-style detection dataset.
///
/// Every (session, viewpoint) sample yields one composite image and one
/// label file listing the glyphs that are actually legible there, resolved
/// by pixel-exact occlusion over per-glyph masks.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Dataset output root; `images/`, `labels/` and the manifest land here.
    #[arg(long, env = "DATASET_OUT_DIR", default_value = "dataset")]
    out_dir: PathBuf,

    /// Number of synthetic sessions to render.
    #[arg(long, env = "DATASET_SESSIONS", default_value_t = 207)]
    sessions: u32,

    /// Fan-out limit: concurrent render tasks per batch.
    #[arg(long, env = "DATASET_BATCH_SIZE", default_value_t = 128)]
    batch_size: usize,

    /// Rendered image width and height in pixels.
    #[arg(long, default_value_t = 400)]
    image_size: u32,

    /// External renderer binary.
    #[arg(long, env = "RENDERER_BIN", default_value = "povray")]
    renderer_bin: String,

    /// Wall-clock timeout per renderer invocation, in seconds.
    #[arg(long, default_value_t = 30)]
    render_timeout_secs: u64,

    /// Root for per-session renderer scratch directories.
    #[arg(long, env = "RENDER_SCRATCH_ROOT", default_value = "/dev/shm/captcha_render")]
    scratch_root: PathBuf,

    /// Per-sample probability of landing in the validation split.
    #[arg(long, default_value_t = 0.05)]
    val_fraction: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!(args = ?args, "dataset generator starting");

    let render_cfg = RenderConfig {
        image_size: args.image_size,
        renderer_bin: args.renderer_bin,
        render_timeout: Duration::from_secs(args.render_timeout_secs),
        scratch_root: args.scratch_root,
        ..RenderConfig::default()
    };
    let pipeline_cfg = pipeline::PipelineConfig {
        out_dir: args.out_dir,
        sessions: args.sessions,
        batch_size: args.batch_size,
        val_fraction: args.val_fraction,
    };

    pipeline::run(pipeline_cfg, render_cfg).await
}
