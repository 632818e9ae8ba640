// crates/render_core/src/povray.rs
//! POV-Ray boundary: scene description emission and process invocation.
//!
//! The core never rasterizes anything itself. It writes a textual scene to a
//! per-session scratch directory, runs the `povray` binary with explicit
//! output path, pixel dimensions, quality and anti-aliasing flags under a
//! wall-clock timeout, and reads back the PNG it declared. Composite and
//! mask scenes share one camera block so silhouettes align pixel-for-pixel
//! with the lit image.

use crate::error::RenderError;
use crate::geometry;
use crate::scene::{Glyph, Rgb, Viewpoint};
use bytes::Bytes;
use image::RgbaImage;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

const FIELD_OF_VIEW_DEG: u32 = 60;
const FONT_FILE: &str = "crystal.ttf";

/// Settings shared by every renderer invocation of one pipeline run.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output width and height in pixels (frames are square).
    pub image_size: u32,
    /// POV-Ray `+Q` quality level.
    pub quality: u8,
    /// Renderer binary name or path.
    pub renderer_bin: String,
    /// Wall-clock limit for a single invocation.
    pub render_timeout: Duration,
    /// Root under which per-session scratch directories are created.
    pub scratch_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_size: 400,
            quality: 9,
            renderer_bin: "povray".into(),
            render_timeout: Duration::from_secs(30),
            scratch_root: PathBuf::from("/dev/shm/captcha_render"),
        }
    }
}

impl RenderConfig {
    pub fn scratch_dir(&self, session_id: &str) -> PathBuf {
        self.scratch_root.join(sanitize(session_id))
    }
}

/// Anti-aliasing mode of one invocation. Masks must stay alias-free so the
/// lit-pixel test is exact; the composite is smoothed for human eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialias {
    Smooth,
    Off,
}

impl Antialias {
    fn flag(self) -> &'static str {
        match self {
            Antialias::Smooth => "+A0.3",
            Antialias::Off => "-A",
        }
    }
}

/// One decoded renderer result: the PNG bytes as written by the renderer
/// plus the decoded RGBA raster.
pub struct RenderedFrame {
    pub png: Bytes,
    pub rgba: RgbaImage,
}

/// Restricts a string to filename-safe characters.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn camera_block(out: &mut String, vp: Viewpoint) {
    let cam = geometry::camera_position(vp);
    let _ = writeln!(out, "camera {{");
    let _ = writeln!(out, "  orthographic");
    let _ = writeln!(
        out,
        "  location <{:.2}, {:.2}, {:.2}>",
        cam.x, cam.y, cam.z
    );
    let _ = writeln!(out, "  look_at <0, 0, 0>");
    let _ = writeln!(out, "  sky <0, 1, 0>");
    let _ = writeln!(out, "  angle {}", FIELD_OF_VIEW_DEG);
    let _ = writeln!(out, "}}");
}

fn text_object(out: &mut String, glyph: &Glyph, color: Rgb, ambient: f64, diffuse: f64) {
    let depth = glyph.extrusion_depth * glyph.scale;
    let size = glyph.font_size * glyph.scale;
    let rot = glyph.rotation;

    let _ = writeln!(out, "text {{");
    let _ = writeln!(
        out,
        "  ttf \"{}\" \"{}\" {:.2}, 0",
        FONT_FILE, glyph.text, depth
    );
    let _ = writeln!(
        out,
        "  pigment {{ color rgb <{:.3}, {:.3}, {:.3}> }}",
        color.r, color.g, color.b
    );
    let _ = writeln!(out, "  finish {{");
    let _ = writeln!(out, "    ambient {}", ambient);
    let _ = writeln!(out, "    diffuse {}", diffuse);
    let _ = writeln!(out, "  }}");
    let _ = writeln!(out, "  scale {:.2}", size);
    let _ = writeln!(
        out,
        "  rotate <{:.2}, {:.2}, {:.2}>",
        rot.x.to_degrees(),
        rot.y.to_degrees(),
        rot.z.to_degrees()
    );
    let _ = writeln!(
        out,
        "  translate <{:.2}, {:.2}, {:.2}>",
        glyph.position.x, glyph.position.y, glyph.position.z
    );
    let _ = writeln!(out, "}}");
}

/// Full lit scene: shaded background, two shadowless lights, every glyph in
/// its own color.
pub fn composite_scene(glyphs: &[Glyph], vp: Viewpoint) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#version 3.7;");
    let _ = writeln!(out, "global_settings {{ assumed_gamma 1.0 }}");
    out.push('\n');
    camera_block(&mut out, vp);
    out.push('\n');
    let _ = writeln!(out, "background {{ color rgb <0.1, 0.1, 0.18> }}");
    out.push('\n');
    let _ = writeln!(
        out,
        "light_source {{ <10, 15, 20> color rgb <1, 1, 1> shadowless }}"
    );
    let _ = writeln!(
        out,
        "light_source {{ <-10, 5, -10> color rgb <0.3, 0.3, 0.3> shadowless }}"
    );
    for glyph in glyphs {
        out.push('\n');
        text_object(&mut out, glyph, glyph.color, 0.4, 0.6);
    }
    out
}

/// Mask scene: identical camera framing, black background, one unlit white
/// glyph. No lights; `ambient 1, diffuse 0` makes the silhouette uniform.
pub fn mask_scene(glyph: &Glyph, vp: Viewpoint) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#version 3.7;");
    let _ = writeln!(out, "global_settings {{ assumed_gamma 1.0 }}");
    out.push('\n');
    camera_block(&mut out, vp);
    out.push('\n');
    let _ = writeln!(out, "background {{ color rgb <0, 0, 0> }}");
    out.push('\n');
    text_object(&mut out, glyph, Rgb::WHITE, 1.0, 0.0);
    out
}

/// Writes `scene` to the session scratch dir and runs one renderer
/// invocation over it, returning the decoded frame.
///
/// Any process-level problem (spawn failure, nonzero exit, timeout) is a
/// hard [`RenderError::RendererFailed`]; a missing output file is
/// [`RenderError::OutputMissing`]. Callers never receive an empty raster.
pub async fn render_scene(
    cfg: &RenderConfig,
    session_id: &str,
    stem: &str,
    scene: &str,
    antialias: Antialias,
) -> Result<RenderedFrame, RenderError> {
    let dir = cfg.scratch_dir(session_id);
    tokio::fs::create_dir_all(&dir).await?;

    let pov_name = format!("{stem}.pov");
    let png_name = format!("{stem}.png");
    tokio::fs::write(dir.join(&pov_name), scene).await?;

    let mut command = Command::new(&cfg.renderer_bin);
    command
        .arg(format!("+I{pov_name}"))
        .arg(format!("+O{png_name}"))
        .arg(format!("+W{}", cfg.image_size))
        .arg(format!("+H{}", cfg.image_size))
        .arg(format!("+Q{}", cfg.quality))
        .arg("-D")
        .arg(antialias.flag())
        .current_dir(&dir)
        .kill_on_drop(true);

    let output = tokio::time::timeout(cfg.render_timeout, command.output())
        .await
        .map_err(|_| {
            RenderError::RendererFailed(format!(
                "'{}' timed out after {:?} on {}",
                cfg.renderer_bin, cfg.render_timeout, pov_name
            ))
        })?
        .map_err(|e| {
            RenderError::RendererFailed(format!("failed to run '{}': {e}", cfg.renderer_bin))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(
            stem,
            status = %output.status,
            stderr = %stderr.trim(),
            "renderer invocation failed"
        );
        return Err(RenderError::RendererFailed(format!(
            "'{}' exited with {} on {}",
            cfg.renderer_bin, output.status, pov_name
        )));
    }

    let png_path = dir.join(&png_name);
    let png = match tokio::fs::read(&png_path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RenderError::OutputMissing { path: png_path });
        }
        Err(e) => return Err(e.into()),
    };

    let rgba = image::load_from_memory(&png)?.to_rgba8();
    if rgba.width() != cfg.image_size || rgba.height() != cfg.image_size {
        return Err(RenderError::RendererFailed(format!(
            "renderer wrote a {}x{} frame, expected {}x{}",
            rgba.width(),
            rgba.height(),
            cfg.image_size,
            cfg.image_size
        )));
    }

    Ok(RenderedFrame { png, rgba })
}
