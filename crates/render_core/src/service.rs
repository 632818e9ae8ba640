// crates/render_core/src/service.rs
//! Render-and-label facade.
//!
//! One [`RenderService`] is constructed per pipeline run (or per server
//! process) and owns the renderer configuration plus the composite cache.
//! Nothing here is a process-wide singleton; drop the service and its state
//! goes with it.

use crate::cache::{CacheKey, RenderCache};
use crate::error::RenderError;
use crate::mask::{self, GlyphMaskInfo};
use crate::occlusion;
use crate::povray::{self, Antialias, RenderConfig};
use crate::scene::{ClickRegion, SessionScene, Viewpoint};
use bytes::Bytes;
use std::collections::HashSet;

/// Composite image plus the per-view click regions.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub image: Bytes,
    pub regions: Vec<ClickRegion>,
}

pub struct RenderService {
    config: RenderConfig,
    cache: RenderCache,
}

impl RenderService {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            cache: RenderCache::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders the full scene at `vp` and resolves which glyphs are legible
    /// there.
    ///
    /// The composite is memoized per (session, viewpoint): a hit returns the
    /// prior bytes without invoking the renderer. Masks are view-dependent
    /// scratch data and are re-rendered on every call, one renderer
    /// invocation per glyph, sequentially within the call.
    pub async fn render_and_label(
        &self,
        scene: &SessionScene,
        vp: Viewpoint,
    ) -> Result<RenderOutcome, RenderError> {
        let image = self.composite_image(scene, vp).await?;

        let mut infos: Vec<GlyphMaskInfo> = Vec::with_capacity(scene.glyphs.len());
        for glyph in &scene.glyphs {
            infos.push(mask::render_glyph_mask(&self.config, &scene.session_id, glyph, vp).await?);
        }

        let regions = occlusion::resolve_click_regions(&infos);
        tracing::debug!(
            session_id = %scene.session_id,
            view = %vp.key(),
            glyphs = scene.glyphs.len(),
            regions = regions.len(),
            "labeled viewpoint"
        );

        Ok(RenderOutcome { image, regions })
    }

    async fn composite_image(
        &self,
        scene: &SessionScene,
        vp: Viewpoint,
    ) -> Result<Bytes, RenderError> {
        let key = CacheKey::new(&scene.session_id, vp.key());
        if let Some(image) = self.cache.get(&key) {
            return Ok(image);
        }

        let stem = format!("{}_{}", povray::sanitize(&scene.session_id), vp.key());
        let text = povray::composite_scene(&scene.glyphs, vp);
        let frame =
            povray::render_scene(&self.config, &scene.session_id, &stem, &text, Antialias::Smooth)
                .await?;

        self.cache.insert(key, frame.png.clone());
        Ok(frame.png)
    }

    /// Drops all cached composites of one session.
    pub fn invalidate_session(&self, session_id: &str) {
        self.cache.invalidate_session(session_id);
    }

    /// Drops cache entries for sessions absent from `valid_sessions`.
    pub fn sweep_sessions(&self, valid_sessions: &HashSet<String>) {
        self.cache.sweep(valid_sessions);
    }

    /// Best-effort removal of the session's scratch directory. Failure is
    /// logged and swallowed; scratch files are disposable.
    pub async fn cleanup_session_scratch(&self, session_id: &str) {
        let dir = self.config.scratch_dir(session_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %e, "scratch cleanup failed");
            }
        }
    }
}
