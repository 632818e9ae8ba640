// crates/render_core/src/mask.rs
//! Per-glyph silhouette rendering and scanning.
//!
//! A mask answers exactly one question: which pixels does this glyph occupy
//! at this viewpoint. It is rendered unlit and alias-free, so a pixel is
//! either part of the glyph (any nonzero RGB channel) or pure background.

use crate::error::RenderError;
use crate::geometry;
use crate::povray::{self, Antialias, RenderConfig};
use crate::scene::{Glyph, PixelBox, Viewpoint};
use image::RgbaImage;

/// Lit-pixel grid of one glyph at one viewpoint.
#[derive(Debug, Clone)]
pub struct Mask {
    width: u32,
    height: u32,
    lit: Vec<bool>,
}

impl Mask {
    /// Builds a mask from per-pixel lit flags, row-major. `lit` must hold
    /// exactly `width * height` entries.
    pub fn new(width: u32, height: u32, lit: Vec<bool>) -> Self {
        assert_eq!(lit.len(), (width * height) as usize);
        Self { width, height, lit }
    }

    /// Thresholds a rendered RGBA frame: a pixel belongs to the glyph when
    /// any color channel is nonzero.
    pub fn from_rgba(img: &RgbaImage) -> Self {
        let lit = img
            .pixels()
            .map(|p| p.0[0] != 0 || p.0[1] != 0 || p.0[2] != 0)
            .collect();
        Self {
            width: img.width(),
            height: img.height(),
            lit,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        self.lit[(y * self.width + x) as usize]
    }

    /// Lit-pixel count.
    pub fn area(&self) -> u64 {
        self.lit.iter().filter(|&&l| l).count() as u64
    }

    /// Tight bbox over lit pixels, or `None` for an all-dark mask.
    pub fn bbox(&self) -> Option<PixelBox> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_lit(x, y) {
                    any = true;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                }
            }
        }

        any.then(|| PixelBox {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        })
    }
}

/// Everything the occlusion resolver needs to know about one glyph at one
/// viewpoint. Ephemeral; rebuilt on every labeling call.
#[derive(Debug, Clone)]
pub struct GlyphMaskInfo {
    pub glyph_id: String,
    pub text: String,
    pub mask: Mask,
    pub bbox: Option<PixelBox>,
    pub area: u64,
    /// Camera-relative depth; larger = farther.
    pub depth: f64,
    /// Double-cone facing flag from the geometry engine.
    pub facing: bool,
}

impl GlyphMaskInfo {
    /// Assembles the info record from an already-scanned mask plus the
    /// glyph's pose at `vp`. Split out from the render path so occlusion
    /// logic is testable with synthetic masks.
    pub fn from_mask(glyph: &Glyph, vp: Viewpoint, mask: Mask) -> Self {
        Self {
            glyph_id: glyph.id.clone(),
            text: glyph.text.clone(),
            bbox: mask.bbox(),
            area: mask.area(),
            depth: geometry::depth_along_view(glyph.position, vp),
            facing: geometry::is_facing(glyph, vp),
            mask,
        }
    }
}

/// Renders the unlit single-glyph mask scene and scans it.
///
/// Renderer failure, timeout or missing output propagates as-is; an empty
/// mask is never substituted.
pub async fn render_glyph_mask(
    cfg: &RenderConfig,
    session_id: &str,
    glyph: &Glyph,
    vp: Viewpoint,
) -> Result<GlyphMaskInfo, RenderError> {
    let stem = format!(
        "{}_{}_{}_mask",
        povray::sanitize(session_id),
        povray::sanitize(&glyph.id),
        vp.key()
    );
    let scene = povray::mask_scene(glyph, vp);
    let frame = povray::render_scene(cfg, session_id, &stem, &scene, Antialias::Off).await?;

    Ok(GlyphMaskInfo::from_mask(
        glyph,
        vp,
        Mask::from_rgba(&frame.rgba),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rgba_threshold_treats_any_channel_as_lit() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 2, Rgba([0, 0, 7, 255]));
        img.put_pixel(3, 0, Rgba([255, 255, 255, 255]));

        let mask = Mask::from_rgba(&img);
        assert!(mask.is_lit(1, 2));
        assert!(mask.is_lit(3, 0));
        assert!(!mask.is_lit(0, 0));
        assert_eq!(mask.area(), 2);
    }

    #[test]
    fn bbox_is_tight_over_lit_pixels() {
        let mut lit = vec![false; 36];
        // Lit block covering x in 2..=4, y in 1..=3 of a 6x6 grid.
        for y in 1..=3u32 {
            for x in 2..=4u32 {
                lit[(y * 6 + x) as usize] = true;
            }
        }
        let mask = Mask::new(6, 6, lit);
        assert_eq!(mask.bbox(), Some(PixelBox { x: 2, y: 1, w: 3, h: 3 }));
        assert_eq!(mask.area(), 9);
    }

    #[test]
    fn dark_mask_has_no_bbox() {
        let mask = Mask::new(5, 5, vec![false; 25]);
        assert_eq!(mask.bbox(), None);
        assert_eq!(mask.area(), 0);
    }
}
