// crates/render_core/src/occlusion.rs
//! Pixel-exact occlusion resolution.
//!
//! Visibility is derived from rendered pixel footprints compared in depth
//! order, not from analytic hidden-surface removal. That keeps the result
//! honest about whatever the renderer actually drew (font quirks, extrusion
//! overhangs) at the cost of an O(glyphs² × pixels) scan, which is fine at
//! mask resolution.

use crate::mask::GlyphMaskInfo;
use crate::scene::ClickRegion;

/// A candidate whose lit pixels are covered by nearer glyphs at or above
/// this ratio is dropped entirely.
pub const OCCLUSION_THRESHOLD: f64 = 0.1;

/// Combines per-glyph masks, depths and facing flags into the final click
/// regions for one viewpoint.
///
/// Candidates must be facing (front or back) and have a nonempty mask.
/// Occluders are every *other* glyph with a nonempty mask strictly nearer
/// the camera, regardless of that glyph's own facing status; equal depth
/// never occludes. A surviving candidate always contributes its full mask
/// bbox, never a crop of the visible remainder.
pub fn resolve_click_regions(infos: &[GlyphMaskInfo]) -> Vec<ClickRegion> {
    let mut regions = Vec::new();

    for (i, candidate) in infos.iter().enumerate() {
        if !candidate.facing || candidate.area == 0 {
            continue;
        }
        let Some(bbox) = candidate.bbox else {
            continue;
        };

        let occluders: Vec<&GlyphMaskInfo> = infos
            .iter()
            .enumerate()
            .filter(|(j, o)| *j != i && o.area > 0 && o.depth < candidate.depth)
            .map(|(_, o)| o)
            .collect();

        if occluders.is_empty() {
            regions.push(ClickRegion {
                glyph_id: candidate.glyph_id.clone(),
                bbox,
            });
            continue;
        }

        let mut occluded_pixels = 0u64;
        for y in 0..candidate.mask.height() {
            for x in 0..candidate.mask.width() {
                if !candidate.mask.is_lit(x, y) {
                    continue;
                }
                if occluders.iter().any(|o| o.mask.is_lit(x, y)) {
                    occluded_pixels += 1;
                }
            }
        }

        let ratio = occluded_pixels as f64 / candidate.area as f64;
        if ratio >= OCCLUSION_THRESHOLD {
            tracing::debug!(
                glyph_id = %candidate.glyph_id,
                ratio,
                "glyph dropped as occluded"
            );
            continue;
        }

        regions.push(ClickRegion {
            glyph_id: candidate.glyph_id.clone(),
            bbox,
        });
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;
    use crate::scene::PixelBox;

    const W: u32 = 8;

    /// Square mask with a lit axis-aligned block.
    fn block(x0: u32, y0: u32, w: u32, h: u32) -> Mask {
        let mut lit = vec![false; (W * W) as usize];
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                lit[(y * W + x) as usize] = true;
            }
        }
        Mask::new(W, W, lit)
    }

    fn info(id: &str, mask: Mask, depth: f64, facing: bool) -> GlyphMaskInfo {
        GlyphMaskInfo {
            glyph_id: id.into(),
            text: "A".into(),
            bbox: mask.bbox(),
            area: mask.area(),
            depth,
            facing,
            mask,
        }
    }

    #[test]
    fn empty_mask_yields_no_region() {
        let infos = vec![info("a", Mask::new(W, W, vec![false; (W * W) as usize]), 5.0, true)];
        assert!(resolve_click_regions(&infos).is_empty());
    }

    #[test]
    fn non_facing_glyph_yields_no_region_despite_area() {
        let infos = vec![info("a", block(1, 1, 3, 3), 5.0, false)];
        assert!(resolve_click_regions(&infos).is_empty());
    }

    #[test]
    fn unoccluded_glyph_keeps_full_bbox() {
        let infos = vec![info("a", block(2, 3, 4, 2), 5.0, true)];
        let regions = resolve_click_regions(&infos);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox, PixelBox { x: 2, y: 3, w: 4, h: 2 });
    }

    #[test]
    fn fully_overlapping_nearer_glyph_drops_the_farther_one() {
        // A at depth 5, B at depth 10, identical masks: B is 100% covered
        // and dropped; A has no nearer occluder and keeps its full bbox.
        let infos = vec![
            info("a", block(1, 1, 4, 4), 5.0, true),
            info("b", block(1, 1, 4, 4), 10.0, true),
        ];
        let regions = resolve_click_regions(&infos);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].glyph_id, "a");
        assert_eq!(regions[0].bbox, PixelBox { x: 1, y: 1, w: 4, h: 4 });
    }

    #[test]
    fn equal_depth_never_occludes() {
        let infos = vec![
            info("a", block(1, 1, 4, 4), 5.0, true),
            info("b", block(1, 1, 4, 4), 5.0, true),
        ];
        let regions = resolve_click_regions(&infos);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn slight_overlap_below_threshold_keeps_full_bbox() {
        // Candidate has 25 lit pixels; the nearer block covers 2 of them
        // (ratio 0.08 < 0.1). The emitted bbox is the full original, not
        // the visible remainder.
        let infos = vec![
            info("near", block(0, 0, 2, 1), 1.0, true),
            info("far", block(0, 0, 5, 5), 2.0, true),
        ];
        let regions = resolve_click_regions(&infos);
        let far = regions.iter().find(|r| r.glyph_id == "far").unwrap();
        assert_eq!(far.bbox, PixelBox { x: 0, y: 0, w: 5, h: 5 });
    }

    #[test]
    fn overlap_at_threshold_drops_candidate() {
        // 3 of 25 pixels covered: ratio 0.12 >= 0.1.
        let infos = vec![
            info("near", block(0, 0, 3, 1), 1.0, true),
            info("far", block(0, 0, 5, 5), 2.0, true),
        ];
        let regions = resolve_click_regions(&infos);
        assert!(regions.iter().all(|r| r.glyph_id != "far"));
        assert!(regions.iter().any(|r| r.glyph_id == "near"));
    }

    #[test]
    fn non_facing_glyph_still_occludes() {
        let infos = vec![
            info("near", block(1, 1, 4, 4), 1.0, false),
            info("far", block(1, 1, 4, 4), 2.0, true),
        ];
        assert!(resolve_click_regions(&infos).is_empty());
    }

    #[test]
    fn occlusion_is_monotone_in_added_occluders() {
        let candidate = info("far", block(0, 0, 5, 5), 10.0, true);
        let one = vec![info("n1", block(0, 0, 2, 1), 1.0, true), candidate.clone()];
        let two = vec![
            info("n1", block(0, 0, 2, 1), 1.0, true),
            info("n2", block(0, 1, 5, 2), 2.0, true),
            candidate,
        ];

        // With one small occluder the candidate survives; adding a nearer
        // opaque glyph can only raise the ratio, here past the threshold.
        assert!(resolve_click_regions(&one).iter().any(|r| r.glyph_id == "far"));
        assert!(resolve_click_regions(&two).iter().all(|r| r.glyph_id != "far"));
    }
}
