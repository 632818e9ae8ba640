// crates/dataset_gen/src/labels.rs
//! YOLO label formatting: `classId cx cy w h`, all four floats normalized
//! to [0,1] and printed at 6-decimal precision, one line per click region.

use crate::classes::{self, UnknownCharacterClass};
use render_core::{ClickRegion, Glyph};

/// Formats the label lines for one sample. Regions whose glyph id is not in
/// the scene are skipped; a glyph character outside the class table aborts
/// with [`UnknownCharacterClass`]. Zero regions yield an empty string (and
/// so an empty label file).
pub fn format_label_lines(
    regions: &[ClickRegion],
    glyphs: &[Glyph],
    image_size: u32,
) -> Result<String, UnknownCharacterClass> {
    let size = image_size as f64;
    let mut lines = Vec::with_capacity(regions.len());

    for region in regions {
        let Some(glyph) = glyphs.iter().find(|g| g.id == region.glyph_id) else {
            continue;
        };
        let Some(ch) = glyph.text.chars().next() else {
            continue;
        };
        let class_id = classes::class_id(ch)?;

        let b = region.bbox;
        let x_center = (b.x as f64 + b.w as f64 / 2.0) / size;
        let y_center = (b.y as f64 + b.h as f64 / 2.0) / size;
        let w = b.w as f64 / size;
        let h = b.h as f64 / size;

        lines.push(format!(
            "{class_id} {x_center:.6} {y_center:.6} {w:.6} {h:.6}"
        ));
    }

    Ok(lines.join("\n"))
}
