// crates/dataset_gen/src/session.rs
//! Synthetic session source.
//!
//! Stands in for the production scene generator so the batch job is
//! self-contained: five glyphs per session (four unique characters plus one
//! duplicate), laid out along the X axis with small positional jitter. Each
//! glyph gets a "home" viewpoint from the render grid so it is guaranteed
//! to face the camera in at least one view, with a 50% chance of being
//! turned backwards (the double-cone facing test reads those too).

use crate::classes::CAPTCHA_CHARS;
use glam::DVec3;
use rand::seq::SliceRandom;
use rand::Rng;
use render_core::scene::Rgb;
use render_core::{Glyph, SessionScene, Viewpoint};

pub const GLYPHS_PER_SESSION: usize = 5;

const GLYPH_SPACING: f64 = 3.0;
const FONT_SIZE: f64 = 1.5;
const EXTRUSION_DEPTH: f64 = 0.4;

const PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

/// Draws the session's characters: `GLYPHS_PER_SESSION - 1` unique entries
/// from the class table plus one of them repeated, shuffled.
fn draw_characters(rng: &mut impl Rng) -> Vec<char> {
    let mut unique: Vec<char> = CAPTCHA_CHARS
        .choose_multiple(rng, GLYPHS_PER_SESSION - 1)
        .copied()
        .collect();
    let duplicate = *unique
        .choose(rng)
        .unwrap_or(&CAPTCHA_CHARS[0]);
    unique.push(duplicate);
    unique.shuffle(rng);
    unique
}

/// Builds one synthetic session over the given viewpoint grid.
pub fn generate_session(rng: &mut impl Rng, grid: &[Viewpoint]) -> SessionScene {
    let session_id = uuid::Uuid::new_v4().to_string();
    let chars = draw_characters(rng);

    let home_views: Vec<Viewpoint> = grid
        .choose_multiple(rng, chars.len())
        .copied()
        .collect();

    let start_x = -((chars.len() - 1) as f64 * GLYPH_SPACING) / 2.0;
    let glyphs = chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| {
            // Home view determines the base rotation; pitch is negated so
            // the glyph leans toward that camera.
            let home = home_views.get(i).copied().unwrap_or(Viewpoint::new(0, 0));
            let mut rot_y = (home.yaw as f64).to_radians();
            if rng.gen_bool(0.5) {
                rot_y += std::f64::consts::PI;
            }

            Glyph {
                id: uuid::Uuid::new_v4().to_string(),
                text: ch.to_string(),
                position: DVec3::new(
                    start_x + i as f64 * GLYPH_SPACING,
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-1.0..1.0),
                ),
                rotation: DVec3::new(-(home.pitch as f64).to_radians(), rot_y, 0.0),
                scale: rng.gen_range(1.2..1.8),
                color: PALETTE
                    .choose(rng)
                    .map(|hex| Rgb::from_hex(hex))
                    .unwrap_or(Rgb::WHITE),
                font_size: FONT_SIZE,
                extrusion_depth: EXTRUSION_DEPTH,
            }
        })
        .collect();

    SessionScene { session_id, glyphs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes;
    use crate::pipeline::viewpoint_grid;
    use std::collections::HashSet;

    #[test]
    fn session_has_five_glyphs_with_one_duplicate() {
        let grid = viewpoint_grid();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let scene = generate_session(&mut rng, &grid);
            assert_eq!(scene.glyphs.len(), GLYPHS_PER_SESSION);

            let distinct: HashSet<&str> =
                scene.glyphs.iter().map(|g| g.text.as_str()).collect();
            assert_eq!(distinct.len(), GLYPHS_PER_SESSION - 1);
        }
    }

    #[test]
    fn every_glyph_character_is_labelable() {
        let grid = viewpoint_grid();
        let mut rng = rand::thread_rng();
        let scene = generate_session(&mut rng, &grid);
        for glyph in &scene.glyphs {
            let ch = glyph.text.chars().next().unwrap();
            assert!(classes::class_id(ch).is_ok());
        }
    }

    #[test]
    fn glyphs_are_spaced_and_centered_on_x() {
        let grid = viewpoint_grid();
        let mut rng = rand::thread_rng();
        let scene = generate_session(&mut rng, &grid);

        let xs: Vec<f64> = scene.glyphs.iter().map(|g| g.position.x).collect();
        assert_eq!(xs[0], -6.0);
        for pair in xs.windows(2) {
            assert!((pair[1] - pair[0] - GLYPH_SPACING).abs() < 1e-9);
        }
        // Jitter stays inside its bands.
        for g in &scene.glyphs {
            assert!(g.position.y.abs() <= 0.5);
            assert!(g.position.z.abs() <= 1.0);
            assert!((1.2..1.8).contains(&g.scale));
        }
    }

    #[test]
    fn session_ids_and_glyph_ids_are_unique() {
        let grid = viewpoint_grid();
        let mut rng = rand::thread_rng();
        let a = generate_session(&mut rng, &grid);
        let b = generate_session(&mut rng, &grid);
        assert_ne!(a.session_id, b.session_id);

        let ids: HashSet<&str> = a.glyphs.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids.len(), a.glyphs.len());
    }
}
