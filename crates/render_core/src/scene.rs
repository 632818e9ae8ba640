// crates/render_core/src/scene.rs
use glam::DVec3;

/// One captcha character instance with a 3D pose.
///
/// Produced immutably by the upstream session source; this crate only reads
/// it.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub id: String,
    /// Single rendered character.
    pub text: String,
    pub position: DVec3,
    /// Euler angles in radians, applied X, then Y, then Z.
    pub rotation: DVec3,
    /// Uniform scale multiplier on top of `font_size` / `extrusion_depth`.
    pub scale: f64,
    pub color: Rgb,
    pub font_size: f64,
    pub extrusion_depth: f64,
}

/// Camera pose on the fixed-radius sphere around the scene origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewpoint {
    /// Degrees, rotation toward +Y.
    pub pitch: i32,
    /// Degrees, rotation around +Y.
    pub yaw: i32,
}

impl Viewpoint {
    pub fn new(pitch: i32, yaw: i32) -> Self {
        Self { pitch, yaw }
    }

    /// Stable key used for cache entries and output file stems.
    pub fn key(&self) -> String {
        format!("{}_{}", self.pitch, self.yaw)
    }
}

/// Pixel-space bounding box. Always the full extent of a glyph's mask,
/// never a visible-remainder crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Final reported bbox of a glyph judged legible at a given viewpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRegion {
    pub glyph_id: String,
    pub bbox: PixelBox,
}

/// Immutable glyph list plus session id, as handed over by the upstream
/// scene-generation collaborator.
#[derive(Debug, Clone)]
pub struct SessionScene {
    pub session_id: String,
    pub glyphs: Vec<Glyph>,
}

/// Fill color in the renderer's 0..1 component range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    /// Parses `#rrggbb` (leading `#` optional). Malformed input falls back
    /// to white, matching the upstream palette contract.
    pub fn from_hex(hex: &str) -> Rgb {
        let s = hex.strip_prefix('#').unwrap_or(hex);
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Rgb::WHITE;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&s[range], 16).unwrap_or(255) as f64 / 255.0
        };
        Rgb {
            r: channel(0..2),
            g: channel(2..4),
            b: channel(4..6),
        }
    }
}
