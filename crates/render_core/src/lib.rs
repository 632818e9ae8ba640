//! Visibility and labeling engine for 3D-glyph captcha scenes.
//!
//! A scene is a handful of extruded text glyphs posed in 3D; the camera sits
//! on a fixed-radius sphere around the origin, parametrized by (pitch, yaw).
//! For any viewpoint this crate can answer two questions:
//!
//! - what does the scene look like (one composite render per
//!   (session, viewpoint), memoized in [`cache::RenderCache`]), and
//! - which glyphs are actually legible there, with their exact pixel
//!   bounding boxes ([`occlusion::resolve_click_regions`]).
//!
//! Legibility is decided empirically: each glyph is rendered once more as an
//! unlit, alias-free silhouette, and silhouettes are compared pixel-by-pixel
//! in camera-depth order. Rasterization itself is delegated to an external
//! POV-Ray process; see [`povray`].

pub mod cache;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod occlusion;
pub mod povray;
pub mod scene;
pub mod service;

pub use error::RenderError;
pub use scene::{ClickRegion, Glyph, PixelBox, SessionScene, Viewpoint};
pub use service::{RenderOutcome, RenderService};
