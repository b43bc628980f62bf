//! Layout of the label that tells the user why their levels weren't loaded.

use vector2d::Vector2D;

use super::config::LoadError;

pub type Rgb = (u8, u8, u8);

pub const FONT: &str = "bigFont.fnt";
pub const RED: Rgb = (255, 0, 0);
pub const SCALE: f32 = 0.4;

/// Distance between the top of the window and the label's centre.
const TOP_MARGIN: f32 = 10.0;

#[derive(Clone, Debug)]
pub struct ErrorLabel {
    pub text: &'static str,
    pub font: &'static str,
    pub colour: Rgb,
    pub scale: f32,

    /// Centre of the label, in points from the bottom left of the window.
    pub position: Vector2D<f32>,
}

impl ErrorLabel {
    /// Creates a label for `error`, centred along the top edge of a window of `window_size`.
    pub fn new(error: LoadError, window_size: Vector2D<f32>) -> ErrorLabel {
        ErrorLabel {
            text: error.message(),
            font: FONT,
            colour: RED,
            scale: SCALE,
            position: Vector2D::new(window_size.x / 2.0, window_size.y - TOP_MARGIN),
        }
    }
}
