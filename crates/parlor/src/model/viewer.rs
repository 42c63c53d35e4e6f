//! Image preview state.

use std::sync::Arc;

use ::image::DynamicImage;
use iced::widget::image;
use parlor_core::{DisplayImage, ImagePayload};

/// Smallest zoom factor.
pub const MIN_SCALE: f32 = 1.0;
/// Largest zoom factor.
pub const MAX_SCALE: f32 = 50.0;
/// Zoom multiplier per step.
const ZOOM_STEP: f32 = 1.5;
/// Box an image is fitted into at scale 1.
const FIT_WIDTH: f32 = 960.0;
const FIT_HEIGHT: f32 = 640.0;

/// Orientation and zoom of the previewed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerTransform {
    /// Zoom factor in `MIN_SCALE..=MAX_SCALE`.
    pub scale: f32,
    /// Clockwise quarter turns, 0 to 3.
    pub quarter_turns: u8,
    /// Mirrored left to right.
    pub flip_x: bool,
    /// Mirrored top to bottom.
    pub flip_y: bool,
}

impl Default for ViewerTransform {
    fn default() -> Self {
        Self {
            scale: MIN_SCALE,
            quarter_turns: 0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl ViewerTransform {
    /// Zoom in one step.
    pub fn zoom_in(&mut self) {
        self.scale = (self.scale * ZOOM_STEP).min(MAX_SCALE);
    }

    /// Zoom out one step.
    pub fn zoom_out(&mut self) {
        self.scale = (self.scale / ZOOM_STEP).max(MIN_SCALE);
    }

    /// Whether zooming in changes anything.
    #[must_use]
    pub fn can_zoom_in(&self) -> bool {
        self.scale < MAX_SCALE
    }

    /// Whether zooming out changes anything.
    #[must_use]
    pub fn can_zoom_out(&self) -> bool {
        self.scale > MIN_SCALE
    }

    /// Rotate a quarter turn counter-clockwise.
    pub const fn rotate_left(&mut self) {
        self.quarter_turns = (self.quarter_turns + 3) % 4;
    }

    /// Rotate a quarter turn clockwise.
    pub const fn rotate_right(&mut self) {
        self.quarter_turns = (self.quarter_turns + 1) % 4;
    }

    /// Mirror left to right.
    pub const fn flip_horizontal(&mut self) {
        self.flip_x = !self.flip_x;
    }

    /// Mirror top to bottom.
    pub const fn flip_vertical(&mut self) {
        self.flip_y = !self.flip_y;
    }

    /// Back to the original orientation and size.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns true when the pixels need no rotation or mirroring.
    #[must_use]
    pub const fn is_upright(&self) -> bool {
        self.quarter_turns == 0 && !self.flip_x && !self.flip_y
    }

    /// On-screen size of an oriented image of `width` by `height` pixels.
    ///
    /// Large images are shrunk to the fit box first, small ones are never
    /// enlarged beyond their pixel size before zooming.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn display_size(&self, width: u32, height: u32) -> (f32, f32) {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let fit = (FIT_WIDTH / w).min(FIT_HEIGHT / h).min(1.0);
        (w * fit * self.scale, h * fit * self.scale)
    }

    /// Apply rotation, then mirroring in screen axes.
    #[must_use]
    pub fn orient(&self, image: DynamicImage) -> DynamicImage {
        let mut image = match self.quarter_turns {
            1 => image.rotate90(),
            2 => image.rotate180(),
            3 => image.rotate270(),
            _ => image,
        };
        if self.flip_x {
            image = image.fliph();
        }
        if self.flip_y {
            image = image.flipv();
        }
        image
    }
}

/// Pixels of a transformed image.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Displayable handle.
    pub handle: image::Handle,
}

/// The open preview.
#[derive(Debug, Clone)]
pub struct ViewerState {
    /// Image being previewed.
    pub image: DisplayImage,
    /// Current orientation and zoom.
    pub transform: ViewerTransform,
    /// Original bytes, once loaded.
    pub payload: Option<Arc<ImagePayload>>,
    /// Oriented pixels, once rendered.
    pub rendered: Option<RenderedImage>,
    /// Load or decode failure.
    pub error: Option<String>,
}

impl ViewerState {
    /// Opens a preview that still has to load its bytes.
    #[must_use]
    pub fn new(image: DisplayImage) -> Self {
        Self {
            image,
            transform: ViewerTransform::default(),
            payload: None,
            rendered: None,
            error: None,
        }
    }
}
