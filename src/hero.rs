use crate::config::{HERO_FALLBACK_RATIO, HERO_MIN_HEIGHT_PX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeroHeight {
    /// Derived from the hero image's natural aspect ratio.
    Measured(u32),
    /// Image missing or not decoded yet.
    Fallback(u32),
}

impl HeroHeight {
    pub fn px(self) -> u32 {
        match self {
            Self::Measured(px) | Self::Fallback(px) => px,
        }
    }

    pub fn css_value(self) -> String {
        format!("{}px", self.px())
    }

    /// Only measured heights are copied onto the fixed background layer.
    pub fn sizes_background(self) -> bool {
        matches!(self, Self::Measured(_))
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Measured(_) => "measured",
            Self::Fallback(_) => "fallback",
        }
    }
}

/// Height of the hero image when scaled to the full viewport width.
///
/// `natural` is the image's intrinsic `(width, height)`; `None` or a zero
/// dimension selects the viewport-based fallback.
pub fn hero_height(
    natural: Option<(u32, u32)>,
    viewport_width: f64,
    viewport_height: f64,
) -> HeroHeight {
    match natural {
        Some((width, height)) if width > 0 && height > 0 => {
            let rendered = (f64::from(height) * (viewport_width / f64::from(width))).round();
            HeroHeight::Measured(to_px(rendered).max(HERO_MIN_HEIGHT_PX))
        }
        _ => fallback_height(viewport_height),
    }
}

pub fn fallback_height(viewport_height: f64) -> HeroHeight {
    HeroHeight::Fallback(to_px((viewport_height * HERO_FALLBACK_RATIO).round()))
}

fn to_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Collapses bursts of resize events into one recompute per animation frame.
#[derive(Debug, Default)]
pub struct ResizeCoalescer {
    pending: bool,
}

impl ResizeCoalescer {
    /// Returns `true` when the caller should schedule a frame.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub fn flush(&mut self) {
        self.pending = false;
    }
}

/// Keeps at most one pending re-measure listener on a hero image that has
/// not decoded yet. A broken image never fires `load`, so the guard stays armed.
#[derive(Debug, Default)]
pub struct RemeasureGuard {
    armed: bool,
}

impl RemeasureGuard {
    /// Returns `true` when the caller should attach a new `load` listener.
    pub fn arm(&mut self, height: HeroHeight, image_present: bool) -> bool {
        if !image_present || height.sizes_background() || self.armed {
            return false;
        }
        self.armed = true;
        true
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}
