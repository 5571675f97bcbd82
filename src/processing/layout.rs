use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }
}

/// Scaled media box positioned relative to the frame's top-left corner.
///
/// `left` and `top` are never positive: the overflowing axis hangs off both
/// edges of the frame by the same amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// Natural dimensions must be positive and finite to have an aspect ratio.
pub fn check_natural(natural: Size) -> Result<()> {
    if !(natural.width.is_finite() && natural.height.is_finite())
        || natural.width <= 0.0
        || natural.height <= 0.0
    {
        return Err(Error::InvalidMedia {
            width: natural.width,
            height: natural.height,
        });
    }
    Ok(())
}

/// Scales `natural` so it covers `frame` on both axes, preserving aspect
/// ratio, and centers the overflow.
pub fn cover(frame: Size, natural: Size) -> Result<Placement> {
    check_natural(natural)?;
    if !(frame.width.is_finite() && frame.height.is_finite())
        || frame.width < 0.0
        || frame.height < 0.0
    {
        return Err(Error::InvalidFrame {
            width: frame.width,
            height: frame.height,
        });
    }

    let ratio = natural.width / natural.height;

    // Fit height first, then widen if that leaves a gap on the sides.
    let mut height = frame.height;
    let mut width = height * ratio;
    if width < frame.width {
        width = frame.width;
        height = width / ratio;
    }

    Ok(Placement {
        width,
        height,
        left: -(width - frame.width) / 2.0,
        top: -(height - frame.height) / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_natural_height_is_invalid_media() {
        let err = cover(Size::new(800.0, 600.0), Size::new(1600.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidMedia { .. }), "{err:?}");
    }

    #[test]
    fn zero_natural_width_is_invalid_media() {
        let err = cover(Size::new(800.0, 600.0), Size::new(0.0, 400.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidMedia { .. }), "{err:?}");
    }

    #[test]
    fn nan_frame_is_invalid_frame() {
        let err = cover(Size::new(f64::NAN, 600.0), Size::new(10.0, 10.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }), "{err:?}");
    }

    #[test]
    fn collapsed_frame_yields_collapsed_box() {
        let p = cover(Size::new(0.0, 0.0), Size::new(16.0, 9.0)).unwrap();
        assert_eq!((p.width, p.height, p.left, p.top), (0.0, 0.0, 0.0, 0.0));
    }
}
