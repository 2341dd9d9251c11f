//! Aspect ratio parsing for letterbox cropping.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::SpectrographError;

/// A content aspect ratio (width divided by height).
///
/// A ratio of zero means "do not crop". Parse one from the familiar `W:H`
/// notation:
///
/// ```
/// use spectrograph::AspectRatio;
///
/// let ratio: AspectRatio = "4:3".parse().unwrap();
/// assert!((ratio.value() - 4.0 / 3.0).abs() < 1e-9);
///
/// assert!("4:0".parse::<AspectRatio>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct AspectRatio(f64);

impl AspectRatio {
    /// The "no cropping" ratio.
    pub const DISABLED: AspectRatio = AspectRatio(0.0);

    /// Build a ratio from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidAspectRatio`] when the value is
    /// negative, NaN, or infinite.
    pub fn new(value: f64) -> Result<Self, SpectrographError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SpectrographError::InvalidAspectRatio(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Build a ratio from a width and a height.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidAspectRatio`] when `height` is zero
    /// or the quotient is not a finite, non-negative number.
    pub fn from_dimensions(width: f64, height: f64) -> Result<Self, SpectrographError> {
        if height == 0.0 {
            return Err(SpectrographError::InvalidAspectRatio(format!(
                "{width}:{height}"
            )));
        }
        Self::new(width / height)
            .map_err(|_| SpectrographError::InvalidAspectRatio(format!("{width}:{height}")))
    }

    /// The ratio as a float.
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when cropping is turned off.
    pub fn is_disabled(self) -> bool {
        self.0 == 0.0
    }
}

impl FromStr for AspectRatio {
    type Err = SpectrographError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SpectrographError::InvalidAspectRatio(value.to_string());
        let trimmed = value.trim();

        match trimmed.split_once(':') {
            Some((width, height)) => {
                let width: f64 = width.trim().parse().map_err(|_| invalid())?;
                let height: f64 = height.trim().parse().map_err(|_| invalid())?;
                Self::from_dimensions(width, height).map_err(|_| invalid())
            }
            None => {
                let ratio: f64 = trimmed.parse().map_err(|_| invalid())?;
                Self::new(ratio).map_err(|_| invalid())
            }
        }
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.4}", self.0)
    }
}
