//! Common types and traits for box and container geometry.
//!
//! All extents are axis-aligned and measured in centimeters; weights in kilograms.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for dimension and weight comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Cubic centimeters per cubic meter.
pub const CM3_PER_M3: f64 = 1_000_000.0;

/// Cubic centimeters per liter.
pub const CM3_PER_LITER: f64 = 1_000.0;

/// Extent of a rectangular envelope in centimeters.
///
/// `length` runs along the container's X axis, `width` along Z (depth) and
/// `height` along Y (up). The axis correspondence is fixed; nothing is rotated.
///
/// # Examples
/// ```
/// use load_it_now::types::Dimensions;
///
/// let item = Dimensions::new(40.0, 30.0, 20.0);
/// let medium = Dimensions::new(50.0, 40.0, 40.0);
/// assert_eq!(item.volume(), 24_000.0);
/// assert!(item.fits_within(&medium, 0.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"length": 50.0, "width": 40.0, "height": 40.0}))]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[inline]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Cube with the given edge.
    #[inline]
    pub const fn cube(edge: f64) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Calculates the base area (length × width).
    #[inline]
    pub fn base_area(&self) -> f64 {
        self.length * self.width
    }

    /// Checks if these extents fit inside `outer` component-wise.
    ///
    /// # Parameters
    /// * `outer` - The enclosing extents (box or container)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.length <= outer.length + tolerance
            && self.width <= outer.width + tolerance
            && self.height <= outer.height + tolerance
    }

    /// Multiplies every component by `factor`.
    #[inline]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.length * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Half extents, i.e. the offset from a centered position to the faces.
    #[inline]
    pub fn half(&self) -> Self {
        self.scaled(0.5)
    }
}

/// A position in container space (centimeters from the origin corner).
///
/// `x` follows length, `y` follows height and `z` follows width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Trait for objects with a rectangular envelope.
pub trait Dimensional {
    /// Returns the envelope of the object.
    fn dimensions(&self) -> Dimensions;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }

    /// Calculates the base area.
    fn base_area(&self) -> f64 {
        self.dimensions().base_area()
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight_kg(&self) -> f64;
}

/// Validation helpers shared by the model constructors and the API boundary.
pub mod validation {
    use super::Dimensions;

    /// Validates a single dimension.
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates all three components of an envelope.
    pub fn validate_dimensions(dims: &Dimensions, subject: &str) -> Result<(), String> {
        validate_dimension(dims.length, &format!("{} length", subject))?;
        validate_dimension(dims.width, &format!("{} width", subject))?;
        validate_dimension(dims.height, &format!("{} height", subject))?;
        Ok(())
    }

    /// Validates a weight. Zero is accepted for weightless placeholders.
    pub fn validate_weight(value: f64) -> Result<(), String> {
        if value < 0.0 || !value.is_finite() {
            return Err(format!(
                "Weight must be non-negative and finite, got: {}",
                value
            ));
        }
        Ok(())
    }
}
