//! Fixed-width pennation geometry.
//!
//! The muscle keeps a constant width `w = lopt sin(α_opt)` as its fibers
//! change length:
//!
//! ```text
//!          fiber length lM
//!         ╱│
//!        ╱ │ w (constant)
//!       ╱α │
//!      ●───┘
//!     lM cos(α)  (fiber length along tendon)
//! ```
//!
//! Fiber length is computed as `sqrt(lMT_fiber² + w²)` from the length along
//! the tendon, which stays defined as the along-tendon length goes to zero.
//! The sine and cosine of the pennation angle come straight from the triangle;
//! `asin` is used only to report the angle itself.

/// Pennation geometry with constant muscle width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWidthPennation {
    width: f64,
    square_width: f64,
}

impl FixedWidthPennation {
    /// Create the geometry from the fiber width (m).
    #[must_use]
    pub fn new(width: f64) -> Self {
        Self {
            width,
            square_width: width * width,
        }
    }

    /// Create the geometry from optimal fiber length and pennation at optimal.
    #[must_use]
    pub fn from_optimal(optimal_fiber_length: f64, pennation_angle_at_optimal: f64) -> Self {
        Self::new(optimal_fiber_length * pennation_angle_at_optimal.sin())
    }

    /// The constant fiber width (m).
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Fiber length from the fiber length projected on the tendon.
    #[must_use]
    pub fn fiber_length(&self, fiber_length_along_tendon: f64) -> f64 {
        (fiber_length_along_tendon * fiber_length_along_tendon + self.square_width).sqrt()
    }

    /// Sine of the pennation angle, `w / lM`.
    #[must_use]
    pub fn sin_angle(&self, fiber_length: f64) -> f64 {
        self.width / fiber_length
    }

    /// Cosine of the pennation angle, `lM,T / lM`.
    #[must_use]
    pub fn cos_angle(fiber_length_along_tendon: f64, fiber_length: f64) -> f64 {
        fiber_length_along_tendon / fiber_length
    }

    /// Tangent of the pennation angle, `w / lM,T`.
    #[must_use]
    pub fn tan_angle(&self, fiber_length_along_tendon: f64) -> f64 {
        self.width / fiber_length_along_tendon
    }

    /// Pennation angle rate from fiber velocity.
    ///
    /// Differentiating `w = lM sin(α)` with `w` fixed gives
    /// `dα/dt = -vM tan(α) / lM`.
    #[must_use]
    pub fn angular_velocity(
        &self,
        fiber_velocity: f64,
        fiber_length: f64,
        fiber_length_along_tendon: f64,
    ) -> f64 {
        -fiber_velocity / fiber_length * self.tan_angle(fiber_length_along_tendon)
    }

    /// Derivative of the pennation angle with respect to fiber length.
    ///
    /// `d/dlM asin(w / lM) = -(w / lM) / lM / sqrt(1 - (w / lM)²)`
    #[must_use]
    pub fn d_angle_d_fiber_length(&self, fiber_length: f64) -> f64 {
        let h_over_l = self.width / fiber_length;
        (-h_over_l / fiber_length) / (1.0 - h_over_l * h_over_l).sqrt()
    }
}
