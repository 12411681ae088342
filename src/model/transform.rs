//! Affine transforms attached to figures.

use crate::error::RoiError;

/// A 2×3 affine transform stored row-major:
///
/// ```text
/// | m00 m01 m02 |     x' = m00·x + m01·y + m02
/// | m10 m11 m12 |     y' = m10·x + m11·y + m12
/// ```
///
/// Only invertible transforms can be constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    m: [f64; 6],
}

impl AffineTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    /// Create a transform from its six row-major components.
    pub fn new(
        m00: f64,
        m01: f64,
        m02: f64,
        m10: f64,
        m11: f64,
        m12: f64,
    ) -> Result<Self, RoiError> {
        Self::from_row_major([m00, m01, m02, m10, m11, m12])
    }

    /// Create a transform from a row-major array.
    pub fn from_row_major(m: [f64; 6]) -> Result<Self, RoiError> {
        let transform = Self { m };
        let determinant = transform.determinant();
        if !m.iter().all(|v| v.is_finite()) || determinant == 0.0 || !determinant.is_finite() {
            return Err(RoiError::DegenerateTransform { determinant });
        }
        Ok(transform)
    }

    /// A pure translation.
    pub fn translation(tx: f64, ty: f64) -> Result<Self, RoiError> {
        Self::new(1.0, 0.0, tx, 0.0, 1.0, ty)
    }

    /// A scale about the origin.
    pub fn scale(sx: f64, sy: f64) -> Result<Self, RoiError> {
        Self::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// A rotation about the origin, in degrees.
    pub fn rotation(degrees: f64) -> Result<Self, RoiError> {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, -sin, 0.0, sin, cos, 0.0)
    }

    /// Row-major components.
    pub fn to_row_major(&self) -> [f64; 6] {
        self.m
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.m[0] * self.m[4] - self.m[1] * self.m[3]
    }

    /// Translation components (m02, m12).
    pub fn translation_part(&self) -> (f64, f64) {
        (self.m[2], self.m[5])
    }

    /// Scale components (m00, m11).
    pub fn scale_part(&self) -> (f64, f64) {
        (self.m[0], self.m[4])
    }

    /// Whether this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether the linear part is the identity.
    pub fn is_translation(&self) -> bool {
        self.m[0] == 1.0 && self.m[1] == 0.0 && self.m[3] == 0.0 && self.m[4] == 1.0
    }

    /// Whether this is a scale with no shear and no translation.
    pub fn is_scale(&self) -> bool {
        self.m[1] == 0.0 && self.m[3] == 0.0 && self.m[2] == 0.0 && self.m[5] == 0.0
    }

    /// Compose: the result applies `other` first, then `self`.
    pub fn multiply(&self, other: &Self) -> Result<Self, RoiError> {
        let [a, b, c, d, e, f] = self.m;
        let [g, h, i, j, k, l] = other.m;
        Self::from_row_major([
            a * g + b * j,
            a * h + b * k,
            a * i + b * l + c,
            d * g + e * j,
            d * h + e * k,
            d * i + e * l + f,
        ])
    }

    /// Map a point through the transform.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0] * x + self.m[1] * y + self.m[2],
            self.m[3] * x + self.m[4] * y + self.m[5],
        )
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let [a, b, c, d, e, f] = self.m;
        let det = self.determinant();
        Self {
            m: [
                e / det,
                -b / det,
                (b * f - c * e) / det,
                -d / det,
                a / det,
                (c * d - a * f) / det,
            ],
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_zero_scale_rejected() {
        assert_matches!(
            AffineTransform::scale(0.0, 2.0),
            Err(RoiError::DegenerateTransform { .. })
        );
        assert_matches!(
            AffineTransform::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0),
            Err(RoiError::DegenerateTransform { .. })
        );
    }

    #[test]
    fn test_classification() {
        assert!(AffineTransform::IDENTITY.is_identity());
        assert!(AffineTransform::IDENTITY.is_translation());

        let t = AffineTransform::translation(5.0, 0.0).unwrap();
        assert!(t.is_translation());
        assert!(!t.is_scale());

        let s = AffineTransform::scale(2.0, 3.0).unwrap();
        assert!(s.is_scale());
        assert!(!s.is_translation());
    }

    #[test]
    fn test_multiply_and_inverse() {
        let t = AffineTransform::translation(10.0, 5.0).unwrap();
        let s = AffineTransform::scale(2.0, 2.0).unwrap();
        let ts = t.multiply(&s).unwrap();
        // Scale first, then translate
        assert_eq!(ts.apply(1.0, 1.0), (12.0, 7.0));

        let back = ts.inverse();
        let (x, y) = back.apply(12.0, 7.0);
        assert!((x - 1.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }
}
