//! Non-rational B-spline edge curves.
//!
//! Evaluation uses the Cox–de Boor basis; the first derivative is the
//! degree `p - 1` spline over the differenced control polygon.

use crate::{GeomError, Point3, Result, Transform, Vec3};

/// Find the knot span index for parameter `t`.
///
/// Returns `i` such that `knots[i] <= t < knots[i+1]`, clamped to the valid range.
fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n = last control point index
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-zero basis function values `N[span-degree..=span]` at `t`.
fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            if denom.abs() < 1e-30 {
                continue;
            }
            let temp = n[r] / denom;
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

/// A non-rational B-spline curve in 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    /// Control points.
    pub control_points: Vec<Point3>,
    /// Knot vector, `control_points.len() + degree + 1` entries.
    pub knots: Vec<f64>,
    /// Polynomial degree.
    pub degree: usize,
}

impl BSplineCurve {
    /// Create a B-spline curve, checking the knot vector.
    pub fn new(control_points: Vec<Point3>, knots: Vec<f64>, degree: usize) -> Result<Self> {
        if control_points.len() < degree + 1 {
            return Err(GeomError::Degenerate(format!(
                "{} control points for degree {degree}",
                control_points.len()
            )));
        }
        if knots.len() != control_points.len() + degree + 1 {
            return Err(GeomError::Degenerate(format!(
                "knot vector has {} entries, expected {}",
                knots.len(),
                control_points.len() + degree + 1
            )));
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(GeomError::Degenerate("decreasing knot vector".into()));
        }
        let curve = Self {
            control_points,
            knots,
            degree,
        };
        let (a, b) = curve.parameter_domain();
        if b <= a {
            return Err(GeomError::Degenerate("empty knot span".into()));
        }
        Ok(curve)
    }

    /// Clamped B-spline with uniform interior knots on `[0, 1]`.
    pub fn clamped_uniform(control_points: Vec<Point3>, degree: usize) -> Result<Self> {
        let n = control_points.len();
        if n < degree + 1 {
            return Err(GeomError::Degenerate(format!(
                "{n} control points for degree {degree}"
            )));
        }
        let m = n + degree + 1;
        let mut knots = vec![0.0; m];
        let n_internal = m - 2 * (degree + 1);
        for i in 0..=degree {
            knots[m - 1 - i] = 1.0;
        }
        for i in 1..=n_internal {
            knots[degree + i] = i as f64 / (n_internal + 1) as f64;
        }
        Self::new(control_points, knots, degree)
    }

    /// Evaluate the curve at `t` (clamped to the domain).
    pub fn eval(&self, t: f64) -> Point3 {
        let n = self.control_points.len() - 1;
        let t = t.clamp(self.knots[self.degree], self.knots[n + 1]);
        let span = find_span(&self.knots, n, self.degree, t);
        let basis = basis_functions(&self.knots, span, self.degree, t);

        let mut point = Point3::origin();
        for (i, &b) in basis.iter().enumerate() {
            let cp = &self.control_points[span - self.degree + i];
            point.coords += b * cp.coords;
        }
        point
    }

    /// First derivative at `t`.
    pub fn derivative(&self, t: f64) -> Vec3 {
        let p = self.degree;
        if p == 0 {
            return Vec3::zeros();
        }
        let n = self.control_points.len() - 1;
        let t = t.clamp(self.knots[p], self.knots[n + 1]);
        let span = find_span(&self.knots, n, p, t);
        // Basis of degree p-1 over the same knots, shifted by one.
        let basis = basis_functions(&self.knots, span, p - 1, t);
        let mut d = Vec3::zeros();
        for (j, &b) in basis.iter().enumerate() {
            // Derivative control point Q_{i} with i = span - p + j, i in [0, n-1]
            let i = span + j - p;
            if i >= n {
                continue;
            }
            let dk = self.knots[i + p + 1] - self.knots[i + 1];
            if dk.abs() < 1e-30 {
                continue;
            }
            let q = (p as f64 / dk) * (self.control_points[i + 1] - self.control_points[i]);
            d += b * q;
        }
        d
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn parameter_domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control_points.len()])
    }

    /// Apply a rigid motion to the control polygon.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            control_points: self.control_points.iter().map(|p| t.apply_point(p)).collect(),
            knots: self.knots.clone(),
            degree: self.degree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> BSplineCurve {
        BSplineCurve::clamped_uniform(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(3.0, 2.0, 0.0),
                Point3::new(4.0, 0.0, 1.0),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_clamped_endpoints() {
        let c = quad();
        assert_relative_eq!(c.eval(0.0), Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(c.eval(1.0), Point3::new(4.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let c = quad();
        for &t in &[0.1, 0.3, 0.5, 0.77, 0.95] {
            let h = 1e-6;
            let fd = (c.eval(t + h) - c.eval(t - h)) / (2.0 * h);
            assert_relative_eq!(c.derivative(t), fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_end_derivative_follows_control_polygon() {
        let c = quad();
        // Clamped curve: C'(0) = p / (k[p+1] - k[1]) (P1 - P0)
        let d = c.derivative(0.0);
        let expected = (2.0 / 0.5) * Vec3::new(1.0, 2.0, 0.0);
        assert_relative_eq!(d, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_bspline_is_polyline() {
        let c = BSplineCurve::clamped_uniform(
            vec![Point3::origin(), Point3::new(2.0, 0.0, 0.0)],
            1,
        )
        .unwrap();
        assert_relative_eq!(c.eval(0.5).x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_knots_rejected() {
        let pts = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(BSplineCurve::new(pts.clone(), vec![0.0, 0.0, 1.0], 1).is_err());
        assert!(BSplineCurve::new(pts, vec![0.0, 1.0, 0.5, 1.0], 1).is_err());
    }
}
