//! View projection: 3D model space to 2D drawing space plus depth.
//!
//! The view frame is right-handed with `x × y` pointing back at the
//! viewer; depth increases along the view direction. For perspective
//! projection the eye sits at `eye` and the image plane is at `focal`.

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{Point2, Point3, SightLine, Vec2, Vec3};

use crate::error::{HlrError, Result};

/// Named view directions for standard drawings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ViewDirection {
    /// Front view: looking along +Y (XZ plane visible).
    #[default]
    Front,
    /// Back view: looking along -Y.
    Back,
    /// Top view: looking along -Z (XY plane visible).
    Top,
    /// Bottom view: looking along +Z.
    Bottom,
    /// Right view: looking along -X (YZ plane visible).
    Right,
    /// Left view: looking along +X.
    Left,
    /// Axonometric view with azimuth and elevation in radians.
    Isometric {
        /// Rotation around Z.
        azimuth: f64,
        /// Angle above the XY plane.
        elevation: f64,
    },
}

impl ViewDirection {
    /// Standard isometric view (30° azimuth, 30° elevation).
    pub const ISOMETRIC_STANDARD: Self = Self::Isometric {
        azimuth: std::f64::consts::FRAC_PI_6,
        elevation: std::f64::consts::FRAC_PI_6,
    };

    /// Direction from the viewer toward the model.
    pub fn view_vector(&self) -> Vec3 {
        match self {
            ViewDirection::Front => Vec3::new(0.0, 1.0, 0.0),
            ViewDirection::Back => Vec3::new(0.0, -1.0, 0.0),
            ViewDirection::Top => Vec3::new(0.0, 0.0, -1.0),
            ViewDirection::Bottom => Vec3::new(0.0, 0.0, 1.0),
            ViewDirection::Right => Vec3::new(-1.0, 0.0, 0.0),
            ViewDirection::Left => Vec3::new(1.0, 0.0, 0.0),
            ViewDirection::Isometric { azimuth, elevation } => {
                let (sin_el, cos_el) = elevation.sin_cos();
                let (sin_az, cos_az) = azimuth.sin_cos();
                Vec3::new(cos_el * sin_az, cos_el * cos_az, -sin_el)
            }
        }
    }

    /// Up vector used to orient the drawing.
    pub fn up_vector(&self) -> Vec3 {
        match self {
            ViewDirection::Top => Vec3::new(0.0, 1.0, 0.0),
            ViewDirection::Bottom => Vec3::new(0.0, -1.0, 0.0),
            _ => Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

/// Orthographic or perspective projector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    origin: Point3,
    x_dir: Vec3,
    y_dir: Vec3,
    view: Vec3,
    focal: Option<f64>,
}

impl Projector {
    /// Orthographic projector looking along `view` with `up` toward the top of the drawing.
    pub fn orthographic(view: Vec3, up: Vec3) -> Result<Self> {
        let (x_dir, y_dir, view) = frame(&view, &up)?;
        Ok(Self {
            origin: Point3::origin(),
            x_dir,
            y_dir,
            view,
            focal: None,
        })
    }

    /// Perspective projector with the eye at `eye` and image plane at distance `focal`.
    pub fn perspective(eye: Point3, view: Vec3, up: Vec3, focal: f64) -> Result<Self> {
        if !(focal > 0.0 && focal.is_finite()) {
            return Err(HlrError::InvalidProjector(format!("focal distance {focal}")));
        }
        let (x_dir, y_dir, view) = frame(&view, &up)?;
        Ok(Self {
            origin: eye,
            x_dir,
            y_dir,
            view,
            focal: Some(focal),
        })
    }

    /// Orthographic projector for a named view.
    pub fn from_view(view: ViewDirection) -> Result<Self> {
        Self::orthographic(view.view_vector(), view.up_vector())
    }

    /// Unit view direction.
    pub fn view_direction(&self) -> Vec3 {
        self.view
    }

    /// Drawing x axis in model space.
    pub fn x_dir(&self) -> Vec3 {
        self.x_dir
    }

    /// Drawing y axis in model space.
    pub fn y_dir(&self) -> Vec3 {
        self.y_dir
    }

    /// Eye position, for perspective projectors.
    pub fn eye(&self) -> Option<Point3> {
        self.focal.map(|_| self.origin)
    }

    /// Focal distance, for perspective projectors.
    pub fn focal(&self) -> Option<f64> {
        self.focal
    }

    /// Whether this is a perspective projector.
    pub fn is_perspective(&self) -> bool {
        self.focal.is_some()
    }

    /// Depth of `p` along the view direction.
    pub fn depth(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.view)
    }

    /// Project `p` to the drawing plane.
    pub fn project(&self, p: &Point3) -> Point2 {
        self.project_with_depth(p).0
    }

    /// Project `p` and return its depth.
    pub fn project_with_depth(&self, p: &Point3) -> (Point2, f64) {
        let d = p - self.origin;
        let (a, b, z) = (d.dot(&self.x_dir), d.dot(&self.y_dir), d.dot(&self.view));
        match self.focal {
            None => (Point2::new(a, b), z),
            Some(f) => {
                let zz = z.max(1e-12);
                (Point2::new(f * a / zz, f * b / zz), z)
            }
        }
    }

    /// Project a point and a tangent vector at it.
    pub fn project_d1(&self, p: &Point3, v: &Vec3) -> (Point2, Vec2) {
        let d = p - self.origin;
        let (a, b, z) = (d.dot(&self.x_dir), d.dot(&self.y_dir), d.dot(&self.view));
        let (da, db, dz) = (v.dot(&self.x_dir), v.dot(&self.y_dir), v.dot(&self.view));
        match self.focal {
            None => (Point2::new(a, b), Vec2::new(da, db)),
            Some(f) => {
                let zz = z.max(1e-12);
                (
                    Point2::new(f * a / zz, f * b / zz),
                    Vec2::new(f * (da * zz - a * dz) / (zz * zz), f * (db * zz - b * dz) / (zz * zz)),
                )
            }
        }
    }

    /// The line of sight through drawing point `q`; its parameter is depth.
    pub fn sight_line(&self, q: &Point2) -> SightLine {
        match self.focal {
            None => SightLine {
                origin: self.origin + q.x * self.x_dir + q.y * self.y_dir,
                direction: self.view,
            },
            Some(f) => SightLine {
                origin: self.origin,
                direction: (q.x / f) * self.x_dir + (q.y / f) * self.y_dir + self.view,
            },
        }
    }

    /// Direction of sight toward `p`: constant for orthographic views.
    pub fn sight_direction(&self, p: &Point3) -> Vec3 {
        match self.focal {
            None => self.view,
            Some(_) => p - self.origin,
        }
    }

    /// `n · sight`: negative when a surface with normal `n` at `p` faces the viewer.
    pub fn facing(&self, p: &Point3, n: &Vec3) -> f64 {
        let s = self.sight_direction(p);
        let len = s.norm();
        if len < 1e-300 {
            return 0.0;
        }
        n.dot(&s) / len
    }

    /// Sign of the drawing frame's handedness as seen from the viewer.
    ///
    /// Positive when a counter-clockwise turn in the drawing is a
    /// counter-clockwise turn seen from the eye.
    pub fn orientation_sign(&self) -> f64 {
        let s = self.x_dir.cross(&self.y_dir).dot(&(-self.view));
        if s >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }
}

fn frame(view: &Vec3, up: &Vec3) -> Result<(Vec3, Vec3, Vec3)> {
    let d = view
        .try_normalize(1e-14)
        .ok_or_else(|| HlrError::InvalidProjector("zero view direction".into()))?;
    let y = (up - up.dot(&d) * d)
        .try_normalize(1e-9)
        .ok_or_else(|| HlrError::InvalidProjector("up vector parallel to view direction".into()))?;
    let x = y.cross(&(-d));
    Ok((x, y, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_top_view_frame() {
        let p = Projector::from_view(ViewDirection::Top).unwrap();
        let (q, depth) = p.project_with_depth(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(q.x, 1.0);
        assert_relative_eq!(q.y, 2.0);
        assert_relative_eq!(depth, -3.0);
        assert_eq!(p.orientation_sign(), 1.0);
    }

    #[test]
    fn test_front_view_frame() {
        let p = Projector::from_view(ViewDirection::Front).unwrap();
        let q = p.project(&Point3::new(1.0, 5.0, 2.0));
        assert_relative_eq!(q.x, 1.0);
        assert_relative_eq!(q.y, 2.0);
        assert_relative_eq!(p.depth(&Point3::new(1.0, 5.0, 2.0)), 5.0);
    }

    #[test]
    fn test_degenerate_projectors_rejected() {
        assert!(Projector::orthographic(Vec3::zeros(), Vec3::z()).is_err());
        assert!(Projector::orthographic(Vec3::z(), Vec3::z()).is_err());
        assert!(Projector::perspective(Point3::origin(), Vec3::z(), Vec3::y(), 0.0).is_err());
    }

    #[test]
    fn test_sight_line_parameter_is_depth() {
        let ortho = Projector::from_view(ViewDirection::ISOMETRIC_STANDARD).unwrap();
        let persp = Projector::perspective(
            Point3::new(0.0, -10.0, 0.0),
            Vec3::y(),
            Vec3::z(),
            2.0,
        )
        .unwrap();
        let p = Point3::new(0.3, 1.2, -0.7);
        for proj in [ortho, persp] {
            let (q, depth) = proj.project_with_depth(&p);
            let line = proj.sight_line(&q);
            assert_relative_eq!(line.at(depth), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_perspective_derivative() {
        let proj = Projector::perspective(Point3::new(1.0, -8.0, 2.0), Vec3::y(), Vec3::z(), 3.0)
            .unwrap();
        let p = Point3::new(0.4, 0.5, 0.6);
        let v = Vec3::new(0.3, -0.2, 0.9);
        let h = 1e-6;
        let (_, d) = proj.project_d1(&p, &v);
        let fd = (proj.project(&(p + h * v)) - proj.project(&(p - h * v))) / (2.0 * h);
        assert_relative_eq!(d, fd, epsilon = 1e-6);
    }

    #[test]
    fn test_facing() {
        let p = Projector::from_view(ViewDirection::Top).unwrap();
        assert!(p.facing(&Point3::origin(), &Vec3::z()) < 0.0);
        assert!(p.facing(&Point3::origin(), &-Vec3::z()) > 0.0);
        assert_relative_eq!(p.facing(&Point3::origin(), &Vec3::x()), 0.0);
    }
}
