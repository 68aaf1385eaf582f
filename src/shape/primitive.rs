use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::error::{Result, ShapeError};
use crate::math::TOLERANCE;

use super::extent::Aabb;
use super::planes::ZPlanes;

/// An azimuthal section `[start, start + delta]`, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiSection {
    pub start: f64,
    pub delta: f64,
}

impl Default for PhiSection {
    fn default() -> Self {
        Self::FULL
    }
}

impl PhiSection {
    /// The full turn.
    pub const FULL: Self = Self {
        start: 0.0,
        delta: TAU,
    };

    /// Returns `true` if the section covers the full turn.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.delta >= TAU - TOLERANCE
    }

    fn validate(&self, shape: &str) -> Result<()> {
        if !self.start.is_finite() || !(self.delta > 0.0 && self.delta <= TAU + TOLERANCE) {
            return Err(degenerate(shape, "delta_phi must lie in (0, 360] degrees"));
        }
        Ok(())
    }
}

/// A rectangular box, given by its half-lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    pub half_x: f64,
    pub half_y: f64,
    pub half_z: f64,
}

/// A spherical shell, optionally cut in phi and theta.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub rmin: f64,
    pub rmax: f64,
    pub phi: PhiSection,
    pub start_theta: f64,
    pub delta_theta: f64,
}

/// A full solid sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct Orb {
    pub radius: f64,
}

/// A cylindrical section along z.
#[derive(Debug, Clone, PartialEq)]
pub struct Tube {
    pub rmin: f64,
    pub rmax: f64,
    pub half_z: f64,
    pub phi: PhiSection,
}

/// A tube with an elliptical cross section, given by its semi-axes and half-length.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipticalTube {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// A conical section along z, with radii at `-half_z` (1) and `+half_z` (2).
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    pub rmin1: f64,
    pub rmax1: f64,
    pub rmin2: f64,
    pub rmax2: f64,
    pub half_z: f64,
    pub phi: PhiSection,
}

/// A trapezoid with half-lengths `x1`, `y1` at `-half_z` and `x2`, `y2` at `+half_z`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trd {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub half_z: f64,
}

/// A torus section: tube radii `rmin..rmax` swept at distance `rtor` from the z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Torus {
    pub rmin: f64,
    pub rmax: f64,
    pub rtor: f64,
    pub phi: PhiSection,
}

/// An ellipsoid with semi-axes `ax`, `by`, `cz`, optionally cut at `zcut1 <= z <= zcut2`.
///
/// A zero cut means "no cut" on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    pub ax: f64,
    pub by: f64,
    pub cz: f64,
    pub zcut1: f64,
    pub zcut2: f64,
}

/// A solid of revolution through a list of z-planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polycone {
    pub phi: PhiSection,
    pub planes: ZPlanes,
}

/// A polygonal solid of revolution with `num_sides` faces per phi section.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyhedra {
    pub phi: PhiSection,
    pub num_sides: u32,
    pub planes: ZPlanes,
}

/// A primitive solid. All lengths are in millimetres and all angles in radians.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Box(BoxShape),
    Sphere(Sphere),
    Orb(Orb),
    Tube(Tube),
    EllipticalTube(EllipticalTube),
    Cone(Cone),
    Trd(Trd),
    Torus(Torus),
    Ellipsoid(Ellipsoid),
    Polycone(Polycone),
    Polyhedra(Polyhedra),
}

impl Primitive {
    /// Returns the lowercase kind name used in documents and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box(_) => "box",
            Self::Sphere(_) => "sphere",
            Self::Orb(_) => "orb",
            Self::Tube(_) => "tube",
            Self::EllipticalTube(_) => "elliptical_tube",
            Self::Cone(_) => "cone",
            Self::Trd(_) => "trd",
            Self::Torus(_) => "torus",
            Self::Ellipsoid(_) => "ellipsoid",
            Self::Polycone(_) => "polycone",
            Self::Polyhedra(_) => "polyhedra",
        }
    }

    /// Checks the geometric invariants of the solid, normalizing z-planes.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Degenerate`] for non-positive or inconsistent
    /// dimensions, and [`ShapeError::InvalidPlanes`] for bad z-planes.
    pub fn validate(self, shape: &str) -> Result<Self> {
        match self {
            Self::Box(b) => {
                positive(shape, "half-lengths", &[b.half_x, b.half_y, b.half_z])?;
                Ok(Self::Box(b))
            }
            Self::Sphere(s) => {
                radii(shape, s.rmin, s.rmax)?;
                s.phi.validate(shape)?;
                if s.start_theta < 0.0
                    || s.delta_theta <= 0.0
                    || s.start_theta + s.delta_theta > PI + TOLERANCE
                {
                    return Err(degenerate(shape, "theta section must lie within [0, 180] degrees"));
                }
                Ok(Self::Sphere(s))
            }
            Self::Orb(o) => {
                positive(shape, "radius", &[o.radius])?;
                Ok(Self::Orb(o))
            }
            Self::Tube(t) => {
                radii(shape, t.rmin, t.rmax)?;
                positive(shape, "height", &[t.half_z])?;
                t.phi.validate(shape)?;
                Ok(Self::Tube(t))
            }
            Self::EllipticalTube(e) => {
                positive(shape, "semi-axes", &[e.dx, e.dy, e.dz])?;
                Ok(Self::EllipticalTube(e))
            }
            Self::Cone(c) => {
                positive(shape, "height", &[c.half_z])?;
                if c.rmin1 < 0.0 || c.rmin2 < 0.0 || c.rmin1 > c.rmax1 || c.rmin2 > c.rmax2 {
                    return Err(degenerate(shape, "cone radii must satisfy 0 <= rmin <= rmax"));
                }
                if c.rmax1 < TOLERANCE && c.rmax2 < TOLERANCE {
                    return Err(degenerate(shape, "cone needs a positive outer radius"));
                }
                c.phi.validate(shape)?;
                Ok(Self::Cone(c))
            }
            Self::Trd(t) => {
                positive(shape, "height", &[t.half_z])?;
                if [t.x1, t.x2, t.y1, t.y2].iter().any(|v| *v < 0.0 || !v.is_finite()) {
                    return Err(degenerate(shape, "trd half-lengths must be non-negative"));
                }
                if t.x1.max(t.x2) < TOLERANCE || t.y1.max(t.y2) < TOLERANCE {
                    return Err(degenerate(shape, "trd has zero extent in x or y"));
                }
                Ok(Self::Trd(t))
            }
            Self::Torus(t) => {
                radii(shape, t.rmin, t.rmax)?;
                if t.rtor < t.rmax {
                    return Err(degenerate(shape, "torus radius must not be smaller than tube radius"));
                }
                t.phi.validate(shape)?;
                Ok(Self::Torus(t))
            }
            Self::Ellipsoid(e) => {
                positive(shape, "semi-axes", &[e.ax, e.by, e.cz])?;
                let (low, high) = e.z_limits();
                if low >= high {
                    return Err(degenerate(shape, "zcut1 must be below zcut2"));
                }
                Ok(Self::Ellipsoid(e))
            }
            Self::Polycone(p) => {
                p.phi.validate(shape)?;
                Ok(Self::Polycone(Polycone {
                    phi: p.phi,
                    planes: p.planes.normalized(shape)?,
                }))
            }
            Self::Polyhedra(p) => {
                p.phi.validate(shape)?;
                if p.num_sides == 0 {
                    return Err(degenerate(shape, "num_sides must be at least 1"));
                }
                Ok(Self::Polyhedra(Polyhedra {
                    phi: p.phi,
                    num_sides: p.num_sides,
                    planes: p.planes.normalized(shape)?,
                }))
            }
        }
    }

    /// Returns a bounding box of the solid in its own frame.
    ///
    /// Phi and theta sections are ignored, so the box is conservative.
    #[must_use]
    pub fn local_extent(&self) -> Aabb {
        match self {
            Self::Box(b) => Aabb::symmetric(b.half_x, b.half_y, b.half_z),
            Self::Sphere(s) => Aabb::symmetric(s.rmax, s.rmax, s.rmax),
            Self::Orb(o) => Aabb::symmetric(o.radius, o.radius, o.radius),
            Self::Tube(t) => Aabb::symmetric(t.rmax, t.rmax, t.half_z),
            Self::EllipticalTube(e) => Aabb::symmetric(e.dx, e.dy, e.dz),
            Self::Cone(c) => {
                let r = c.rmax1.max(c.rmax2);
                Aabb::symmetric(r, r, c.half_z)
            }
            Self::Trd(t) => Aabb::symmetric(t.x1.max(t.x2), t.y1.max(t.y2), t.half_z),
            Self::Torus(t) => {
                let r = t.rtor + t.rmax;
                Aabb::symmetric(r, r, t.rmax)
            }
            Self::Ellipsoid(e) => {
                let (low, high) = e.z_limits();
                Aabb::new([-e.ax, -e.by, low], [e.ax, e.by, high])
            }
            Self::Polycone(p) => {
                let r = p.planes.max_radius();
                let (low, high) = p.planes.z_range();
                Aabb::new([-r, -r, low], [r, r, high])
            }
            Self::Polyhedra(p) => {
                // rmax is the apothem; corners reach rmax / cos(pi / n).
                // Sides spanning half a turn or more have no finite corner.
                let half_angle = p.phi.delta / (2.0 * f64::from(p.num_sides.max(1)));
                let apothem = p.planes.max_radius();
                let r = if half_angle < FRAC_PI_2 {
                    apothem / half_angle.cos()
                } else {
                    apothem
                };
                let (low, high) = p.planes.z_range();
                Aabb::new([-r, -r, low], [r, r, high])
            }
        }
    }
}

impl Ellipsoid {
    /// Returns the effective z range after applying the cuts.
    #[must_use]
    pub fn z_limits(&self) -> (f64, f64) {
        let low = if self.zcut1 == 0.0 { -self.cz } else { self.zcut1.max(-self.cz) };
        let high = if self.zcut2 == 0.0 { self.cz } else { self.zcut2.min(self.cz) };
        (low, high)
    }
}

fn degenerate(shape: &str, reason: &str) -> crate::error::DetgeomError {
    ShapeError::Degenerate {
        shape: shape.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

fn positive(shape: &str, what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite() || *v < TOLERANCE) {
        return Err(degenerate(shape, &format!("{what} must be positive")));
    }
    Ok(())
}

fn radii(shape: &str, rmin: f64, rmax: f64) -> Result<()> {
    positive(shape, "outer radius", &[rmax])?;
    if rmin < 0.0 || rmin >= rmax {
        return Err(degenerate(shape, "radii must satisfy 0 <= rmin < rmax"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DetgeomError;

    fn tube(rmin: f64, rmax: f64) -> Primitive {
        Primitive::Tube(Tube {
            rmin,
            rmax,
            half_z: 10.0,
            phi: PhiSection::FULL,
        })
    }

    #[test]
    fn tube_inner_radius_must_be_below_outer() {
        assert!(tube(0.0, 5.0).validate("t").is_ok());
        let err = tube(5.0, 5.0).validate("t").unwrap_err();
        assert!(matches!(err, DetgeomError::Shape(ShapeError::Degenerate { .. })));
    }

    #[test]
    fn box_with_zero_side_is_degenerate() {
        let b = Primitive::Box(BoxShape {
            half_x: 1.0,
            half_y: 0.0,
            half_z: 1.0,
        });
        assert!(b.validate("b").is_err());
    }

    #[test]
    fn phi_section_beyond_full_turn_is_rejected() {
        let t = Primitive::Tube(Tube {
            rmin: 0.0,
            rmax: 1.0,
            half_z: 1.0,
            phi: PhiSection {
                start: 0.0,
                delta: 3.0 * PI,
            },
        });
        assert!(t.validate("t").is_err());
    }

    #[test]
    fn polycone_validation_sorts_planes() {
        let pc = Primitive::Polycone(Polycone {
            phi: PhiSection::FULL,
            planes: ZPlanes::new(vec![0.0, -10.0, 10.0], vec![0.0; 3], vec![5.0, 4.0, 6.0]),
        });
        let Primitive::Polycone(pc) = pc.validate("pc").unwrap() else {
            panic!("kind changed");
        };
        assert_eq!(pc.planes.z, vec![-10.0, 0.0, 10.0]);
        assert_eq!(pc.planes.rmax, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn extents_cover_the_solid() {
        let torus = Primitive::Torus(Torus {
            rmin: 0.0,
            rmax: 2.0,
            rtor: 10.0,
            phi: PhiSection::FULL,
        });
        assert_eq!(torus.local_extent(), Aabb::symmetric(12.0, 12.0, 2.0));

        let ellipsoid = Primitive::Ellipsoid(Ellipsoid {
            ax: 1.0,
            by: 2.0,
            cz: 3.0,
            zcut1: 0.0,
            zcut2: 1.5,
        });
        let extent = ellipsoid.local_extent();
        assert_eq!(extent.min.z, -3.0);
        assert_eq!(extent.max.z, 1.5);
    }

    #[test]
    fn polyhedra_extent_reaches_corners() {
        let polyhedra = |num_sides| {
            Primitive::Polyhedra(Polyhedra {
                phi: PhiSection::FULL,
                num_sides,
                planes: ZPlanes::new(vec![-5.0, 5.0], vec![0.0, 0.0], vec![10.0, 10.0]),
            })
        };

        let square = polyhedra(4).local_extent();
        assert!((square.max.x - 10.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
        assert_eq!(square.max.z, 5.0);

        for num_sides in [1, 2] {
            assert_eq!(polyhedra(num_sides).local_extent(), Aabb::symmetric(10.0, 10.0, 5.0));
        }
    }
}
