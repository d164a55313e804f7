use crate::env::Position;

/// Direction a direction-dependent shape opens toward.
///
/// Components are in the same fixed-point units as [`Position`]; only the
/// direction matters. A zero vector means "no facing" and falls back to +x.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facing {
    pub dx: i32,
    pub dy: i32,
}

impl Default for Facing {
    fn default() -> Self {
        Self::POSITIVE_X
    }
}

impl Facing {
    /// Angle 0.
    pub const POSITIVE_X: Self = Self { dx: 1000, dy: 0 };

    pub fn new(dx: i32, dy: i32) -> Self {
        if dx == 0 && dy == 0 {
            Self::POSITIVE_X
        } else {
            Self { dx, dy }
        }
    }

    /// Facing from `from` toward `to`, or +x when they coincide.
    pub fn between(from: Position, to: Position) -> Self {
        Self::new(to.x.saturating_sub(from.x), to.y.saturating_sub(from.y))
    }

    fn length_sq(self) -> i128 {
        let (dx, dy) = (self.dx as i128, self.dy as i128);
        dx * dx + dy * dy
    }
}

/// Geometric query shape, in fixed-point length units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryShape {
    Circle { radius: i32 },
    /// Sector of `radius` opening `half_angle_deg` to each side of the facing.
    Cone { radius: i32, half_angle_deg: u16 },
    /// Rectangle centered on the origin, `length` along the facing.
    Rectangle { length: i32, half_width: i32 },
    /// Rectangle starting at the origin and extending `length` forward.
    Line { length: i32, half_width: i32 },
    /// Annulus; the query returns the full outer disc and the inner radius
    /// is excluded during hit filtering.
    Ring { inner: i32, outer: i32 },
}

impl QueryShape {
    /// Radius of a circle around the origin that bounds the shape.
    pub fn reach(&self) -> i64 {
        match *self {
            Self::Circle { radius } | Self::Cone { radius, .. } => radius as i64,
            Self::Rectangle { length, half_width } => (length as i64) / 2 + half_width as i64,
            Self::Line { length, half_width } => length as i64 + half_width as i64,
            Self::Ring { outer, .. } => outer as i64,
        }
    }

    /// Inner exclusion radius, for ring shapes.
    pub fn inner_radius(&self) -> Option<i32> {
        match *self {
            Self::Ring { inner, .. } if inner > 0 => Some(inner),
            _ => None,
        }
    }

    /// Whether `point` lies in the shape anchored at `origin` facing `facing`.
    pub fn contains(&self, origin: Position, facing: Facing, point: Position) -> bool {
        let dx = point.x as i128 - origin.x as i128;
        let dy = point.y as i128 - origin.y as i128;
        let dist_sq = dx * dx + dy * dy;
        let (fx, fy) = (facing.dx as i128, facing.dy as i128);
        let facing_sq = facing.length_sq();
        let along = dx * fx + dy * fy;
        let across = dx * fy - dy * fx;

        match *self {
            Self::Circle { radius } | Self::Ring { outer: radius, .. } => {
                dist_sq <= (radius as i128).pow(2)
            }
            Self::Cone {
                radius,
                half_angle_deg,
            } => {
                if dist_sq > (radius as i128).pow(2) {
                    return false;
                }
                if dist_sq == 0 || half_angle_deg >= 180 {
                    return true;
                }
                let cos = along as f64 / ((dist_sq as f64).sqrt() * (facing_sq as f64).sqrt());
                cos >= (half_angle_deg as f64).to_radians().cos()
            }
            Self::Rectangle { length, half_width } => {
                along * along * 4 <= (length as i128).pow(2) * facing_sq
                    && across * across <= (half_width as i128).pow(2) * facing_sq
            }
            Self::Line { length, half_width } => {
                along >= 0
                    && along * along <= (length as i128).pow(2) * facing_sq
                    && across * across <= (half_width as i128).pow(2) * facing_sq
            }
        }
    }
}
