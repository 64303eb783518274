//! Geometric primitives for page analysis and annotation.
//!
//! This module provides the basic types used throughout the crate: points,
//! rectangles, quarter-turn rotations, and the affine transforms used to
//! re-render pages upright and to shift content right of the gutter.
//!
//! All page coordinates are top-left origin with y increasing downward,
//! matching what the document handle reports for span geometry.

/// A 2D point in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the top-left corner
    pub x: f32,
    /// Y coordinate of the top-left corner
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center point of the rectangle.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// let center = rect.center();
    /// assert_eq!(center.x, 50.0);
    /// assert_eq!(center.y, 25.0);
    /// ```
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Check if this rectangle intersects with another.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rect;
    ///
    /// let r1 = Rect::new(0.0, 0.0, 100.0, 100.0);
    /// let r2 = Rect::new(50.0, 50.0, 100.0, 100.0);
    /// let r3 = Rect::new(200.0, 200.0, 100.0, 100.0);
    ///
    /// assert!(r1.intersects(&r2));
    /// assert!(!r1.intersects(&r3));
    /// ```
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Compute the union of this rectangle with another.
    ///
    /// Returns the smallest rectangle that contains both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.left().min(other.left());
        let y0 = self.top().min(other.top());
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::from_points(x0, y0, x1, y1)
    }

    /// Grow the rectangle outward by `amount` on every side.
    ///
    /// Used for tolerance-based overlap tests (e.g. the 2pt form-field
    /// exclusion zone around widget rectangles).
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rect;
    ///
    /// let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
    /// let grown = rect.inflate(2.0);
    /// assert_eq!(grown.x, 8.0);
    /// assert_eq!(grown.right(), 32.0);
    /// ```
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + 2.0 * amount,
            height: self.height + 2.0 * amount,
        }
    }
}

/// Quarter-turn page rotation as declared in page metadata.
///
/// PDF rotation is clockwise in the displayed page; only multiples of 90°
/// are legal. Arbitrary integers normalize modulo 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Upright (0°)
    #[default]
    R0,
    /// 90° clockwise
    R90,
    /// 180°
    R180,
    /// 270° clockwise
    R270,
}

impl Rotation {
    /// All four candidate rotations in vote order.
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Normalize an arbitrary degree value to a quarter turn.
    ///
    /// Values that are not multiples of 90 round to the nearest quarter
    /// turn; negative values wrap.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rotation;
    ///
    /// assert_eq!(Rotation::from_degrees(90), Rotation::R90);
    /// assert_eq!(Rotation::from_degrees(450), Rotation::R90);
    /// assert_eq!(Rotation::from_degrees(-90), Rotation::R270);
    /// ```
    pub fn from_degrees(deg: i32) -> Self {
        let normalized = deg.rem_euclid(360);
        match (normalized + 45) / 90 % 4 {
            1 => Rotation::R90,
            2 => Rotation::R180,
            3 => Rotation::R270,
            _ => Rotation::R0,
        }
    }

    /// The rotation in degrees.
    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Whether applying this rotation swaps page width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// Whether this is the upright rotation.
    pub fn is_upright(&self) -> bool {
        matches!(self, Rotation::R0)
    }

    /// The rotation that undoes this one.
    pub fn inverse(&self) -> Self {
        match self {
            Rotation::R0 => Rotation::R0,
            Rotation::R90 => Rotation::R270,
            Rotation::R180 => Rotation::R180,
            Rotation::R270 => Rotation::R90,
        }
    }

    /// This rotation followed by an additional quarter turn.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::Rotation;
    ///
    /// assert_eq!(Rotation::R90.compose(Rotation::R270), Rotation::R0);
    /// assert_eq!(Rotation::R180.compose(Rotation::R270), Rotation::R90);
    /// ```
    pub fn compose(&self, additional: Rotation) -> Self {
        Rotation::from_degrees(self.degrees() + additional.degrees())
    }
}

/// A 2D affine transform `[a, b, c, d, e, f]`.
///
/// Maps `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`, the PDF matrix
/// convention. Used for the two page rewrites this crate performs: baking a
/// declared rotation into upright content, and shifting content right to
/// open the gutter strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Matrix elements `[a, b, c, d, e, f]`
    pub m: [f32; 6],
}

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }

    /// A pure translation.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::{Point, Transform};
    ///
    /// let shift = Transform::translation(18.0, 0.0);
    /// let p = shift.apply(Point::new(100.0, 50.0));
    /// assert_eq!(p.x, 118.0);
    /// assert_eq!(p.y, 50.0);
    /// ```
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 1.0, tx, ty],
        }
    }

    /// The transform that redraws content of a page declared at `rotation`
    /// into a fresh upright page.
    ///
    /// `width` and `height` are the page's stored (unrotated) dimensions.
    /// For 90°/270° the upright page swaps them; the caller passes the new
    /// dimensions to the handle alongside this transform.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::{Point, Rotation, Transform};
    ///
    /// // Content top-left of a 612x792 page declared at 90° lands at the
    /// // top-right of the upright 792x612 page.
    /// let t = Transform::upright_from(Rotation::R90, 612.0, 792.0);
    /// let p = t.apply(Point::new(0.0, 0.0));
    /// assert_eq!(p.x, 792.0);
    /// assert_eq!(p.y, 0.0);
    /// ```
    pub fn upright_from(rotation: Rotation, width: f32, height: f32) -> Self {
        match rotation {
            Rotation::R0 => Self::identity(),
            Rotation::R90 => Self {
                m: [0.0, 1.0, -1.0, 0.0, height, 0.0],
            },
            Rotation::R180 => Self {
                m: [-1.0, 0.0, 0.0, -1.0, width, height],
            },
            Rotation::R270 => Self {
                m: [0.0, -1.0, 1.0, 0.0, 0.0, width],
            },
        }
    }

    /// Compose two transforms: apply `self` first, then `after`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_gutter::geometry::{Point, Rotation, Transform};
    ///
    /// let upright = Transform::upright_from(Rotation::R90, 612.0, 792.0);
    /// let shifted = upright.then(Transform::translation(18.0, 0.0));
    /// let p = shifted.apply(Point::new(0.0, 0.0));
    /// assert_eq!((p.x, p.y), (810.0, 0.0));
    /// ```
    pub fn then(&self, after: Transform) -> Transform {
        let [a1, b1, c1, d1, e1, f1] = self.m;
        let [a2, b2, c2, d2, e2, f2] = after.m;
        Transform {
            m: [
                a2 * a1 + c2 * b1,
                b2 * a1 + d2 * b1,
                a2 * c1 + c2 * d1,
                b2 * c1 + d2 * d1,
                a2 * e1 + c2 * f1 + e2,
                b2 * e1 + d2 * f1 + f2,
            ],
        }
    }

    /// Apply the transform to a point.
    pub fn apply(&self, p: Point) -> Point {
        let [a, b, c, d, e, f] = self.m;
        Point {
            x: a * p.x + c * p.y + e,
            y: b * p.x + d * p.y + f,
        }
    }

    /// Apply the transform to a rectangle, returning the axis-aligned
    /// bounding box of the four mapped corners.
    pub fn apply_rect(&self, r: &Rect) -> Rect {
        let corners = [
            self.apply(Point::new(r.left(), r.top())),
            self.apply(Point::new(r.right(), r.top())),
            self.apply(Point::new(r.left(), r.bottom())),
            self.apply(Point::new(r.right(), r.bottom())),
        ];
        let mut x0 = corners[0].x;
        let mut y0 = corners[0].y;
        let mut x1 = corners[0].x;
        let mut y1 = corners[0].y;
        for p in &corners[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Rect::from_points(x0, y0, x1, y1)
    }
}
