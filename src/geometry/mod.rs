pub mod affine;

pub use affine::GeoTransform;

/// A 2D point in projected map units.
///
/// # Example
///
/// ```rust
/// use tilecheck::Point;
///
/// let p = Point::new(-500_000.0, 500_000.0);
/// assert_eq!(p.x, -500_000.0);
///
/// let p2: Point = (-500_000.0, 500_000.0).into();
/// assert_eq!(p, p2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    #[must_use]
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::origin()
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    #[inline]
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Axis-aligned bounding box in the grid's coordinate reference system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    /// Square extent of side `size` centered on `center`
    #[must_use]
    pub fn centered(center: Point, size: f64) -> Self {
        let half = size / 2.0;
        Self::new(center.x - half, center.y - half, center.x + half, center.y + half)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    /// Top-left (north-west) corner
    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(self.minx, self.maxy)
    }
}
