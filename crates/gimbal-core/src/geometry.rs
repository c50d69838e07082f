//! Geometric primitives for diagram layout
//!
//! Positions use a top-left origin: a node's `position` is the top-left
//! corner of its bounding box, and y grows downward. [`Bounds`] carries the
//! intersection and containment predicates that overlap detection, hierarchy
//! checking, and edge-crossing analysis are built on.

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f32 {
        self.y
    }

    /// Adds another point to this point, returning a new point
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Returns true if both coordinates are finite numbers
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Represents the dimensions of an element with width and height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f32 {
        self.height
    }

    /// Covered area, `width * height`
    pub fn area(self) -> f32 {
        self.width * self.height
    }

    /// Returns a new Size with the maximum width and height between this size and another
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Returns a new Size with padding added to both width and height
    ///
    /// The padding is applied according to the specified Insets values
    pub fn add_padding(self, insets: Insets) -> Self {
        Self {
            width: self.width + insets.horizontal_sum(),
            height: self.height + insets.vertical_sum(),
        }
    }

    /// Returns true if both dimensions are finite and strictly positive
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Represents a rectangular bounding box with minimum and maximum coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates bounds from a top-left origin and a size
    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self {
            min_x: origin.x(),
            min_y: origin.y(),
            max_x: origin.x() + size.width(),
            max_y: origin.y() + size.height(),
        }
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f32 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f32 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> f32 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> f32 {
        self.max_y
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Covered area
    pub fn area(self) -> f32 {
        self.width() * self.height()
    }

    /// Returns the top-left corner as a Point
    pub fn origin(self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Returns the center of the bounds
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Converts bounds to a Size object
    pub fn to_size(self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Merges two bounds to create a larger bounds that contains both
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Moves the bounds by the specified offset
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x(),
            min_y: self.min_y + offset.y(),
            max_x: self.max_x + offset.x(),
            max_y: self.max_y + offset.y(),
        }
    }

    /// Returns true if the two bounds share interior area.
    ///
    /// Touching edges do not count as an intersection.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Area shared between two bounds, 0.0 when they do not intersect
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let overlap_x = (self.max_x.min(other.max_x) - self.min_x.max(other.min_x)).max(0.0);
        let overlap_y = (self.max_y.min(other.max_y) - self.min_y.max(other.min_y)).max(0.0);
        overlap_x * overlap_y
    }

    /// Returns true if `other` lies fully inside these bounds (edges may touch)
    pub fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Returns true if the point lies inside the bounds (edges included)
    pub fn contains_point(&self, point: Point) -> bool {
        point.x() >= self.min_x
            && point.x() <= self.max_x
            && point.y() >= self.min_y
            && point.y() <= self.max_y
    }

    /// Returns true if the line segment `a`-`b` passes through these bounds
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.contains_point(a) || self.contains_point(b) {
            return true;
        }

        let top_left = Point::new(self.min_x, self.min_y);
        let top_right = Point::new(self.max_x, self.min_y);
        let bottom_left = Point::new(self.min_x, self.max_y);
        let bottom_right = Point::new(self.max_x, self.max_y);

        segments_intersect(a, b, top_left, top_right)
            || segments_intersect(a, b, top_right, bottom_right)
            || segments_intersect(a, b, bottom_right, bottom_left)
            || segments_intersect(a, b, bottom_left, top_left)
    }
}

/// Represents spacing around an element (padding, margin, etc.)
/// with potentially different values for each side
#[derive(Debug, Clone, Copy, Default)]
pub struct Insets {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Insets {
    /// Creates new insets with specified values for each side
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Creates uniform insets with the same value for all sides
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Returns the top inset value
    pub fn top(self) -> f32 {
        self.top
    }

    /// Returns the right inset value
    pub fn right(self) -> f32 {
        self.right
    }

    /// Returns the bottom inset value
    pub fn bottom(self) -> f32 {
        self.bottom
    }

    /// Returns the left inset value
    pub fn left(self) -> f32 {
        self.left
    }

    /// Returns the sum of left and right insets
    pub fn horizontal_sum(self) -> f32 {
        self.left + self.right
    }

    /// Returns the sum of top and bottom insets
    pub fn vertical_sum(self) -> f32 {
        self.top + self.bottom
    }
}

/// Signed area of the triangle `a`, `b`, `c`; sign encodes winding.
fn orientation(a: Point, b: Point, c: Point) -> f32 {
    (b.x() - a.x()) * (c.y() - a.y()) - (b.y() - a.y()) * (c.x() - a.x())
}

/// Returns true if `p` lies within the axis-aligned box spanned by `a` and `b`.
fn within_span(a: Point, b: Point, p: Point) -> bool {
    p.x() >= a.x().min(b.x())
        && p.x() <= a.x().max(b.x())
        && p.y() >= a.y().min(b.y())
        && p.y() <= a.y().max(b.y())
}

/// Returns true if segment `a1`-`a2` intersects segment `b1`-`b2`.
///
/// Collinear overlapping segments count as intersecting.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && within_span(b1, b2, a1))
        || (d2 == 0.0 && within_span(b1, b2, a2))
        || (d3 == 0.0 && within_span(a1, a2, b1))
        || (d4 == 0.0 && within_span(a1, a2, b2))
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(3.0, 4.0).add_point(Point::new(1.0, -2.0));
        assert_eq!(p, Point::new(4.0, 2.0));
        assert_eq!(p.sub_point(Point::new(4.0, 2.0)), Point::default());
    }

    #[test]
    fn test_point_distance() {
        let distance = Point::new(0.0, 0.0).distance_to(Point::new(3.0, 4.0));
        assert!(approx_eq!(f32, distance, 5.0));
    }

    #[test]
    fn test_size_area_and_max() {
        let size = Size::new(10.0, 20.0);
        assert!(approx_eq!(f32, size.area(), 200.0));
        assert_eq!(size.max(Size::new(15.0, 5.0)), Size::new(15.0, 20.0));
    }

    #[test]
    fn test_size_add_padding() {
        let padded = Size::new(100.0, 50.0).add_padding(Insets::uniform(80.0));
        assert_eq!(padded, Size::new(260.0, 210.0));
    }

    #[test]
    fn test_size_validity() {
        assert!(Size::new(1.0, 1.0).is_valid());
        assert!(!Size::new(0.0, 1.0).is_valid());
        assert!(!Size::new(f32::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_bounds_from_origin() {
        let bounds = Bounds::from_origin(Point::new(10.0, 20.0), Size::new(100.0, 50.0));
        assert_eq!(bounds.min_x(), 10.0);
        assert_eq!(bounds.min_y(), 20.0);
        assert_eq!(bounds.max_x(), 110.0);
        assert_eq!(bounds.max_y(), 70.0);
        assert_eq!(bounds.origin(), Point::new(10.0, 20.0));
        assert_eq!(bounds.center(), Point::new(60.0, 45.0));
        assert_eq!(bounds.to_size(), Size::new(100.0, 50.0));
    }

    #[test]
    fn test_bounds_intersection() {
        let a = Bounds::from_origin(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        let b = Bounds::from_origin(Point::new(50.0, 50.0), Size::new(100.0, 100.0));
        let c = Bounds::from_origin(Point::new(200.0, 0.0), Size::new(10.0, 10.0));

        assert!(a.intersects(&b));
        assert!(approx_eq!(f32, a.intersection_area(&b), 2500.0));
        assert!(!a.intersects(&c));
        assert_eq!(a.intersection_area(&c), 0.0);
    }

    #[test]
    fn test_touching_bounds_do_not_intersect() {
        let a = Bounds::from_origin(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        let b = Bounds::from_origin(Point::new(100.0, 0.0), Size::new(100.0, 100.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_bounds_containment() {
        let parent = Bounds::from_origin(Point::new(0.0, 0.0), Size::new(400.0, 200.0));
        let child = Bounds::from_origin(Point::new(80.0, 80.0), Size::new(100.0, 50.0));
        let escaping = Bounds::from_origin(Point::new(350.0, 80.0), Size::new(100.0, 50.0));

        assert!(parent.contains(&child));
        assert!(!parent.contains(&escaping));
        assert!(parent.contains_point(Point::new(0.0, 0.0)));
        assert!(!parent.contains_point(Point::new(-1.0, 0.0)));
    }

    #[test]
    fn test_segment_intersection() {
        let crossing = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert!(crossing);

        let parallel = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 5.0),
            Point::new(10.0, 5.0),
        );
        assert!(!parallel);

        let collinear_overlap = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(15.0, 0.0),
        );
        assert!(collinear_overlap);
    }

    #[test]
    fn test_segment_through_bounds() {
        let bounds = Bounds::from_origin(Point::new(50.0, 50.0), Size::new(100.0, 100.0));

        // Passes straight through without either endpoint inside
        assert!(bounds.intersects_segment(Point::new(0.0, 100.0), Point::new(300.0, 100.0)));
        // Endpoint inside
        assert!(bounds.intersects_segment(Point::new(75.0, 75.0), Point::new(300.0, 300.0)));
        // Misses entirely
        assert!(!bounds.intersects_segment(Point::new(0.0, 0.0), Point::new(300.0, 0.0)));
    }

    proptest! {
        #[test]
        fn merge_contains_both_inputs(
            ax in -1000.0f32..1000.0, ay in -1000.0f32..1000.0,
            aw in 1.0f32..500.0, ah in 1.0f32..500.0,
            bx in -1000.0f32..1000.0, by in -1000.0f32..1000.0,
            bw in 1.0f32..500.0, bh in 1.0f32..500.0,
        ) {
            let a = Bounds::from_origin(Point::new(ax, ay), Size::new(aw, ah));
            let b = Bounds::from_origin(Point::new(bx, by), Size::new(bw, bh));
            let merged = a.merge(&b);
            prop_assert!(merged.contains(&a));
            prop_assert!(merged.contains(&b));
        }

        #[test]
        fn intersection_area_never_exceeds_smaller_box(
            ax in -1000.0f32..1000.0, ay in -1000.0f32..1000.0,
            aw in 1.0f32..500.0, ah in 1.0f32..500.0,
            bx in -1000.0f32..1000.0, by in -1000.0f32..1000.0,
            bw in 1.0f32..500.0, bh in 1.0f32..500.0,
        ) {
            let a = Bounds::from_origin(Point::new(ax, ay), Size::new(aw, ah));
            let b = Bounds::from_origin(Point::new(bx, by), Size::new(bw, bh));
            let shared = a.intersection_area(&b);
            prop_assert!(shared >= 0.0);
            prop_assert!(shared <= a.area().min(b.area()) + 1e-3);
        }
    }
}
