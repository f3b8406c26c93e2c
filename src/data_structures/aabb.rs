use cgmath::{EuclideanSpace, Matrix4, Point3, Transform, Vector3};

/// Smallest extent the normalization divides by.
pub const MIN_EXTENT: f32 = 1e-6;

/// An axis-aligned bounding box.
///
/// The empty box has `(+inf, -inf)` corners, which makes it the identity
/// element of [`Aabb::union`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    lower_left_bottom: Point3<f32>,
    upper_right_top: Point3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            lower_left_bottom: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            upper_right_top: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Creates a box from two corners. The corners are reordered per axis,
    /// so any two opposite corners describe the same box.
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            lower_left_bottom: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            upper_right_top: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Folds min/max over all positions. No positions gives the empty box.
    pub fn from_points<I, P>(positions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Point3<f32>>,
    {
        positions
            .into_iter()
            .fold(Self::empty(), |aabb, p| aabb.expand(p.into()))
    }

    pub fn lower_left_bottom(&self) -> Point3<f32> {
        self.lower_left_bottom
    }

    pub fn upper_right_top(&self) -> Point3<f32> {
        self.upper_right_top
    }

    pub fn is_empty(&self) -> bool {
        self.lower_left_bottom.x > self.upper_right_top.x
            || self.lower_left_bottom.y > self.upper_right_top.y
            || self.lower_left_bottom.z > self.upper_right_top.z
    }

    pub fn expand(&self, p: Point3<f32>) -> Self {
        Self {
            lower_left_bottom: Point3::new(
                self.lower_left_bottom.x.min(p.x),
                self.lower_left_bottom.y.min(p.y),
                self.lower_left_bottom.z.min(p.z),
            ),
            upper_right_top: Point3::new(
                self.upper_right_top.x.max(p.x),
                self.upper_right_top.y.max(p.y),
                self.upper_right_top.z.max(p.z),
            ),
        }
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            lower_left_bottom: Point3::new(
                self.lower_left_bottom.x.min(other.lower_left_bottom.x),
                self.lower_left_bottom.y.min(other.lower_left_bottom.y),
                self.lower_left_bottom.z.min(other.lower_left_bottom.z),
            ),
            upper_right_top: Point3::new(
                self.upper_right_top.x.max(other.upper_right_top.x),
                self.upper_right_top.y.max(other.upper_right_top.y),
                self.upper_right_top.z.max(other.upper_right_top.z),
            ),
        }
    }

    pub fn center(&self) -> Point3<f32> {
        self.lower_left_bottom.midpoint(self.upper_right_top)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.upper_right_top - self.lower_left_bottom
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (l, u) = (self.lower_left_bottom, self.upper_right_top);
        [
            Point3::new(l.x, l.y, l.z),
            Point3::new(u.x, l.y, l.z),
            Point3::new(l.x, u.y, l.z),
            Point3::new(u.x, u.y, l.z),
            Point3::new(l.x, l.y, u.z),
            Point3::new(u.x, l.y, u.z),
            Point3::new(l.x, u.y, u.z),
            Point3::new(u.x, u.y, u.z),
        ]
    }

    /// Bounds the box after transforming it by `transform`.
    ///
    /// All 8 corners go through the matrix: under rotation the two extreme
    /// corners alone do not bound the result.
    pub fn transformed(&self, transform: &Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(
            self.corners()
                .iter()
                .map(|corner| transform.transform_point(*corner)),
        )
    }

    /// Affine matrix that moves the box center to the origin and scales the
    /// longest axis to span `[-0.5, 0.5]`.
    pub fn normalization_transform(&self) -> Matrix4<f32> {
        if self.is_empty() {
            return Matrix4::from_scale(1.0);
        }
        let extent = self.extent();
        let longest = extent.x.max(extent.y).max(extent.z).max(MIN_EXTENT);
        Matrix4::from_scale(1.0 / longest) * Matrix4::from_translation(-self.center().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, SquareMatrix};

    fn assert_point_near(actual: Point3<f32>, expected: Point3<f32>) {
        let d = actual - expected;
        assert!(
            d.x.abs() < 1e-5 && d.y.abs() < 1e-5 && d.z.abs() < 1e-5,
            "{actual:?} != {expected:?}"
        );
    }

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn from_points_folds_min_and_max() {
        let aabb = Aabb::from_points([
            [1.0_f32, 5.0, -2.0],
            [-3.0, 0.5, 4.0],
            [0.0, 2.0, 0.0],
        ]);
        assert_eq!(aabb.lower_left_bottom(), Point3::new(-3.0, 0.5, -2.0));
        assert_eq!(aabb.upper_right_top(), Point3::new(1.0, 5.0, 4.0));
    }

    #[test]
    fn from_no_points_is_empty() {
        let aabb = Aabb::from_points(Vec::<[f32; 3]>::new());
        assert!(aabb.is_empty());
        assert_eq!(aabb, Aabb::empty());
    }

    #[test]
    fn new_orders_corners() {
        let aabb = Aabb::new(Point3::new(1.0, -1.0, 2.0), Point3::new(-1.0, 1.0, 0.0));
        assert_eq!(aabb.lower_left_bottom(), Point3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.upper_right_top(), Point3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn empty_is_union_identity() {
        let a = unit_box();
        assert_eq!(a.union(&Aabb::empty()), a);
        assert_eq!(Aabb::empty().union(&a), a);
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn union_is_commutative_and_associative() {
        let a = unit_box();
        let b = Aabb::new(Point3::new(0.0, 2.0, -4.0), Point3::new(3.0, 3.0, 0.0));
        let c = Aabb::new(Point3::new(-7.0, 0.0, 0.0), Point3::new(-6.0, 0.5, 9.0));
        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.union(&b.union(&c)), a.union(&b).union(&c));
    }

    #[test]
    fn identity_transform_keeps_box() {
        let a = Aabb::new(Point3::new(-1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0));
        assert_eq!(a.transformed(&Matrix4::identity()), a);
    }

    #[test]
    fn rotation_uses_all_corners() {
        let flat = Aabb::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let rotated = flat.transformed(&Matrix4::from_angle_z(Deg(45.0)));
        let r = 2.0_f32.sqrt();
        assert_point_near(rotated.lower_left_bottom(), Point3::new(-r, -r, 0.0));
        assert_point_near(rotated.upper_right_top(), Point3::new(r, r, 0.0));

        // The two diagonal corners alone land on the y axis.
        let diagonal = Aabb::from_points(
            [flat.lower_left_bottom(), flat.upper_right_top()]
                .map(|p| Matrix4::from_angle_z(Deg(45.0)).transform_point(p)),
        );
        assert!(diagonal.extent().x < rotated.extent().x);
    }

    #[test]
    fn transforming_empty_stays_empty() {
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        assert!(Aabb::empty().transformed(&m).is_empty());
    }

    #[test]
    fn normalization_centers_and_scales_longest_axis() {
        let a = Aabb::new(Point3::new(2.0, -1.0, 10.0), Point3::new(6.0, 1.0, 11.0));
        let n = a.transformed(&a.normalization_transform());
        assert_point_near(n.center(), Point3::new(0.0, 0.0, 0.0));
        let e = n.extent();
        assert!((e.x.max(e.y).max(e.z) - 1.0).abs() < 1e-5);
        assert_point_near(n.lower_left_bottom(), Point3::new(-0.5, -0.25, -0.125));
    }

    #[test]
    fn normalization_of_degenerate_box_is_finite() {
        let point = Aabb::from_points([[3.0_f32, 3.0, 3.0]]);
        let m = point.normalization_transform();
        let n = point.transformed(&m);
        assert!(n.center().x.is_finite());
        assert_point_near(n.center(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(Aabb::empty().normalization_transform(), Matrix4::identity());
    }
}
