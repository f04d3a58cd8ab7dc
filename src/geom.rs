use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A point (or vector) in real-world millimetres.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Pt {
    pub x: f64,
    pub y: f64,
}

impl Pt {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, o: Pt) -> f64 {
        self.x * o.x + self.y * o.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, o: Pt) -> f64 {
        self.x * o.y - self.y * o.x
    }

    pub fn len2(self) -> f64 {
        self.dot(self)
    }

    pub fn len(self) -> f64 {
        self.len2().sqrt()
    }

    /// Unit vector, or zero for a zero-length input.
    pub fn norm(self) -> Pt {
        let l = self.len();
        if l <= 0.0 { Pt::default() } else { self * (1.0 / l) }
    }

    /// Rotated 90 degrees counter-clockwise.
    pub fn left(self) -> Pt {
        Pt::new(-self.y, self.x)
    }

    pub fn dist(self, o: Pt) -> f64 {
        (self - o).len()
    }
}

impl Add for Pt {
    type Output = Pt;
    fn add(self, o: Pt) -> Pt {
        Pt::new(self.x + o.x, self.y + o.y)
    }
}

impl AddAssign for Pt {
    fn add_assign(&mut self, o: Pt) {
        self.x += o.x;
        self.y += o.y;
    }
}

impl Sub for Pt {
    type Output = Pt;
    fn sub(self, o: Pt) -> Pt {
        Pt::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for Pt {
    type Output = Pt;
    fn mul(self, k: f64) -> Pt {
        Pt::new(self.x * k, self.y * k)
    }
}

impl Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::new(-self.x, -self.y)
    }
}

/// A closed real interval. `lo > hi` is the empty interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval { lo: 1.0, hi: 0.0 };

    pub fn new(a: f64, b: f64) -> Self {
        Self { lo: a.min(b), hi: a.max(b) }
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn len(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.hi - self.lo }
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    pub fn union(&self, o: &Interval) -> Interval {
        if self.is_empty() {
            return *o;
        }
        if o.is_empty() {
            return *self;
        }
        Interval { lo: self.lo.min(o.lo), hi: self.hi.max(o.hi) }
    }

    pub fn intersection(&self, o: &Interval) -> Interval {
        if self.is_empty() || o.is_empty() {
            return Interval::EMPTY;
        }
        let lo = self.lo.max(o.lo);
        let hi = self.hi.min(o.hi);
        if lo > hi { Interval::EMPTY } else { Interval { lo, hi } }
    }
}

/// Axis-aligned rectangle in real coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Interval,
    pub y: Interval,
}

impl Rect {
    pub const EMPTY: Rect = Rect { x: Interval::EMPTY, y: Interval::EMPTY };

    pub fn new(a: Pt, b: Pt) -> Self {
        Self { x: Interval::new(a.x, b.x), y: Interval::new(a.y, b.y) }
    }

    pub fn from_points(pts: &[Pt]) -> Rect {
        pts.iter().fold(Rect::EMPTY, |r, p| r.union(&Rect::new(*p, *p)))
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }

    pub fn corners(&self) -> [Pt; 4] {
        [
            Pt::new(self.x.lo, self.y.lo),
            Pt::new(self.x.hi, self.y.lo),
            Pt::new(self.x.hi, self.y.hi),
            Pt::new(self.x.lo, self.y.hi),
        ]
    }

    pub fn center(&self) -> Pt {
        Pt::new(self.x.center(), self.y.center())
    }

    pub fn contains(&self, p: Pt) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }

    pub fn union(&self, o: &Rect) -> Rect {
        if self.is_empty() {
            return *o;
        }
        if o.is_empty() {
            return *self;
        }
        Rect { x: self.x.union(&o.x), y: self.y.union(&o.y) }
    }

    pub fn intersection(&self, o: &Rect) -> Rect {
        let out = Rect { x: self.x.intersection(&o.x), y: self.y.intersection(&o.y) };
        if out.is_empty() { Rect::EMPTY } else { out }
    }

    /// Scale about the centre by `k` (1.1 grows by 10%).
    pub fn scaled(&self, k: f64) -> Rect {
        if self.is_empty() {
            return *self;
        }
        let c = self.center();
        let hx = 0.5 * self.x.len() * k;
        let hy = 0.5 * self.y.len() * k;
        Rect::new(Pt::new(c.x - hx, c.y - hy), Pt::new(c.x + hx, c.y + hy))
    }
}

/// The directed line through `org` along `dir`; the half-plane is the region to
/// its left (positive `value`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub org: Pt,
    /// Unit direction of the boundary line.
    pub dir: Pt,
}

impl HalfPlane {
    /// Line through `org` at `angle_rad` from the x axis.
    pub fn from_angle(org: Pt, angle_rad: f64) -> Self {
        Self { org, dir: Pt::new(angle_rad.cos(), angle_rad.sin()) }
    }

    /// Unit normal pointing into the half-plane.
    pub fn normal(&self) -> Pt {
        self.dir.left()
    }

    /// Signed distance of `p` from the boundary line.
    pub fn value(&self, p: Pt) -> f64 {
        (p - self.org).dot(self.normal())
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(v: f64, places: i32) -> f64 {
    let k = 10f64.powi(places);
    (v * k).round() / k
}
