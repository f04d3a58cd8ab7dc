use crate::geom::{Pt, Rect};

/// A polyline in real coordinates. Closed polygons have an implicit edge from
/// the last point back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    pub points: Vec<Pt>,
    pub closed: bool,
}

/// Distance from `p` to the segment `a`-`b`.
pub fn dist_to_segment(p: Pt, a: Pt, b: Pt) -> f64 {
    let ab = b - a;
    let l2 = ab.len2();
    if l2 <= 0.0 {
        return p.dist(a);
    }
    let t = ((p - a).dot(ab) / l2).clamp(0.0, 1.0);
    p.dist(a + ab * t)
}

impl Polygon {
    pub fn closed(points: Vec<Pt>) -> Self {
        Self { points, closed: true }
    }

    pub fn open(points: Vec<Pt>) -> Self {
        Self { points, closed: false }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Pt> {
        self.points.first().copied()
    }

    /// Shoelace area: positive for counter-clockwise, zero for open paths.
    pub fn signed_area(&self) -> f64 {
        if !self.closed || self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            sum += self.points[i].cross(self.points[(i + 1) % n]);
        }
        0.5 * sum
    }

    pub fn bbox(&self) -> Rect {
        Rect::from_points(&self.points)
    }

    /// Even-odd point containment; always false for open paths.
    pub fn contains(&self, p: Pt) -> bool {
        if !self.closed || self.points.len() < 3 {
            return false;
        }
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon { points, closed: self.closed }
    }

    /// Drop vertices lying within `tol` of the segment joining their
    /// neighbours, repeating until nothing more can go. Open paths keep both
    /// endpoints; closed polygons keep at least three points.
    pub fn simplify(&self, tol: f64) -> Polygon {
        let mut pts = self.points.clone();
        pts.dedup();
        if self.closed && pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }

        loop {
            let n = pts.len();
            let min_len = if self.closed { 3 } else { 2 };
            if n <= min_len {
                break;
            }

            let mut removed = false;
            let mut i = if self.closed { 0 } else { 1 };
            while i < pts.len() {
                let n = pts.len();
                if n <= min_len || (!self.closed && i + 1 >= n) {
                    break;
                }
                let prev = pts[(i + n - 1) % n];
                let next = pts[(i + 1) % n];
                if dist_to_segment(pts[i], prev, next) < tol {
                    pts.remove(i);
                    removed = true;
                } else {
                    i += 1;
                }
            }
            if !removed {
                break;
            }
        }

        Polygon { points: pts, closed: self.closed }
    }
}
