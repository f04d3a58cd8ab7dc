/// Integer pixel rectangle on the global pixel lattice of a given pixel size.
///
/// Pixel (i, j) covers the real square `[i*p, (i+1)*p) x [j*p, (j+1)*p)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Roi {
    pub l: i64,
    /// Bottom (lowest y) row.
    pub b: i64,
    /// Exclusive right bound.
    pub r: i64,
    /// Exclusive top bound.
    pub t: i64,
}

impl Roi {
    pub fn new(l: i64, b: i64, r: i64, t: i64) -> Self {
        Self { l, b, r: r.max(l), t: t.max(b) }
    }

    /// Width of the ROI.
    pub fn w(&self) -> usize {
        (self.r - self.l).max(0) as usize
    }

    /// Height of the ROI.
    pub fn h(&self) -> usize {
        (self.t - self.b).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.r <= self.l || self.t <= self.b
    }

    pub fn contains(&self, i: i64, j: i64) -> bool {
        i >= self.l && i < self.r && j >= self.b && j < self.t
    }

    /// Make a new ROI from this one by `pad` pixels in all directions.
    pub fn padded(&self, pad: i64) -> Roi {
        Roi::new(self.l - pad, self.b - pad, self.r + pad, self.t + pad)
    }

    pub fn union(&self, other: &Roi) -> Roi {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Roi {
            l: self.l.min(other.l),
            b: self.b.min(other.b),
            r: self.r.max(other.r),
            t: self.t.max(other.t),
        }
    }

    /// `None` when the two do not overlap.
    pub fn intersection(&self, other: &Roi) -> Option<Roi> {
        let out = Roi {
            l: self.l.max(other.l),
            b: self.b.max(other.b),
            r: self.r.min(other.r),
            t: self.t.min(other.t),
        };
        if out.is_empty() { None } else { Some(out) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both() {
        let a = Roi::new(0, 0, 4, 4);
        let b = Roi::new(2, -3, 6, 1);
        assert_eq!(a.union(&b), Roi::new(0, -3, 6, 4));
        assert_eq!(a.intersection(&b), Some(Roi::new(2, 0, 4, 1)));
        assert_eq!(a.intersection(&Roi::new(4, 0, 8, 4)), None);
        assert_eq!(a.w(), 4);
        assert_eq!(b.h(), 4);
    }
}
