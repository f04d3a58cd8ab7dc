use crate::geom::{Pt, Rect};
use crate::im::{MaskIm, Roi};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Material tag carried by a bitmap (and by a bitmap list entry).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(pub String);

impl Material {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The extent reported by the empty sentinel: a zero-size rectangle at the
/// origin. `a.difference(&a)` therefore does not keep `a`'s extent.
pub const PLACEHOLDER_RECT: Rect = Rect {
    x: crate::geom::Interval { lo: 0.0, hi: 0.0 },
    y: crate::geom::Interval { lo: 0.0, hi: 0.0 },
};

/// A mask anchored on the global pixel lattice of size `pixel`.
///
/// Mask pixel (x, y) is lattice pixel (roi.l + x, roi.b + y); row 0 is the
/// lowest y.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub pixel: f64,
    pub roi: Roi,
    pub mask: MaskIm,
}

impl Grid {
    pub fn new(roi: Roi, pixel: f64) -> Self {
        assert!(pixel > 0.0, "pixel size must be positive");
        Self { pixel, roi, mask: MaskIm::new(roi.w(), roi.h()) }
    }

    /// Lattice pixel under a real point.
    #[inline]
    pub fn lattice_of(&self, p: Pt) -> (i64, i64) {
        lattice_of(p, self.pixel)
    }

    #[inline]
    pub fn is_solid(&self, i: i64, j: i64) -> bool {
        self.mask.is_on(i - self.roi.l, j - self.roi.b)
    }

    /// Real coordinates of the centre of lattice pixel (i, j).
    #[inline]
    pub fn center_of(&self, i: i64, j: i64) -> Pt {
        Pt::new((i as f64 + 0.5) * self.pixel, (j as f64 + 0.5) * self.pixel)
    }

    /// Real coordinates of the lower-left corner of lattice pixel (i, j).
    #[inline]
    pub fn corner_of(&self, i: i64, j: i64) -> Pt {
        Pt::new(i as f64 * self.pixel, j as f64 * self.pixel)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(
            self.corner_of(self.roi.l, self.roi.b),
            self.corner_of(self.roi.r, self.roi.t),
        )
    }

    fn same_lattice(&self, o: &Grid) -> bool {
        (self.pixel - o.pixel).abs() <= 1e-12 * self.pixel.max(o.pixel)
    }

    /// The ROI `other` covers when expressed on this grid's lattice.
    fn roi_of(&self, other: &Grid) -> Roi {
        if self.same_lattice(other) {
            return other.roi;
        }
        roi_for_rect(&other.rect(), self.pixel)
    }

    /// Re-express this grid over `roi` on the lattice of size `pixel`.
    /// Pixels outside this grid come out as air.
    fn render_onto(&self, roi: Roi, pixel: f64) -> MaskIm {
        let mut out = MaskIm::new(roi.w(), roi.h());
        if (self.pixel - pixel).abs() <= 1e-12 * self.pixel.max(pixel) {
            let Some(common) = self.roi.intersection(&roi) else {
                return out;
            };
            let n = common.w();
            for j in common.b..common.t {
                let src_i = (j - self.roi.b) as usize * self.mask.s + (common.l - self.roi.l) as usize;
                let dst_i = (j - roi.b) as usize * out.s + (common.l - roi.l) as usize;
                out.arr[dst_i..dst_i + n].copy_from_slice(&self.mask.arr[src_i..src_i + n]);
            }
            return out;
        }

        // Different pixel sizes: sample pixel centres.
        for j in roi.b..roi.t {
            for i in roi.l..roi.r {
                let c = Pt::new((i as f64 + 0.5) * pixel, (j as f64 + 0.5) * pixel);
                let (si, sj) = self.lattice_of(c);
                if self.is_solid(si, sj) {
                    out.set((i - roi.l) as usize, (j - roi.b) as usize, true);
                }
            }
        }
        out
    }
}

#[inline]
pub fn lattice_of(p: Pt, pixel: f64) -> (i64, i64) {
    ((p.x / pixel).floor() as i64, (p.y / pixel).floor() as i64)
}

/// Smallest lattice ROI covering `rect` (at least one pixel).
pub fn roi_for_rect(rect: &Rect, pixel: f64) -> Roi {
    if rect.is_empty() {
        return Roi::new(0, 0, 1, 1);
    }
    let l = (rect.x.lo / pixel).floor() as i64;
    let b = (rect.y.lo / pixel).floor() as i64;
    let r = ((rect.x.hi / pixel).ceil() as i64).max(l + 1);
    let t = ((rect.y.hi / pixel).ceil() as i64).max(b + 1);
    Roi::new(l, b, r, t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    Union,
    Intersection,
    Difference,
}

/// In-place per-pixel combine of two equally sized masks (internal fast path).
fn combine_in_place(dst: &mut MaskIm, rhs: &MaskIm, op: BoolOp) {
    debug_assert_eq!((dst.w, dst.h), (rhs.w, rhs.h));
    for (d, &r) in dst.arr.iter_mut().zip(rhs.arr.iter()) {
        let a = *d != 0;
        let b = r != 0;
        let on = match op {
            BoolOp::Union => a || b,
            BoolOp::Intersection => a && b,
            BoolOp::Difference => a && !b,
        };
        *d = if on { crate::im::MASK_ON } else { 0 };
    }
}

/// A rasterised solid/air slice of one material.
///
/// `Empty` is the "nothing" value: it has no grid, no material and reports
/// [`PLACEHOLDER_RECT`] as its extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SliceBitmap {
    #[default]
    Empty,
    Populated {
        grid: Grid,
        material: Option<Material>,
    },
}

impl SliceBitmap {
    /// Rasterise a predicate over `rect`, sampling pixel centres.
    pub fn from_fn<F: Fn(Pt) -> bool>(
        rect: &Rect,
        pixel: f64,
        material: Option<Material>,
        inside: F,
    ) -> SliceBitmap {
        let roi = roi_for_rect(rect, pixel);
        let mut grid = Grid::new(roi, pixel);
        for j in roi.b..roi.t {
            for i in roi.l..roi.r {
                if inside(grid.center_of(i, j)) {
                    grid.mask.set((i - roi.l) as usize, (j - roi.b) as usize, true);
                }
            }
        }
        SliceBitmap::from_grid(grid, material)
    }

    /// Wrap a grid, normalizing an all-air grid to `Empty`.
    pub fn from_grid(grid: Grid, material: Option<Material>) -> SliceBitmap {
        if grid.mask.any_on() {
            SliceBitmap::Populated { grid, material }
        } else {
            SliceBitmap::Empty
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SliceBitmap::Empty)
    }

    pub fn grid(&self) -> Option<&Grid> {
        match self {
            SliceBitmap::Empty => None,
            SliceBitmap::Populated { grid, .. } => Some(grid),
        }
    }

    pub fn material(&self) -> Option<&Material> {
        match self {
            SliceBitmap::Empty => None,
            SliceBitmap::Populated { material, .. } => material.as_ref(),
        }
    }

    pub fn with_material(self, material: Option<Material>) -> SliceBitmap {
        match self {
            SliceBitmap::Empty => SliceBitmap::Empty,
            SliceBitmap::Populated { grid, .. } => SliceBitmap::Populated { grid, material },
        }
    }

    pub fn pixel_size(&self) -> Option<f64> {
        self.grid().map(|g| g.pixel)
    }

    /// Real-world extent of the backing grid.
    pub fn rect(&self) -> Rect {
        self.grid().map_or(PLACEHOLDER_RECT, Grid::rect)
    }

    /// Point membership; false anywhere outside the backing rectangle.
    pub fn get(&self, p: Pt) -> bool {
        match self {
            SliceBitmap::Empty => false,
            SliceBitmap::Populated { grid, .. } => {
                let (i, j) = grid.lattice_of(p);
                grid.is_solid(i, j)
            }
        }
    }

    pub fn solid_count(&self) -> usize {
        self.grid().map_or(0, |g| g.mask.count_on())
    }

    /// Same solid pixels on the same lattice, regardless of grid extent.
    pub fn same_content(&self, other: &SliceBitmap) -> bool {
        match (self, other) {
            (SliceBitmap::Empty, SliceBitmap::Empty) => true,
            (SliceBitmap::Populated { grid: a, .. }, SliceBitmap::Populated { grid: b, .. }) => {
                if !a.same_lattice(b) {
                    return false;
                }
                let roi = a.roi.union(&b.roi);
                a.render_onto(roi, a.pixel) == b.render_onto(roi, a.pixel)
            }
            _ => false,
        }
    }

    fn check_materials(&self, other: &SliceBitmap, op: &str) {
        if let (Some(a), Some(b)) = (self.material(), other.material()) {
            if a != b {
                warn!(op = op, a = %a, b = %b, "combining bitmaps of different materials");
            }
        }
    }

    fn result_material(&self, other: &SliceBitmap) -> Option<Material> {
        self.material().or(other.material()).cloned()
    }

    pub fn union(&self, other: &SliceBitmap) -> SliceBitmap {
        if std::ptr::eq(self, other) {
            return self.clone();
        }
        let (a, b) = match (self, other) {
            (SliceBitmap::Empty, _) => return other.clone(),
            (_, SliceBitmap::Empty) => return self.clone(),
            (SliceBitmap::Populated { grid: a, .. }, SliceBitmap::Populated { grid: b, .. }) => {
                (a, b)
            }
        };
        self.check_materials(other, "union");
        let material = self.result_material(other);

        let b_roi = a.roi_of(b);
        let roi = a.roi.union(&b_roi);
        self.combine(a, b, roi, BoolOp::Union, material)
    }

    pub fn intersection(&self, other: &SliceBitmap) -> SliceBitmap {
        if std::ptr::eq(self, other) {
            return self.clone();
        }
        let (a, b) = match (self, other) {
            (SliceBitmap::Empty, _) | (_, SliceBitmap::Empty) => return SliceBitmap::Empty,
            (SliceBitmap::Populated { grid: a, .. }, SliceBitmap::Populated { grid: b, .. }) => {
                (a, b)
            }
        };
        self.check_materials(other, "intersection");
        let material = self.result_material(other);

        let Some(roi) = a.roi.intersection(&a.roi_of(b)) else {
            return SliceBitmap::Empty;
        };
        self.combine(a, b, roi, BoolOp::Intersection, material)
    }

    /// `self` minus `other`, over `self`'s extent.
    pub fn difference(&self, other: &SliceBitmap) -> SliceBitmap {
        if std::ptr::eq(self, other) {
            return SliceBitmap::Empty;
        }
        let (a, b) = match (self, other) {
            (SliceBitmap::Empty, _) => return SliceBitmap::Empty,
            (_, SliceBitmap::Empty) => return self.clone(),
            (SliceBitmap::Populated { grid: a, .. }, SliceBitmap::Populated { grid: b, .. }) => {
                (a, b)
            }
        };
        self.check_materials(other, "difference");
        let material = self.material().cloned();

        if a.roi.intersection(&a.roi_of(b)).is_none() {
            return self.clone();
        }
        self.combine(a, b, a.roi, BoolOp::Difference, material)
    }

    fn combine(&self, a: &Grid, b: &Grid, roi: Roi, op: BoolOp, material: Option<Material>) -> SliceBitmap {
        let mut mask = if roi == a.roi {
            a.mask.clone()
        } else {
            a.render_onto(roi, a.pixel)
        };
        let rhs_owned;
        let rhs = if roi == b.roi && a.same_lattice(b) {
            &b.mask
        } else {
            rhs_owned = b.render_onto(roi, a.pixel);
            &rhs_owned
        };
        combine_in_place(&mut mask, rhs, op);
        SliceBitmap::from_grid(Grid { pixel: a.pixel, roi, mask }, material)
    }

    /// Write the mask as a greyscale PNG (a 1x1 black image for `Empty`).
    #[cfg(feature = "im-io")]
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> image::ImageResult<()> {
        match self {
            SliceBitmap::Empty => MaskIm::new(1, 1).save_png(path),
            SliceBitmap::Populated { grid, .. } => grid.mask.save_png(path),
        }
    }
}
