use crate::geom::{Pt, Rect};
use crate::poly::Polygon;
use crate::slice_bitmap::{Grid, Material, SliceBitmap, roi_for_rect};
use clipper2::{EndType, JoinType, One, Path, Paths, Point};

pub type IntPoint = Point<One>;
pub type IntPath = Path<One>;
pub type IntPaths = Paths<One>;

/// Fixed-point units per millimetre for clipper2 coordinates.
pub const MPOLY_FIXED_DENOM: f64 = 1000.0;

/// A set of closed rings (outer boundaries and holes) in fixed point.
#[derive(Clone, Debug)]
pub struct MPoly {
    paths: IntPaths,
}

fn to_fixed(v: f64) -> i64 {
    (v * MPOLY_FIXED_DENOM).round() as i64
}

fn from_fixed(v: i64) -> f64 {
    v as f64 / MPOLY_FIXED_DENOM
}

// - callback: Takes the pixel row and the [x_start, x_end) pixel span.
//   Pixels are filled when their centre lies inside (even-odd).
fn fill_rings<F: FnMut(i64, i64, i64)>(rings: &[Vec<Pt>], pixel: f64, roi_b: i64, roi_t: i64, callback: &mut F) {
    let mut x_intersections: Vec<f64> = Vec::new();

    for j in roi_b..roi_t {
        let yc = (j as f64 + 0.5) * pixel;
        x_intersections.clear();

        for ring in rings {
            if ring.len() < 2 {
                continue;
            }
            let mut p0 = ring[ring.len() - 1];
            for &p1 in ring {
                if p0.y != p1.y {
                    let y_min = p0.y.min(p1.y);
                    let y_max = p0.y.max(p1.y);
                    // Half-open range to avoid double-counting shared vertices.
                    if yc >= y_min && yc < y_max {
                        let t = (yc - p0.y) / (p1.y - p0.y);
                        x_intersections.push(p0.x + t * (p1.x - p0.x));
                    }
                }
                p0 = p1;
            }
        }

        if x_intersections.len() < 2 {
            continue;
        }
        x_intersections.sort_unstable_by(f64::total_cmp);

        for pair in x_intersections.chunks_exact(2) {
            let i0 = (pair[0] / pixel - 0.5).ceil() as i64;
            let i1 = (pair[1] / pixel - 0.5).ceil() as i64;
            if i0 < i1 {
                callback(j, i0, i1);
            }
        }
    }
}

impl MPoly {
    pub fn new(paths: Vec<IntPath>) -> Self {
        Self { paths: IntPaths::new(paths) }
    }

    pub fn from_polygons(polys: &[Polygon]) -> Self {
        let paths: Vec<IntPath> = polys
            .iter()
            .filter(|p| p.len() >= 3)
            .map(|p| {
                IntPath::new(
                    p.points
                        .iter()
                        .map(|pt| IntPoint::from_scaled(to_fixed(pt.x), to_fixed(pt.y)))
                        .collect(),
                )
            })
            .collect();
        Self::new(paths)
    }

    /// Closed real-coordinate rings.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.paths
            .iter()
            .map(|path| {
                Polygon::closed(
                    path.iter()
                        .map(|pt| Pt::new(from_fixed(pt.x_scaled()), from_fixed(pt.y_scaled())))
                        .collect(),
                )
            })
            .collect()
    }

    pub fn paths(&self) -> &IntPaths {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn bbox(&self) -> Rect {
        self.to_polygons()
            .iter()
            .fold(Rect::EMPTY, |r, p| r.union(&p.bbox()))
    }

    /// Offset every ring by `delta_mm` (positive grows outer rings and
    /// shrinks holes) with round joins.
    pub fn inflate(&self, delta_mm: f64) -> Self {
        Self {
            paths: self.paths.inflate(
                delta_mm * MPOLY_FIXED_DENOM,
                JoinType::Round,
                EndType::Polygon,
                2.0,
            ),
        }
    }

    /// Even-odd scanline fill into a slice bitmap sampled at pixel centres.
    pub fn rasterize(&self, pixel: f64, material: Option<Material>) -> SliceBitmap {
        let rings: Vec<Vec<Pt>> = self.to_polygons().into_iter().map(|p| p.points).collect();
        let bbox = rings
            .iter()
            .fold(Rect::EMPTY, |r, ring| r.union(&Rect::from_points(ring)));
        if bbox.is_empty() {
            return SliceBitmap::Empty;
        }

        let roi = roi_for_rect(&bbox, pixel);
        let mut grid = Grid::new(roi, pixel);
        fill_rings(&rings, pixel, roi.b, roi.t, &mut |j, i0, i1| {
            let i0 = i0.max(roi.l);
            let i1 = i1.min(roi.r);
            for i in i0..i1 {
                grid.mask.set((i - roi.l) as usize, (j - roi.b) as usize, true);
            }
        });
        SliceBitmap::from_grid(grid, material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn rect_poly(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::closed(vec![
            Pt::new(x0, y0),
            Pt::new(x1, y0),
            Pt::new(x1, y1),
            Pt::new(x0, y1),
        ])
    }

    fn circle(n: usize, cx: f64, cy: f64, r: f64) -> Polygon {
        let step = TAU / n as f64;
        Polygon::closed(
            (0..n)
                .map(|i| {
                    let a = i as f64 * step;
                    Pt::new(cx + r * a.cos(), cy + r * a.sin())
                })
                .collect(),
        )
    }

    #[test]
    fn rasterize_square() {
        let mp = MPoly::from_polygons(&[rect_poly(0.0, 0.0, 4.0, 4.0)]);
        let bm = mp.rasterize(1.0, Some(Material::new("pla")));
        assert_eq!(bm.solid_count(), 16);
        assert_eq!(bm.material(), Some(&Material::new("pla")));
        assert!(bm.get(Pt::new(3.9, 3.9)));
        assert!(!bm.get(Pt::new(4.1, 3.9)));
    }

    #[test]
    fn rasterize_with_hole_is_even_odd() {
        let mp = MPoly::from_polygons(&[
            rect_poly(0.0, 0.0, 6.0, 6.0),
            rect_poly(2.0, 2.0, 4.0, 4.0).reversed(),
        ]);
        let bm = mp.rasterize(0.5, None);
        assert_eq!(bm.solid_count(), 144 - 16);
        assert!(!bm.get(Pt::new(3.0, 3.0)));
        assert!(bm.get(Pt::new(1.0, 3.0)));
    }

    #[test]
    fn rasterize_off_origin_and_negative() {
        let mp = MPoly::from_polygons(&[rect_poly(-3.0, -2.0, -1.0, 1.0)]);
        let bm = mp.rasterize(1.0, None);
        assert_eq!(bm.solid_count(), 6);
        assert!(bm.get(Pt::new(-2.5, -1.5)));
        assert!(MPoly::from_polygons(&[]).rasterize(1.0, None).is_empty());
    }

    #[test]
    fn inflate_grows_the_bbox() {
        let mp = MPoly::from_polygons(&[rect_poly(10.0, 10.0, 20.0, 20.0)]);
        let grown = mp.inflate(2.0);
        assert_eq!(grown.len(), 1);
        let bb = grown.bbox();
        assert!((bb.x.lo - 8.0).abs() < 0.01);
        assert!((bb.y.hi - 22.0).abs() < 0.01);
        assert!(grown.to_polygons()[0].signed_area() > 100.0);
    }

    #[test]
    fn eroding_past_the_radius_removes_the_ring() {
        let mp = MPoly::from_polygons(&[circle(32, 20.0, 20.0, 10.0)]);
        assert!(!mp.inflate(-6.0).is_empty());
        assert!(mp.inflate(-12.0).is_empty());
    }
}
