use crate::geom::Pt;
use crate::poly::Polygon;
use crate::slice_bitmap::SliceBitmap;
use tracing::warn;

/// Unit steps between pixel corners, indexed by direction: +x, +y, -x, -y.
const DIRS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// One closed solid/air boundary.
///
/// Outer boundaries wind counter-clockwise (positive area), holes clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub poly: Polygon,
    pub is_hole: bool,
    /// For a hole, index of the smallest outer contour enclosing it.
    pub parent: Option<usize>,
}

/// Boundary polygons of every solid region and hole in `bitmap`.
///
/// Edges run along pixel corners with solid always on the left. Solid pixels
/// touching only at a corner are separate regions. Contours come out in
/// order of their lowest-then-leftmost vertex, so an outer boundary always
/// precedes its holes.
pub fn trace(bitmap: &SliceBitmap) -> Vec<Contour> {
    let Some(grid) = bitmap.grid() else {
        return Vec::new();
    };
    let mask = &grid.mask;
    let (w, h) = (mask.w, mask.h);

    // Vertex (x, y) is the lower-left corner of local pixel (x, y).
    let vw = w + 1;
    let vi = |x: usize, y: usize| y * vw + x;
    let mut out_edges = vec![0u8; vw * (h + 1)];
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as i64, y as i64);
            if !mask.is_on(xi, yi) {
                continue;
            }
            if !mask.is_on(xi, yi - 1) {
                out_edges[vi(x, y)] |= 1 << 0;
            }
            if !mask.is_on(xi + 1, yi) {
                out_edges[vi(x + 1, y)] |= 1 << 1;
            }
            if !mask.is_on(xi, yi + 1) {
                out_edges[vi(x + 1, y + 1)] |= 1 << 2;
            }
            if !mask.is_on(xi - 1, yi) {
                out_edges[vi(x, y + 1)] |= 1 << 3;
            }
        }
    }

    let mut contours: Vec<Contour> = Vec::new();
    for start in 0..out_edges.len() {
        // A saddle vertex starts two loops.
        while out_edges[start] != 0 {
            let d0 = out_edges[start].trailing_zeros() as usize;
            let corners = walk(&mut out_edges, vw, start, d0);
            let points: Vec<Pt> = corners
                .into_iter()
                .map(|(x, y)| grid.corner_of(grid.roi.l + x, grid.roi.b + y))
                .collect();
            let poly = Polygon::closed(points);
            let is_hole = poly.signed_area() < 0.0;
            contours.push(Contour { poly, is_hole, parent: None });
        }
    }

    assign_parents(&mut contours);
    contours
}

/// Follow one loop from vertex `start` leaving along `d0`, consuming edges.
/// At a saddle the left turn wins, then straight, then right.
fn walk(out_edges: &mut [u8], vw: usize, start: usize, d0: usize) -> Vec<(i64, i64)> {
    let mut corners = Vec::new();
    let (mut x, mut y) = ((start % vw) as i64, (start / vw) as i64);
    let mut prev_d: Option<usize> = None;

    loop {
        let v = y as usize * vw + x as usize;
        let dir = match prev_d {
            None => d0,
            Some(pd) => {
                let found = [(pd + 1) % 4, pd, (pd + 3) % 4]
                    .into_iter()
                    .find(|&c| out_edges[v] & (1 << c) != 0);
                match found {
                    Some(c) => c,
                    None => {
                        warn!(x = x, y = y, "contour walk hit a dead end; loop left open");
                        break;
                    }
                }
            }
        };
        if prev_d != Some(dir) {
            corners.push((x, y));
        }
        out_edges[v] &= !(1u8 << dir);
        x += DIRS[dir].0;
        y += DIRS[dir].1;
        prev_d = Some(dir);

        if y as usize * vw + x as usize == start {
            break;
        }
    }

    // The start vertex is only a corner if the loop arrives at it turning.
    if prev_d == Some(d0) && !corners.is_empty() {
        corners.remove(0);
    }
    corners
}

fn assign_parents(contours: &mut [Contour]) {
    for k in 0..contours.len() {
        if !contours[k].is_hole {
            continue;
        }
        let Some(probe) = contours[k].poly.first() else {
            continue;
        };
        // Probe half a step inside the hole's first edge to avoid touching
        // shared corners.
        let probe = match contours[k].poly.points.get(1) {
            Some(&next) => probe + (next - probe) * 0.5 + (next - probe).norm().left() * -1e-6,
            None => probe,
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in contours.iter().enumerate() {
            if c.is_hole || !c.poly.contains(probe) {
                continue;
            }
            let area = c.poly.signed_area();
            if best.is_none_or(|(_, a)| area < a) {
                best = Some((i, area));
            }
        }
        contours[k].parent = best.map(|(i, _)| i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::slice_bitmap::Material;
    use crate::test_helpers::{bitmap_from_ascii, bitmap_from_ascii_at, square_bitmap};

    #[test]
    fn filled_square_gives_one_ccw_polygon() {
        let bm = square_bitmap(0.0, 0.0, 6.0, 1.0, None);
        let contours = trace(&bm);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(!c.is_hole);
        assert_eq!(c.poly.len(), 4);
        assert_eq!(c.poly.signed_area(), 36.0);
        assert_eq!(c.poly.bbox(), Rect::new(Pt::new(0.0, 0.0), Pt::new(6.0, 6.0)));
    }

    #[test]
    fn square_with_hole_gives_two_polygons_of_opposite_winding() {
        let outer = square_bitmap(0.0, 0.0, 8.0, 1.0, None);
        let hole = square_bitmap(2.0, 2.0, 4.0, 1.0, None);
        let contours = trace(&outer.difference(&hole));
        assert_eq!(contours.len(), 2);

        assert!(!contours[0].is_hole);
        assert!(contours[0].poly.signed_area() > 0.0);
        assert_eq!(contours[0].poly.signed_area(), 64.0);

        assert!(contours[1].is_hole);
        assert_eq!(contours[1].poly.signed_area(), -16.0);
        assert_eq!(contours[1].parent, Some(0));
        assert_eq!(
            contours[1].poly.bbox(),
            Rect::new(Pt::new(2.0, 2.0), Pt::new(6.0, 6.0))
        );
    }

    #[test]
    fn three_disjoint_rects_give_three_polygons() {
        let bm = bitmap_from_ascii(
            r#"
                ###.......
                ###...####
                ......####
                ##........
                ##........
            "#,
        );
        let contours = trace(&bm);
        assert_eq!(contours.len(), 3);
        assert!(contours.iter().all(|c| !c.is_hole && c.poly.len() == 4));
        let total: f64 = contours.iter().map(|c| c.poly.signed_area()).sum();
        assert_eq!(total, 4.0 + 8.0 + 6.0);
    }

    #[test]
    fn diagonal_pixels_are_separate_regions() {
        let bm = bitmap_from_ascii(
            r#"
                .#
                #.
            "#,
        );
        let contours = trace(&bm);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| c.poly.signed_area() == 1.0));
    }

    #[test]
    fn l_shape_has_six_corners() {
        let bm = bitmap_from_ascii(
            r#"
                #..
                #..
                ###
            "#,
        );
        let contours = trace(&bm);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].poly.len(), 6);
        assert_eq!(contours[0].poly.signed_area(), 5.0);
    }

    #[test]
    fn coordinates_follow_lattice_position_and_pixel_size() {
        let bm = bitmap_from_ascii_at("##\n##", 10, 4, 0.5, Some(Material::new("pla")));
        let contours = trace(&bm);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].poly.bbox(),
            Rect::new(Pt::new(5.0, 2.0), Pt::new(6.0, 3.0))
        );
    }

    #[test]
    fn empty_bitmap_has_no_contours() {
        assert!(trace(&SliceBitmap::Empty).is_empty());
    }
}
