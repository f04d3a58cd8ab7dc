//! Infill hatching.
//!
//! Hatch lines parallel to a sweep direction are sampled across a bitmap
//! pixel by pixel. The solid runs they cross are then stitched into long
//! "snakes" by walking along the solid/air boundary from the end of one run
//! to a run on the next line, so the extruder rarely has to travel.
//!
//! All walking happens in local pixel coordinates of the bitmap's grid;
//! only the finished snakes are converted back to millimetres.

use crate::geom::{HalfPlane, Pt, Rect};
use crate::im::MaskIm;
use crate::poly::Polygon;
use crate::slice_bitmap::{Grid, SliceBitmap};
use tracing::{debug, warn};

/// Growth of the grid rectangle that hatch lines must cover.
pub const COVER_SCALE: f64 = 1.1;
/// Snakes only merge when their ends are this many gaps apart (or closer)
/// along the sweep normal.
pub const MERGE_GAP_FACTOR: f64 = 1.5;
/// Squared pixel distance at which a point walk has arrived.
pub const ARRIVE_R2: i64 = 3;
/// Squared pixel distance for matching a line walk to a run endpoint.
pub const LINK_R2: i64 = 8;
/// Simplification tolerance in pixels.
pub const SIMPLIFY_PIXELS: f64 = 1.5;

const NEIGHBORS8: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

type Px = (i64, i64);

/// A snake pixel, flagged when it is one end of a hatch run. Flagged pixels
/// survive simplification.
type Node = (Px, bool);

#[inline]
fn d2(a: Px, b: Px) -> i64 {
    (a.0 - b.0).pow(2) + (a.1 - b.1).pow(2)
}

#[inline]
fn center(p: Px) -> Pt {
    Pt::new(p.0 as f64 + 0.5, p.1 as f64 + 0.5)
}

/// A solid run on one hatch line, from entry pixel `a` to exit pixel `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    a: Px,
    b: Px,
    used: bool,
}

#[derive(Debug, Clone)]
struct HatchLine {
    /// Offset of the line along the sweep normal, in pixels.
    g: f64,
    runs: Vec<Run>,
}

/// Clip segment `a`-`b` to `r` (Liang-Barsky).
fn clip_segment(a: Pt, b: Pt, r: &Rect) -> Option<(Pt, Pt)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-d.x, a.x - r.x.lo),
        (d.x, r.x.hi - a.x),
        (-d.y, a.y - r.y.lo),
        (d.y, r.y.hi - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    (t0 <= t1).then(|| (a + d * t0, a + d * t1))
}

/// Sample the line `a`-`b` pixel by pixel and return its solid runs.
/// Everything outside the mask counts as air.
fn line_runs(mask: &MaskIm, a: Pt, b: Pt) -> Vec<Run> {
    let bounds = Rect::new(
        Pt::new(-1.0, -1.0),
        Pt::new(mask.w as f64 + 1.0, mask.h as f64 + 1.0),
    );
    let Some((a, b)) = clip_segment(a, b, &bounds) else {
        return Vec::new();
    };
    let d = b - a;
    let n = d.x.abs().max(d.y.abs()).ceil().max(1.0) as usize;

    let mut runs = Vec::new();
    let mut entry: Option<Px> = None;
    let mut prev: Px = (a.x.floor() as i64, a.y.floor() as i64);
    let mut transitions = 0usize;
    for s in 0..=n {
        let p = a + d * (s as f64 / n as f64);
        let px = (p.x.floor() as i64, p.y.floor() as i64);
        let solid = mask.is_on(px.0, px.1);
        match (entry, solid) {
            (None, true) => {
                entry = Some(px);
                transitions += 1;
            }
            (Some(e), false) => {
                runs.push(Run { a: e, b: prev, used: false });
                entry = None;
                transitions += 1;
            }
            _ => {}
        }
        prev = px;
    }
    if let Some(e) = entry {
        warn!(transitions, "odd number of hatch crossings; closing run at line end");
        runs.push(Run { a: e, b: prev, used: false });
    }
    runs
}

/// Lines parallel to `dir` every `gap_px` pixels across the grown grid
/// rectangle. `phase` is the sweep value of the mask origin in pixels; lines
/// sit where the sweep value is an odd multiple of half a gap, so every
/// bitmap on the same lattice shares them.
fn hatch_lines(mask: &MaskIm, dir: Pt, normal: Pt, gap_px: f64, phase: f64) -> Vec<HatchLine> {
    let cover = Rect::new(Pt::new(0.0, 0.0), Pt::new(mask.w as f64, mask.h as f64)).scaled(COVER_SCALE);
    let corners = cover.corners();
    let (mut g_min, mut g_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut t_min, mut t_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for c in corners {
        g_min = g_min.min(c.dot(normal));
        g_max = g_max.max(c.dot(normal));
        t_min = t_min.min(c.dot(dir));
        t_max = t_max.max(c.dot(dir));
    }

    let k_min = ((g_min + phase) / gap_px - 0.5).ceil() as i64;
    let k_max = ((g_max + phase) / gap_px - 0.5).floor() as i64;
    (k_min..=k_max)
        .map(|k| {
            let g = (k as f64 + 0.5) * gap_px - phase;
            let a = normal * g + dir * t_min;
            let b = normal * g + dir * t_max;
            HatchLine { g, runs: line_runs(mask, a, b) }
        })
        .collect()
}

/// Boundary walking over a mask with a shared visited set.
struct Walker<'a> {
    mask: &'a MaskIm,
    visited: Vec<bool>,
}

impl<'a> Walker<'a> {
    fn new(mask: &'a MaskIm) -> Self {
        Self { mask, visited: vec![false; mask.w * mask.h] }
    }

    fn index(&self, p: Px) -> Option<usize> {
        let in_bounds = p.0 >= 0 && p.1 >= 0 && (p.0 as usize) < self.mask.w && (p.1 as usize) < self.mask.h;
        in_bounds.then(|| p.1 as usize * self.mask.w + p.0 as usize)
    }

    /// Solid with at least one air pixel among its 8 neighbours.
    fn is_boundary(&self, p: Px) -> bool {
        self.mask.is_on(p.0, p.1) && self.mask.on_neighbors8(p.0, p.1) < 8
    }

    fn is_visited(&self, p: Px) -> bool {
        self.index(p).is_some_and(|i| self.visited[i])
    }

    fn visit(&mut self, p: Px) {
        if let Some(i) = self.index(p) {
            self.visited[i] = true;
        }
    }

    fn unwind(&mut self, trail: &[Px]) {
        for &p in trail {
            if let Some(i) = self.index(p) {
                self.visited[i] = false;
            }
        }
    }

    /// Best unvisited boundary neighbour of `from`: the step closest to
    /// `heading`, then the one with the fewest solid neighbours.
    fn step<F: Fn(Px) -> bool>(&self, from: Px, heading: Pt, accept: F) -> Option<Px> {
        let mut best: Option<(Px, f64, usize)> = None;
        for (dx, dy) in NEIGHBORS8 {
            let p = (from.0 + dx, from.1 + dy);
            if !self.is_boundary(p) || self.is_visited(p) || !accept(p) {
                continue;
            }
            let score = Pt::new(dx as f64, dy as f64).norm().dot(heading);
            let n = self.mask.on_neighbors8(p.0, p.1);
            let better = match best {
                None => true,
                Some((_, s, bn)) => score > s + 1e-9 || ((score - s).abs() <= 1e-9 && n < bn),
            };
            if better {
                best = Some((p, score, n));
            }
        }
        best.map(|(p, _, _)| p)
    }

    /// Walk from a run end on the line at `g_from` until a pixel reaches the
    /// line at `g_to`. The trail is visited on success and released on
    /// failure.
    fn walk_to_line(&mut self, from: Px, normal: Pt, g_from: f64, g_to: f64) -> Option<Vec<Px>> {
        let arrived = |p: Px| center(p).dot(normal) >= g_to - 0.5;
        let mut trail = Vec::new();
        let mut cur = from;
        while !arrived(cur) {
            let next = self.step(cur, normal, |p| {
                let pr = center(p).dot(normal);
                pr > g_from - 1.0 && pr <= g_to + 1.0
            });
            let Some(next) = next else {
                self.unwind(&trail);
                return None;
            };
            self.visit(next);
            trail.push(next);
            cur = next;
        }
        Some(trail)
    }

    /// Walk from `from` toward `to` until within `ARRIVE_R2`.
    fn walk_to_point(&mut self, from: Px, to: Px) -> Option<Vec<Px>> {
        if d2(from, to) <= ARRIVE_R2 {
            return Some(Vec::new());
        }
        let max_steps = (4.0 * (d2(from, to) as f64).sqrt()) as usize + 8;
        let mut trail = Vec::new();
        let mut cur = from;
        for _ in 0..max_steps {
            let heading = (center(to) - center(cur)).norm();
            let Some(next) = self.step(cur, heading, |_| true) else {
                break;
            };
            self.visit(next);
            trail.push(next);
            cur = next;
            if d2(cur, to) <= ARRIVE_R2 {
                return Some(trail);
            }
        }
        self.unwind(&trail);
        None
    }
}

fn first_unused(lines: &[HatchLine]) -> Option<(usize, usize)> {
    lines.iter().enumerate().find_map(|(li, line)| {
        line.runs.iter().position(|r| !r.used).map(|ri| (li, ri))
    })
}

fn nearest_endpoint(runs: &[Run], p: Px) -> Option<usize> {
    runs.iter()
        .enumerate()
        .filter(|(_, r)| !r.used)
        .map(|(i, r)| (i, d2(r.a, p).min(d2(r.b, p))))
        .filter(|&(_, d)| d <= LINK_R2)
        .min_by_key(|&(_, d)| d)
        .map(|(i, _)| i)
}

/// Join runs on consecutive lines into snakes.
fn stitch(lines: &mut [HatchLine], walker: &mut Walker, normal: Pt) -> Vec<Vec<Node>> {
    let mut snakes = Vec::new();
    while let Some((mut li, ri)) = first_unused(lines) {
        let run = &mut lines[li].runs[ri];
        run.used = true;
        let (a, b) = (run.a, run.b);
        walker.visit(a);
        walker.visit(b);

        let mut snake = vec![(a, true), (b, true)];
        let mut end = b;
        while li + 1 < lines.len() {
            if lines[li + 1].runs.iter().all(|r| r.used) {
                break;
            }
            let Some(trail) = walker.walk_to_line(end, normal, lines[li].g, lines[li + 1].g) else {
                debug!(line = li, "no boundary path to the next hatch line");
                break;
            };
            let arrived = trail.last().copied().unwrap_or(end);
            let Some(k) = nearest_endpoint(&lines[li + 1].runs, arrived) else {
                debug!(line = li, "boundary walk reached no run on the next hatch line");
                walker.unwind(&trail);
                break;
            };

            let run = &mut lines[li + 1].runs[k];
            run.used = true;
            let (near, far) = if d2(run.a, arrived) <= d2(run.b, arrived) {
                (run.a, run.b)
            } else {
                (run.b, run.a)
            };
            walker.visit(near);
            walker.visit(far);
            snake.extend(trail.into_iter().map(|p| (p, false)));
            snake.push((near, true));
            snake.push((far, true));
            end = far;
            li += 1;
        }
        snakes.push(snake);
    }
    snakes
}

fn try_merge(si: &[Node], sj: &[Node], walker: &mut Walker, normal: Pt, gap_px: f64) -> Option<Vec<Node>> {
    let (first_i, last_i) = (si.first()?.0, si.last()?.0);
    let (first_j, last_j) = (sj.first()?.0, sj.last()?.0);
    for rev_i in [false, true] {
        let from = if rev_i { first_i } else { last_i };
        for rev_j in [false, true] {
            let to = if rev_j { last_j } else { first_j };
            let disp = center(to) - center(from);
            if disp.dot(normal).abs() > MERGE_GAP_FACTOR * gap_px {
                continue;
            }
            let Some(trail) = walker.walk_to_point(from, to) else {
                continue;
            };
            let mut out: Vec<Node> = Vec::with_capacity(si.len() + trail.len() + sj.len());
            if rev_i {
                out.extend(si.iter().rev());
            } else {
                out.extend_from_slice(si);
            }
            out.extend(trail.into_iter().map(|p| (p, false)));
            if rev_j {
                out.extend(sj.iter().rev());
            } else {
                out.extend_from_slice(sj);
            }
            return Some(out);
        }
    }
    None
}

/// Merge snakes whose ends can be joined along the boundary, restarting the
/// scan at the merged snake until no pair joins.
fn optimize_snakes(snakes: &mut Vec<Vec<Node>>, walker: &mut Walker, normal: Pt, gap_px: f64) {
    let mut i = 0;
    'outer: while i < snakes.len() {
        for j in (i + 1)..snakes.len() {
            if let Some(merged) = try_merge(&snakes[i], &snakes[j], walker, normal, gap_px) {
                snakes[i] = merged;
                snakes.remove(j);
                continue 'outer;
            }
        }
        i += 1;
    }
}

/// Whether the segment `a`-`b` (local pixel units) stays on solid pixels.
/// Samples landing exactly on a pixel corner are ignored, since a diagonal
/// step between two solid pixels passes through one.
fn segment_on_solid(mask: &MaskIm, a: Pt, b: Pt) -> bool {
    let d = b - a;
    let n = (d.len() * 4.0).ceil().max(1.0) as usize;
    (0..=n).all(|s| {
        let p = a + d * (s as f64 / n as f64);
        (p.x.fract() == 0.0 && p.y.fract() == 0.0) || mask.is_on(p.x.floor() as i64, p.y.floor() as i64)
    })
}

/// Convert a snake to millimetres. Run ends are kept as they are; each
/// boundary trail between two of them is simplified on its own, and kept
/// raw if the shortcut would cross air.
fn snake_to_polygon(grid: &Grid, snake: &[Node]) -> Polygon {
    let pts: Vec<Pt> = snake.iter().map(|&(p, _)| center(p)).collect();
    let mut cuts: Vec<usize> = std::iter::once(0)
        .chain(snake.iter().enumerate().filter(|(_, n)| n.1).map(|(i, _)| i))
        .chain(std::iter::once(pts.len().saturating_sub(1)))
        .collect();
    cuts.dedup();

    let mut local: Vec<Pt> = Vec::with_capacity(pts.len());
    for w in cuts.windows(2) {
        let raw = &pts[w[0]..=w[1]];
        let simple = Polygon::open(raw.to_vec()).simplify(SIMPLIFY_PIXELS);
        if simple.points.windows(2).all(|s| segment_on_solid(&grid.mask, s[0], s[1])) {
            local.extend(simple.points);
        } else {
            local.extend_from_slice(raw);
        }
    }
    local.dedup();

    let (l, b) = (grid.roi.l as f64, grid.roi.b as f64);
    Polygon::open(
        local
            .into_iter()
            .map(|p| Pt::new((l + p.x) * grid.pixel, (b + p.y) * grid.pixel))
            .collect(),
    )
}

/// Hatch `bitmap` with lines parallel to `sweep.dir`, `gap` millimetres
/// apart, and return the stitched paths as open polylines.
///
/// Line positions are fixed by `sweep.org`: a line runs wherever the sweep
/// value is an odd multiple of `gap / 2`, whatever the bitmap's extent.
///
/// Returns nothing for an empty bitmap or a non-positive gap. When
/// `optimize` is set, snakes whose ends can be joined along the boundary are
/// merged.
pub fn hatch(bitmap: &SliceBitmap, sweep: &HalfPlane, gap: f64, optimize: bool) -> Vec<Polygon> {
    let Some(grid) = bitmap.grid() else {
        return Vec::new();
    };
    if gap.is_nan() || gap <= 0.0 {
        return Vec::new();
    }
    let gap_px = gap / grid.pixel;
    let sweep = HalfPlane { org: sweep.org, dir: sweep.dir.norm() };
    let (dir, normal) = (sweep.dir, sweep.normal());
    let phase = sweep.value(grid.corner_of(grid.roi.l, grid.roi.b)) / grid.pixel;

    let mut lines = hatch_lines(&grid.mask, dir, normal, gap_px, phase);
    let n_runs: usize = lines.iter().map(|l| l.runs.len()).sum();

    let mut walker = Walker::new(&grid.mask);
    let mut snakes = stitch(&mut lines, &mut walker, normal);
    let n_stitched = snakes.len();
    if optimize {
        optimize_snakes(&mut snakes, &mut walker, normal, gap_px);
    }
    debug!(lines = lines.len(), runs = n_runs, stitched = n_stitched, snakes = snakes.len(), "hatched");

    snakes
        .iter()
        .map(|s| snake_to_polygon(grid, s))
        .filter(|p| p.len() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{bitmap_from_ascii, bitmap_from_ascii_at, mask_from_ascii, square_bitmap};

    fn horizontal() -> HalfPlane {
        HalfPlane::from_angle(Pt::new(0.0, 0.0), 0.0)
    }

    fn all_points_solid(bm: &SliceBitmap, paths: &[Polygon]) -> bool {
        paths.iter().flat_map(|p| p.points.iter()).all(|&pt| bm.get(pt))
    }

    const U_SHAPE: &str = r#"
        ###...###
        ###...###
        ###...###
        #########
        #########
        #########
    "#;

    #[test]
    fn empty_bitmap_or_bad_gap_gives_nothing() {
        let bm = square_bitmap(0.0, 0.0, 10.0, 1.0, None);
        assert!(hatch(&SliceBitmap::Empty, &horizontal(), 1.0, true).is_empty());
        assert!(hatch(&bm, &horizontal(), 0.0, true).is_empty());
        assert!(hatch(&bm, &horizontal(), -2.0, false).is_empty());
        assert!(hatch(&bm, &horizontal(), f64::NAN, false).is_empty());
    }

    #[test]
    fn line_runs_are_entry_exit_pairs() {
        let bm = bitmap_from_ascii("##..###.");
        let grid = bm.grid().unwrap();
        let runs = line_runs(&grid.mask, Pt::new(-3.0, 0.5), Pt::new(12.0, 0.5));
        assert_eq!(
            runs.iter().map(|r| (r.a, r.b)).collect::<Vec<_>>(),
            vec![((0, 0), (1, 0)), ((4, 0), (6, 0))]
        );
        assert!(line_runs(&grid.mask, Pt::new(-3.0, 5.0), Pt::new(12.0, 5.0)).is_empty());
    }

    #[test]
    fn clip_segment_keeps_the_inside_part() {
        let r = Rect::new(Pt::new(0.0, 0.0), Pt::new(10.0, 10.0));
        let (a, b) = clip_segment(Pt::new(-5.0, 5.0), Pt::new(15.0, 5.0), &r).unwrap();
        assert_eq!((a, b), (Pt::new(0.0, 5.0), Pt::new(10.0, 5.0)));
        assert!(clip_segment(Pt::new(-5.0, 20.0), Pt::new(15.0, 20.0), &r).is_none());
    }

    #[test]
    fn square_hatches_into_one_snake() {
        let bm = square_bitmap(0.0, 0.0, 20.0, 1.0, None);
        let paths = hatch(&bm, &horizontal(), 2.0, false);
        assert_eq!(paths.len(), 1);
        let snake = &paths[0];
        assert!(!snake.closed);
        assert_eq!(snake.first(), Some(Pt::new(0.5, 1.5)));
        // Ten hatch lines, each contributing both of its ends.
        assert_eq!(snake.len(), 20);
        assert_eq!(snake.bbox(), Rect::new(Pt::new(0.5, 1.5), Pt::new(19.5, 19.5)));
        assert!(all_points_solid(&bm, &paths));
    }

    #[test]
    fn disjoint_islands_never_merge() {
        let left = square_bitmap(0.0, 0.0, 6.0, 1.0, None);
        let right = square_bitmap(10.0, 0.0, 6.0, 1.0, None);
        let bm = left.union(&right);
        assert_eq!(hatch(&bm, &horizontal(), 2.0, false).len(), 2);
        let optimized = hatch(&bm, &horizontal(), 2.0, true);
        assert_eq!(optimized.len(), 2);
        assert!(all_points_solid(&bm, &optimized));
    }

    #[test]
    fn optimize_joins_the_prongs_of_a_u() {
        let bm = bitmap_from_ascii(U_SHAPE);
        let plain = hatch(&bm, &horizontal(), 2.0, false);
        assert_eq!(plain.len(), 2);
        let optimized = hatch(&bm, &horizontal(), 2.0, true);
        assert_eq!(optimized.len(), 1);
        assert!(all_points_solid(&bm, &optimized));
    }

    // Segments of `path` in the grid's local pixel units.
    fn local_segments(grid: &Grid, path: &Polygon) -> Vec<(Pt, Pt)> {
        let origin = grid.corner_of(grid.roi.l, grid.roi.b);
        let local: Vec<Pt> = path.points.iter().map(|&p| (p - origin) * (1.0 / grid.pixel)).collect();
        local.windows(2).map(|w| (w[0], w[1])).collect()
    }

    #[test]
    fn every_hatch_run_survives_as_a_sweep_parallel_segment() {
        let bm = square_bitmap(0.0, 0.0, 20.0, 1.0, None);
        let paths = hatch(&bm, &horizontal(), 2.0, false);
        let full_rows: Vec<f64> = paths[0]
            .points
            .windows(2)
            .filter(|w| w[0].y == w[1].y && (w[0].x - w[1].x).abs() == 19.0)
            .map(|w| w[0].y)
            .collect();
        assert_eq!(full_rows, (0..10).map(|k| 1.5 + 2.0 * k as f64).collect::<Vec<_>>());

        // Finer lines as the producer uses them.
        let bm = square_bitmap(10.3, 10.3, 5.0, 0.1, None);
        let paths = hatch(&bm, &horizontal(), 0.8, true);
        let horizontal_segments = paths
            .iter()
            .flat_map(|p| p.points.windows(2).map(|w| (w[0], w[1])).collect::<Vec<_>>())
            .filter(|(a, b)| (a.y - b.y).abs() < 1e-9 && (a.x - b.x).abs() > 4.0)
            .count();
        assert_eq!(horizontal_segments, 7);
    }

    #[test]
    fn no_segment_of_a_u_crosses_the_notch() {
        let bm = bitmap_from_ascii(U_SHAPE);
        let grid = bm.grid().unwrap();
        for optimize in [false, true] {
            for path in hatch(&bm, &horizontal(), 2.0, optimize) {
                for (a, b) in local_segments(grid, &path) {
                    assert!(segment_on_solid(&grid.mask, a, b), "{a:?} -> {b:?} crosses air");
                }
            }
        }
    }

    #[test]
    fn separate_islands_share_hatch_lines() {
        let block = "######\n######\n######\n######\n######\n######";
        let low = bitmap_from_ascii_at(block, 0, 0, 1.0, None);
        let high = bitmap_from_ascii_at(block, 20, 3, 1.0, None);
        for bm in [&low, &high] {
            let paths = hatch(bm, &horizontal(), 2.0, false);
            assert!(!paths.is_empty());
            for p in &paths {
                for w in p.points.windows(2).filter(|w| w[0].y == w[1].y) {
                    assert_eq!((w[0].y - 1.5).rem_euclid(2.0), 0.0, "line at y = {}", w[0].y);
                }
            }
        }

        // Moving the sweep origin moves the lines with it.
        let shifted = HalfPlane::from_angle(Pt::new(0.0, 1.0), 0.0);
        let paths = hatch(&low, &shifted, 2.0, false);
        assert_eq!(paths[0].first(), Some(Pt::new(0.5, 0.5)));
    }

    // Pixel (2, 0) has air straight above it and two diagonal candidates
    // that tie on heading; the left one touches fewer solid pixels.
    const FORK: &str = r#"
        ....##
        .#.###
        ######
    "#;

    #[test]
    fn step_prefers_heading_then_fewest_neighbours() {
        let mask = mask_from_ascii(FORK);
        let walker = Walker::new(&mask);
        assert_eq!(walker.step((2, 0), Pt::new(0.0, 1.0), |_| true), Some((1, 1)));
        // Heading wins over the neighbour count.
        assert_eq!(walker.step((2, 0), Pt::new(1.0, 0.0), |_| true), Some((3, 0)));
    }

    #[test]
    fn step_tie_break_does_not_depend_on_scan_order() {
        let mirrored: String = FORK
            .lines()
            .map(|l| l.trim().chars().rev().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        let mask = mask_from_ascii(&mirrored);
        let walker = Walker::new(&mask);
        assert_eq!(walker.step((3, 0), Pt::new(0.0, 1.0), |_| true), Some((4, 1)));
    }

    const BAR: &str = r#"
        #....
        .....
        .....
        #####
    "#;

    fn nothing_visited(walker: &Walker, mask: &MaskIm) -> bool {
        (0..mask.h as i64).all(|y| (0..mask.w as i64).all(|x| !walker.is_visited((x, y))))
    }

    #[test]
    fn dead_end_walks_release_their_trail() {
        let mask = mask_from_ascii(BAR);
        let mut walker = Walker::new(&mask);
        let up = Pt::new(0.0, 1.0);

        assert_eq!(walker.walk_to_point((0, 0), (0, 3)), None);
        assert!(nothing_visited(&walker, &mask));
        assert_eq!(walker.walk_to_line((0, 0), up, 0.5, 2.5), None);
        assert!(nothing_visited(&walker, &mask));

        // The released pixels are walkable again.
        assert_eq!(walker.walk_to_point((0, 0), (4, 0)), Some(vec![(1, 0), (2, 0), (3, 0)]));
        assert!(walker.is_visited((2, 0)));
    }

    #[test]
    fn rotated_sweep_stays_inside_the_solid() {
        let bm = square_bitmap(0.0, 0.0, 12.0, 0.5, None);
        for deg in [30.0f64, 45.0, 90.0, 135.0] {
            let sweep = HalfPlane::from_angle(Pt::new(0.0, 0.0), deg.to_radians());
            let paths = hatch(&bm, &sweep, 1.0, true);
            assert!(!paths.is_empty(), "no paths at {deg} degrees");
            assert!(all_points_solid(&bm, &paths), "path left the solid at {deg} degrees");
        }
    }
}
