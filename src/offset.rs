use crate::im::{MASK_ON, MaskIm};
use crate::slice_bitmap::{Grid, SliceBitmap};

const INF: f64 = 1e20;

// -----------------------------------------------------------------------------
// Exact squared EDT (Felzenszwalb & Huttenlocher), one row or column at a time
// -----------------------------------------------------------------------------
fn edt_1d(f_in: &[f64], d_out: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f_in.len();
    debug_assert_eq!(d_out.len(), n);
    debug_assert!(v.len() >= n && z.len() > n);
    if n == 0 {
        return;
    }

    let mut k: usize = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let qf = q as f64;
        let mut s;
        loop {
            let p = v[k];
            let pf = p as f64;
            s = ((f_in[q] + qf * qf) - (f_in[p] + pf * pf)) / (2.0 * (qf - pf));
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, d) in d_out.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dx = q as f64 - v[k] as f64;
        *d = f_in[v[k]] + dx * dx;
    }
}

/// Squared pixel distance from every pixel to the nearest pixel whose
/// on-state equals `target`.
fn sq_distance_to(mask: &MaskIm, target: bool) -> Vec<f64> {
    let (w, h) = (mask.w, mask.h);
    let mut dt: Vec<f64> = (0..w * h)
        .map(|i| {
            let on = mask.arr[(i / w) * mask.s + i % w] != 0;
            if on == target { 0.0 } else { INF }
        })
        .collect();

    let scratch_len = w.max(h);
    let mut scratch_in = vec![0.0; scratch_len];
    let mut scratch_out = vec![0.0; scratch_len];
    let mut v = vec![0usize; scratch_len];
    let mut z = vec![0.0; scratch_len + 1];

    // horizontal pass
    for y in 0..h {
        scratch_in[..w].copy_from_slice(&dt[y * w..y * w + w]);
        edt_1d(&scratch_in[..w], &mut scratch_out[..w], &mut v[..w], &mut z[..w + 1]);
        dt[y * w..y * w + w].copy_from_slice(&scratch_out[..w]);
    }

    // vertical pass
    for x in 0..w {
        for y in 0..h {
            scratch_in[y] = dt[y * w + x];
        }
        edt_1d(&scratch_in[..h], &mut scratch_out[..h], &mut v[..h], &mut z[..h + 1]);
        for y in 0..h {
            dt[y * w + x] = scratch_out[y];
        }
    }
    dt
}

/// Grow (`distance > 0`) or shrink (`distance < 0`) the solid region by a
/// real distance.
///
/// Dilation sets every pixel within `distance` of a solid pixel; erosion
/// clears every pixel within `|distance|` of air, where everything outside
/// the grid counts as air. Results that lose all solid pixels are `Empty`.
pub fn offset(bitmap: &SliceBitmap, distance: f64) -> SliceBitmap {
    let SliceBitmap::Populated { grid, material } = bitmap else {
        return SliceBitmap::Empty;
    };
    if distance == 0.0 {
        return bitmap.clone();
    }

    let r_pix = distance.abs() / grid.pixel;
    let r2 = r_pix * r_pix;
    let grow = distance > 0.0;

    // Dilation needs room to grow into; erosion needs an air border.
    let pad = if grow { r_pix.ceil() as i64 + 1 } else { 1 };
    let roi = grid.roi.padded(pad);
    let mut padded = MaskIm::new(roi.w(), roi.h());
    for y in 0..grid.mask.h {
        let src = y * grid.mask.s;
        let dst = (y + pad as usize) * padded.s + pad as usize;
        padded.arr[dst..dst + grid.mask.w].copy_from_slice(&grid.mask.arr[src..src + grid.mask.w]);
    }

    let dt = sq_distance_to(&padded, grow);
    let mut mask = MaskIm::new(roi.w(), roi.h());
    for (i, &d2) in dt.iter().enumerate() {
        let on = if grow { d2 <= r2 } else { d2 > r2 };
        if on {
            mask.arr[i] = MASK_ON;
        }
    }

    SliceBitmap::from_grid(Grid { pixel: grid.pixel, roi, mask }, material.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Pt;
    use crate::test_helpers::{bitmap_from_ascii, bitmap_to_ascii, square_bitmap};

    #[test]
    fn dilating_a_pixel_gives_a_disk() {
        let bm = bitmap_from_ascii("#");
        let grown = offset(&bm, 2.0);
        assert_eq!(grown.solid_count(), 13);
        assert!(grown.get(Pt::new(2.5, 0.5)));
        assert!(grown.get(Pt::new(1.5, 1.5)));
        assert!(!grown.get(Pt::new(2.5, 1.5)));
        assert!(!grown.get(Pt::new(3.5, 0.5)));
    }

    #[test]
    fn dilation_matches_expected_thresholds() {
        let bm = bitmap_from_ascii("#");
        let grown = offset(&bm, 20.0);
        let at = |x: f64, y: f64| grown.get(Pt::new(x + 0.5, y + 0.5));
        assert!(at(0.0, 0.0));
        assert!(at(20.0, 0.0));
        assert!(!at(21.0, 0.0));
        assert!(at(14.0, 14.0));
        assert!(!at(15.0, 15.0));
        assert!(at(-14.0, -14.0));
    }

    #[test]
    fn eroding_a_square_insets_each_side() {
        let bm = square_bitmap(0.0, 0.0, 10.0, 1.0, None);
        let inset = offset(&bm, -2.0);
        assert_eq!(inset.solid_count(), 36);
        assert!(inset.get(Pt::new(2.5, 2.5)));
        assert!(!inset.get(Pt::new(1.5, 5.0)));
    }

    #[test]
    fn erosion_uses_pixel_size() {
        let bm = square_bitmap(0.0, 0.0, 5.0, 0.5, None);
        let inset = offset(&bm, -1.0);
        assert_eq!(inset.solid_count(), 36);
    }

    #[test]
    fn erosion_past_the_middle_is_empty() {
        let bm = bitmap_from_ascii(
            r#"
                ####
                ####
            "#,
        );
        assert!(offset(&bm, -1.0).is_empty());
        assert!(offset(&SliceBitmap::Empty, 3.0).is_empty());
    }

    #[test]
    fn erosion_removes_a_one_pixel_neck() {
        let bm = bitmap_from_ascii(
            r#"
                #####...#####
                #####...#####
                #############
                #####...#####
                #####...#####
            "#,
        );
        let inset = offset(&bm, -1.0);
        assert_eq!(
            bitmap_to_ascii(&inset),
            concat!(
                "...............\n",
                "...............\n",
                "..###.....###..\n",
                "..####...####..\n",
                "..###.....###..\n",
                "...............\n",
                "...............\n",
            )
        );
    }
}
