use crate::geom::{Pt, Rect};
use crate::im::{MaskIm, Roi};
use crate::slice_bitmap::{Grid, Material, SliceBitmap};

/// Parse an ASCII picture into a mask. `#` is solid, anything else is air.
/// The first text row is the TOP of the slice (highest y).
pub fn mask_from_ascii(grid: &str) -> MaskIm {
    let rows: Vec<&str> = grid
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let h = rows.len();
    assert!(h > 0, "grid must have at least one non-empty row");
    let w = rows[0].len();
    assert!(w > 0, "grid rows must be non-empty");
    for r in &rows {
        assert_eq!(r.len(), w, "all rows must have equal length");
    }

    let mut mask = MaskIm::new(w, h);
    for (row_i, row) in rows.iter().enumerate() {
        let y = h - 1 - row_i;
        for (x, ch) in row.chars().enumerate() {
            if ch == '#' {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

/// A bitmap at the origin with 1 mm pixels.
pub fn bitmap_from_ascii(grid: &str) -> SliceBitmap {
    bitmap_from_ascii_at(grid, 0, 0, 1.0, None)
}

/// A bitmap whose lower-left mask pixel is lattice pixel (l, b).
pub fn bitmap_from_ascii_at(
    grid: &str,
    l: i64,
    b: i64,
    pixel: f64,
    material: Option<Material>,
) -> SliceBitmap {
    let mask = mask_from_ascii(grid);
    let roi = Roi::new(l, b, l + mask.w as i64, b + mask.h as i64);
    SliceBitmap::from_grid(Grid { pixel, roi, mask }, material)
}

/// A solid axis-aligned square with its lower-left corner at (x, y).
pub fn square_bitmap(x: f64, y: f64, size: f64, pixel: f64, material: Option<Material>) -> SliceBitmap {
    let rect = Rect::new(Pt::new(x, y), Pt::new(x + size, y + size));
    SliceBitmap::from_fn(&rect, pixel, material, |p| rect.contains(p))
}

/// Inverse of `mask_from_ascii`, handy in assertion messages.
pub fn mask_to_ascii(mask: &MaskIm) -> String {
    let mut out = String::new();
    for y in (0..mask.h).rev() {
        for x in 0..mask.w {
            out.push(if mask.is_on(x as i64, y as i64) { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}

pub fn bitmap_to_ascii(bitmap: &SliceBitmap) -> String {
    bitmap.grid().map_or_else(String::new, |g| mask_to_ascii(&g.mask))
}
