use crate::geom::Pt;
use crate::im::label::{flood_mask, label_mask};
use crate::im::{MASK_ON, MaskIm};
use crate::slice_bitmap::{Grid, SliceBitmap};

/// Flood-fill the 4-connected solid region containing `seed` into a new bitmap
/// with the same extent and material. Returns `Empty` when the seed is air or
/// outside the bitmap.
pub fn fill(bitmap: &SliceBitmap, seed: Pt) -> SliceBitmap {
    let SliceBitmap::Populated { grid, material } = bitmap else {
        return SliceBitmap::Empty;
    };
    let (i, j) = grid.lattice_of(seed);
    if !grid.roi.contains(i, j) {
        return SliceBitmap::Empty;
    }
    fill_local(grid, (i - grid.roi.l) as usize, (j - grid.roi.b) as usize)
        .map_or(SliceBitmap::Empty, |g| SliceBitmap::from_grid(g, material.clone()))
}

fn fill_local(grid: &Grid, x: usize, y: usize) -> Option<Grid> {
    let mut dst = MaskIm::new(grid.mask.w, grid.mask.h);
    let (filled, _) = flood_mask(&grid.mask, &mut dst, x, y, MASK_ON);
    (filled > 0).then(|| Grid { pixel: grid.pixel, roi: grid.roi, mask: dst })
}

/// First solid pixel in row-major order (lowest row first), as a lattice
/// coordinate.
pub fn first_solid(bitmap: &SliceBitmap) -> Option<(i64, i64)> {
    let grid = bitmap.grid()?;
    let k = grid.mask.arr.iter().position(|&v| v != 0)?;
    let (x, y) = (k % grid.mask.s, k / grid.mask.s);
    Some((grid.roi.l + x as i64, grid.roi.b + y as i64))
}

/// Pull the island containing the first solid pixel out of `bitmap`.
pub fn find_land(bitmap: &SliceBitmap) -> SliceBitmap {
    let SliceBitmap::Populated { grid, material } = bitmap else {
        return SliceBitmap::Empty;
    };
    let Some((i, j)) = first_solid(bitmap) else {
        return SliceBitmap::Empty;
    };
    fill_local(grid, (i - grid.roi.l) as usize, (j - grid.roi.b) as usize)
        .map_or(SliceBitmap::Empty, |g| SliceBitmap::from_grid(g, material.clone()))
}

/// Every 4-connected island, ordered by its first pixel in row-major order.
/// Each island keeps the extent and material of the source bitmap.
pub fn label_islands(bitmap: &SliceBitmap) -> Vec<SliceBitmap> {
    let SliceBitmap::Populated { grid, material } = bitmap else {
        return Vec::new();
    };
    let (labels, infos) = label_mask(&grid.mask);

    let mut islands: Vec<MaskIm> = (1..infos.len())
        .map(|_| MaskIm::new(grid.mask.w, grid.mask.h))
        .collect();
    for (k, &id) in labels.arr.iter().enumerate() {
        if id != 0 {
            islands[id as usize - 1].arr[k] = MASK_ON;
        }
    }
    islands
        .into_iter()
        .map(|mask| {
            SliceBitmap::from_grid(Grid { pixel: grid.pixel, roi: grid.roi, mask }, material.clone())
        })
        .collect()
}
