use super::core::{Im, MaskIm};
use super::roi::Roi;

/// Flood-fill the 4-connected set component containing (start_x, start_y) of
/// `src_im` into `dst_im`.
///
/// Work-stack + visited bitset, no recursion. Returns the number of pixels
/// filled and their bounding ROI (in local pixel coords). A start pixel that is
/// not set fills nothing.
pub fn flood_mask<TarT: Copy>(
    src_im: &MaskIm,
    dst_im: &mut Im<TarT, 1>,
    start_x: usize,
    start_y: usize,
    fill_val: TarT,
) -> (usize, Roi) {
    assert_eq!(src_im.w, dst_im.w, "src/dst width mismatch");
    assert_eq!(src_im.h, dst_im.h, "src/dst height mismatch");

    let w = src_im.w;
    let h = src_im.h;
    let empty_roi = Roi::default();
    if start_x >= w || start_y >= h {
        return (0, empty_roi);
    }
    if src_im.arr[start_y * src_im.s + start_x] == 0 {
        return (0, empty_roi);
    }

    let mut visited: Vec<u64> = vec![0; (w * h).div_ceil(64)];
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(w * h / 10 + 1024);
    stack.push((start_x, start_y));

    let mut filled = 0usize;
    let mut roi = Roi::new(
        start_x as i64,
        start_y as i64,
        start_x as i64 + 1,
        start_y as i64 + 1,
    );
    while let Some((x, y)) = stack.pop() {
        let v_i = y * w + x;
        let (word, bit) = (v_i / 64, 1u64 << (v_i % 64));
        if visited[word] & bit != 0 {
            continue;
        }
        visited[word] |= bit;

        // Non-set neighbours are never pushed, but the seed check above is the
        // only guarantee for the first pixel.
        let px = unsafe { *src_im.get_unchecked(x, y, 0) };
        if px == 0 {
            continue;
        }

        unsafe {
            *dst_im.get_unchecked_mut(x, y, 0) = fill_val;
        }
        filled += 1;
        roi = roi.union(&Roi::new(x as i64, y as i64, x as i64 + 1, y as i64 + 1));

        let mut push = |nx: usize, ny: usize| {
            let n_i = ny * w + nx;
            if visited[n_i / 64] & (1u64 << (n_i % 64)) == 0 && src_im.arr[ny * src_im.s + nx] != 0
            {
                stack.push((nx, ny));
            }
        };
        if y + 1 < h {
            push(x, y + 1);
        }
        if x + 1 < w {
            push(x + 1, y);
        }
        if y > 0 {
            push(x, y - 1);
        }
        if x > 0 {
            push(x - 1, y);
        }
    }

    (filled, roi)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub size: usize,
    pub start_x: usize,
    pub start_y: usize,
    pub roi: Roi,
}

/// Label a mask's 4-connected set components.
///
/// Scan order is row-major from row 0, so label ids follow the first pixel of
/// each component. The returned info is indexed by label id and [0] is
/// reserved for the background.
pub fn label_mask(src_im: &MaskIm) -> (Im<u32, 1>, Vec<LabelInfo>) {
    let w = src_im.w;
    let h = src_im.h;

    let mut dst_im: Im<u32, 1> = Im::<u32, 1>::new(w, h);
    let mut group_info: Vec<LabelInfo> = vec![LabelInfo::default()];

    let mut group_i: u32 = 1;
    for y in 0..h {
        for x in 0..w {
            if src_im.arr[y * src_im.s + x] == 0 {
                continue;
            }
            if dst_im.arr[y * dst_im.s + x] != 0 {
                // Already labeled
                continue;
            }

            let (filled, roi) = flood_mask(src_im, &mut dst_im, x, y, group_i);

            debug_assert_eq!(group_info.len(), group_i as usize);
            group_info.push(LabelInfo {
                size: filled,
                start_x: x,
                start_y: y,
                roi,
            });

            group_i += 1;
        }
    }

    (dst_im, group_info)
}

// Tests
// -----------------------------------------------------------------------------
