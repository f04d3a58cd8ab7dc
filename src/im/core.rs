#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Im<T, const N_CH: usize> {
    pub w: usize,
    pub h: usize,
    pub s: usize, // stride in elements (w * N_CH)
    pub arr: Vec<T>,
}

// Constructor
// -----------------------------------------------------------------------------
impl<T: Copy + Default, const N_CH: usize> Im<T, N_CH> {
    pub fn new(w: usize, h: usize) -> Self {
        let s = w * N_CH;
        let arr = vec![T::default(); s * h];
        Self { w, h, s, arr }
    }
}

impl<T, const N_CH: usize> Im<T, N_CH> {
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize, ch: usize) -> &T {
        unsafe { self.arr.get_unchecked(y * self.s + x * N_CH + ch) }
    }

    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, x: usize, y: usize, ch: usize) -> &mut T {
        unsafe { self.arr.get_unchecked_mut(y * self.s + x * N_CH + ch) }
    }

    /// Bounds-checked read with signed coords; `None` outside the image.
    #[inline]
    pub fn get(&self, x: i64, y: i64, ch: usize) -> Option<&T> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h || ch >= N_CH {
            return None;
        }
        self.arr.get(y as usize * self.s + x as usize * N_CH + ch)
    }
}

// Mask helpers
// -----------------------------------------------------------------------------

/// Value written into a `MaskIm` for a set pixel.
pub const MASK_ON: u8 = 255;

impl Im<u8, 1> {
    #[inline]
    pub fn is_on(&self, x: i64, y: i64) -> bool {
        self.get(x, y, 0).is_some_and(|&v| v != 0)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        debug_assert!(x < self.w && y < self.h);
        self.arr[y * self.s + x] = if on { MASK_ON } else { 0 };
    }

    pub fn count_on(&self) -> usize {
        self.arr.iter().filter(|&&v| v != 0).count()
    }

    pub fn any_on(&self) -> bool {
        self.arr.iter().any(|&v| v != 0)
    }

    /// Number of set pixels among the 8 neighbours of (x, y).
    pub fn on_neighbors8(&self, x: i64, y: i64) -> usize {
        let mut n = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx != 0 || dy != 0) && self.is_on(x + dx, y + dy) {
                    n += 1;
                }
            }
        }
        n
    }
}

pub type MaskIm = Im<u8, 1>;
