use super::core::Im;
use image::ImageResult;
use std::path::Path;

fn dim_mismatch_err() -> image::ImageError {
    image::ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}

// PNG I/O
// -----------------------------------------------------------------------------
impl Im<u8, 1> {
    /// Row 0 is the bottom of the slice, so rows are flipped to get a
    /// conventional top-down picture.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let mut raw: Vec<u8> = Vec::with_capacity(self.w * self.h);
        for y in (0..self.h).rev() {
            raw.extend_from_slice(&self.arr[y * self.s..y * self.s + self.w]);
        }
        let img = image::GrayImage::from_raw(self.w as u32, self.h as u32, raw)
            .ok_or_else(dim_mismatch_err)?;

        img.save_with_format(path, image::ImageFormat::Png)
    }

    pub fn load_png<P: AsRef<Path>>(path: P) -> ImageResult<Self> {
        let img = image::open(path)?.into_luma8();
        let w = img.width() as usize;
        let h = img.height() as usize;
        let raw = img.into_raw();
        if raw.len() != w * h {
            return Err(dim_mismatch_err());
        }

        let mut arr = Vec::with_capacity(w * h);
        for y in (0..h).rev() {
            arr.extend_from_slice(&raw[y * w..y * w + w]);
        }
        Ok(Self { w, h, s: w, arr })
    }
}

// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::im::MaskIm;

    #[test]
    fn mask_png_round_trip_keeps_row_order() {
        let mut im = MaskIm::new(3, 2);
        im.set(0, 0, true);
        im.set(2, 1, true);

        let path = std::env::temp_dir().join(format!("rslice_mask_{}.png", std::process::id()));
        im.save_png(&path).unwrap();
        let back = MaskIm::load_png(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back, im);
    }
}
