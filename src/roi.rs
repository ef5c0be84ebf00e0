use image::{DynamicImage, ImageBuffer, Luma, Primitive};
use std::{ops::Deref, path::Path, time::Instant};

#[derive(Debug, thiserror::Error)]
pub enum RoiError {
    #[error("failed to decode image {1:?}")]
    Decode(#[source] image::ImageError, std::path::PathBuf),
    #[error("region of interest rows have different lengths")]
    Ragged,
}
type Result<T> = std::result::Result<T, RoiError>;

/// Region of interest: image rows of pixel intensities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roi(Vec<Vec<f64>>);
impl Deref for Roi {
    type Target = Vec<Vec<f64>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl TryFrom<Vec<Vec<f64>>> for Roi {
    type Error = RoiError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            if rows.iter().any(|row| row.len() != first.len()) {
                return Err(RoiError::Ragged);
            }
        }
        Ok(Self(rows))
    }
}
impl Roi {
    /// Loads an image and trims it to `[0:height, 0:width]`
    pub fn load<P: AsRef<Path>>(path: P, height: usize, width: usize) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading {:?}...", path);
        let now = Instant::now();
        let image = image::open(path).map_err(|e| RoiError::Decode(e, path.to_path_buf()))?;
        let roi = Self::from_image(&image, height, width);
        log::info!("... loaded in {:}ms", now.elapsed().as_millis());
        Ok(roi)
    }
    /// Trims an image to `[0:height, 0:width]`, color images are converted to luma
    ///
    /// 8 bit images keep their 0-255 intensities, images with deeper channels
    /// are converted to 16 bit luma.
    /// The region is clipped to the image if it extends beyond it.
    pub fn from_image(image: &DynamicImage, height: usize, width: usize) -> Self {
        let color = image.color();
        if color.bytes_per_pixel() > color.channel_count() {
            log::debug!("{:?} image converted to 16 bit luma", color);
            Self::from_luma(&image.to_luma16(), height, width)
        } else {
            Self::from_luma(&image.to_luma8(), height, width)
        }
    }
    fn from_luma<T>(luma: &ImageBuffer<Luma<T>, Vec<T>>, height: usize, width: usize) -> Self
    where
        T: Primitive + Into<f64>,
    {
        let (n_cols, n_rows) = (luma.width() as usize, luma.height() as usize);
        if height > n_rows || width > n_cols {
            log::warn!(
                "region of interest {}x{} exceeds the {}x{} image, clipping to the image",
                height,
                width,
                n_rows,
                n_cols
            );
        }
        let (height, width) = (height.min(n_rows), width.min(n_cols));
        Self(
            luma.rows()
                .take(height)
                .map(|row| row.take(width).map(|p| p.0[0].into()).collect())
                .collect(),
        )
    }
    /// Number of rows
    pub fn height(&self) -> usize {
        self.0.len()
    }
    /// Number of pixels per row
    pub fn width(&self) -> usize {
        self.0.first().map_or(0, |row| row.len())
    }
}
