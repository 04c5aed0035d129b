use std::path::Path;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::morphology::dilate;

use crate::config::schema::RegionSettings;
use crate::error::ExtractError;
use crate::processor::ocr::OcrEngine;

/// Axis-aligned bounding box of a detected text block, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn fits(&self, sensitivity: u32) -> bool {
        self.width >= sensitivity && self.height >= sensitivity
    }
}

/// Finds blocks of text on a scanned page and prepares them for OCR.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    settings: RegionSettings,
}

impl RegionExtractor {
    pub fn new(settings: RegionSettings) -> Self {
        Self { settings }
    }

    pub fn load(&self, path: &Path) -> Result<GrayImage, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractError::UnreadableSource {
            path: path.to_path_buf(),
            source: e,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|e| ExtractError::ImageDecode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(image.to_luma8())
    }

    /// Every outer text block on the page, in discovery order (top to
    /// bottom), before any size filtering.
    pub fn candidate_blocks(&self, gray: &GrayImage) -> Vec<Region> {
        let _span = tracing::debug_span!("processor.regions").entered();

        let blurred = if self.settings.blur_sigma > 0.0 {
            gaussian_blur_f32(gray, self.settings.blur_sigma)
        } else {
            gray.clone()
        };

        let mut mask = self.adaptive_threshold_inv(&blurred);
        for _ in 0..self.settings.dilate_iterations {
            mask = dilate(&mask, Norm::LInf, self.settings.dilate_radius);
        }

        find_contours::<u32>(&mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|contour| {
                let min_x = contour.points.iter().map(|p| p.x).min()?;
                let max_x = contour.points.iter().map(|p| p.x).max()?;
                let min_y = contour.points.iter().map(|p| p.y).min()?;
                let max_y = contour.points.iter().map(|p| p.y).max()?;
                Some(Region {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                })
            })
            .collect()
    }

    /// Text blocks at least `sensitivity` pixels wide and high.
    pub fn detect(&self, gray: &GrayImage, sensitivity: u32) -> Vec<Region> {
        let regions: Vec<Region> = self
            .candidate_blocks(gray)
            .into_iter()
            .filter(|r| r.fits(sensitivity))
            .collect();
        tracing::debug!("{} regions at sensitivity {}", regions.len(), sensitivity);
        regions
    }

    /// Crops the region at `index` (negative counts from the end) and
    /// binarizes it with the fixed crop threshold.
    pub fn crop(
        &self,
        gray: &GrayImage,
        regions: &[Region],
        index: i32,
    ) -> Result<GrayImage, ExtractError> {
        let region = regions[resolve_index(index, regions.len())?];
        let mut crop =
            image::imageops::crop_imm(gray, region.x, region.y, region.width, region.height)
                .to_image();

        let threshold = self.settings.crop_threshold;
        for pixel in crop.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
        }
        Ok(crop)
    }

    pub fn read_text(
        &self,
        gray: &GrayImage,
        regions: &[Region],
        index: i32,
        ocr: &dyn OcrEngine,
    ) -> Result<String, ExtractError> {
        let crop = self.crop(gray, regions, index)?;
        ocr.recognize_block(&crop)
    }

    /// Local-mean threshold, inverted: dark ink becomes foreground (255).
    fn adaptive_threshold_inv(&self, image: &GrayImage) -> GrayImage {
        let radius = self.settings.block_radius;
        let means = box_filter(image, radius, radius);
        let offset = self.settings.threshold_offset;

        let mut out = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let threshold = i16::from(means.get_pixel(x, y).0[0]) - offset;
            let value = if i16::from(pixel.0[0]) > threshold { 0 } else { 255 };
            out.put_pixel(x, y, Luma([value]));
        }
        out
    }
}

/// Maps a possibly negative index onto `0..len`.
pub fn resolve_index(index: i32, len: usize) -> Result<usize, ExtractError> {
    if len == 0 {
        return Err(ExtractError::NoRegions);
    }
    let signed_len = len as i64;
    let resolved = if index < 0 {
        signed_len + i64::from(index)
    } else {
        i64::from(index)
    };
    if (0..signed_len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(ExtractError::RegionOutOfRange { index, len })
    }
}
