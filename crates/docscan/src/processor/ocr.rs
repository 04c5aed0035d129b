use std::cell::RefCell;
use std::io::Cursor;

use image::GrayImage;

use crate::error::ExtractError;

/// Tesseract page segmentation mode 6: a single uniform block of text.
pub const PSM_SINGLE_BLOCK: &str = "6";

/// Turns a binarized text block into a string.
pub trait OcrEngine {
    fn recognize_block(&self, region: &GrayImage) -> Result<String, ExtractError>;
}

/// Tesseract through leptess. The handle is created on the first read and
/// reused for every block after that.
pub struct TesseractEngine {
    languages: String,
    dpi: u32,
    handle: RefCell<Option<leptess::LepTess>>,
}

impl TesseractEngine {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        let languages = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            languages,
            dpi,
            handle: RefCell::new(None),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.borrow().is_some()
    }

    fn open_handle(&self) -> Result<leptess::LepTess, ExtractError> {
        let mut lt = leptess::LepTess::new(None, &self.languages).map_err(|e| {
            ExtractError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;
        lt.set_variable(leptess::Variable::TesseditPagesegMode, PSM_SINGLE_BLOCK)
            .map_err(|e| ExtractError::OcrFailed(format!("Failed to set page mode: {}", e)))?;
        tracing::debug!("Tesseract ready ({})", self.languages);
        Ok(lt)
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_block(&self, region: &GrayImage) -> Result<String, ExtractError> {
        let _span = tracing::debug_span!("processor.ocr").entered();

        let mut png_data = Vec::new();
        image::DynamicImage::ImageLuma8(region.clone())
            .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| ExtractError::OcrFailed(format!("Failed to encode region: {}", e)))?;

        let mut handle = self.handle.borrow_mut();
        if handle.is_none() {
            *handle = Some(self.open_handle()?);
        }
        let Some(lt) = handle.as_mut() else {
            return Err(ExtractError::OcrFailed("Tesseract is not initialized".to_string()));
        };

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ExtractError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;
        lt.set_source_resolution(self.dpi as i32);

        lt.get_utf8_text()
            .map_err(|e| ExtractError::OcrFailed(format!("OCR failed: {}", e)))
    }
}

/// Sets `OMP_THREAD_LIMIT` for Tesseract: the configured value, or all but
/// one CPU. Must run before the first engine is created.
pub fn apply_thread_limit(configured: Option<usize>) -> usize {
    let limit = configured
        .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
        .max(1);
    std::env::set_var("OMP_THREAD_LIMIT", limit.to_string());
    limit
}
