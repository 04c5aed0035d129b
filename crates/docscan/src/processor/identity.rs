use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::config::profile::DocumentProfile;
use crate::error::ExtractError;
use crate::processor::ocr::OcrEngine;
use crate::processor::regions::{Region, RegionExtractor};
use crate::record::DocumentRecord;
use crate::stats::RankStatistics;

/// Something that can be scanned for text blocks and read one block at a time.
pub trait RegionSource {
    /// Detects text blocks at `sensitivity` and returns how many were found.
    fn detect(&mut self, sensitivity: u32) -> Result<usize, ExtractError>;

    /// OCR text of the detected block at `index`; negative values count from
    /// the end of the list.
    fn read(&mut self, index: i32) -> Result<String, ExtractError>;
}

/// A page image paired with the extractor and OCR engine that read it.
pub struct ScannedPage<'a> {
    extractor: &'a RegionExtractor,
    ocr: &'a dyn OcrEngine,
    image: GrayImage,
    regions: Vec<Region>,
}

impl<'a> ScannedPage<'a> {
    pub fn load(
        path: &Path,
        extractor: &'a RegionExtractor,
        ocr: &'a dyn OcrEngine,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            image: extractor.load(path)?,
            extractor,
            ocr,
            regions: Vec::new(),
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl RegionSource for ScannedPage<'_> {
    fn detect(&mut self, sensitivity: u32) -> Result<usize, ExtractError> {
        self.regions = self.extractor.detect(&self.image, sensitivity);
        Ok(self.regions.len())
    }

    fn read(&mut self, index: i32) -> Result<String, ExtractError> {
        self.extractor
            .read_text(&self.image, &self.regions, index, self.ocr)
    }
}

/// Opens a file as something the identity resolver can scan.
pub trait PageLoader {
    fn load<'a>(&'a self, path: &Path) -> Result<Box<dyn RegionSource + 'a>, ExtractError>;
}

/// Loads pages from disk and reads them with `O`.
pub struct OcrPageLoader<O> {
    extractor: RegionExtractor,
    ocr: O,
}

impl<O: OcrEngine> OcrPageLoader<O> {
    pub fn new(extractor: RegionExtractor, ocr: O) -> Self {
        Self { extractor, ocr }
    }
}

impl<O: OcrEngine> PageLoader for OcrPageLoader<O> {
    fn load<'a>(&'a self, path: &Path) -> Result<Box<dyn RegionSource + 'a>, ExtractError> {
        Ok(Box::new(ScannedPage::load(path, &self.extractor, &self.ocr)?))
    }
}

/// Drives region detection and OCR through the sensitivity back-off until the
/// profile regex matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Returns the record's identity, extracting it first if it is empty.
    ///
    /// Ranks are tried group by group in configured order and the first
    /// regex match is accepted, even if a later rank would also match. When no
    /// rank matches, the sensitivity is lowered by the profile's step and the
    /// page is re-scanned, until the next step would go below the minimum.
    /// An empty result means every sensitivity was tried without a match.
    pub fn resolve<'d>(
        &self,
        doc: &'d mut DocumentRecord,
        profile: &DocumentProfile,
        source: &mut dyn RegionSource,
        mut stats: Option<&mut RankStatistics>,
    ) -> Result<&'d str, ExtractError> {
        if !doc.identity().is_empty() {
            return Ok(doc.identity());
        }
        if doc.sensitivity() < profile.sensitivity.minimum {
            return Ok(doc.identity());
        }

        loop {
            let sensitivity = doc.sensitivity();
            let found = source.detect(sensitivity)?;
            debug!(
                "Reading {} at sensitivity {} ({} regions)",
                doc.file_name(),
                sensitivity,
                found
            );

            if let Some((rank, number)) = first_match(profile, source, &doc.file_name()) {
                if let Some(stats) = stats.as_deref_mut() {
                    stats.record(&profile.name, rank);
                }
                doc.accept_identity(format!("{}{}", profile.sequence, number));
                break;
            }

            match profile.sensitivity.next(sensitivity) {
                Some(next) => {
                    debug!(
                        "{} can not be parsed. Changing OCR sensitivity {} -> {}.",
                        doc.file_name(),
                        sensitivity,
                        next
                    );
                    doc.set_sensitivity(next);
                }
                None => break,
            }
        }

        Ok(doc.identity())
    }
}

fn first_match(
    profile: &DocumentProfile,
    source: &mut dyn RegionSource,
    file_name: &str,
) -> Option<(i32, String)> {
    for group in &profile.region_groups {
        for &rank in group {
            let text = match source.read(-rank) {
                Ok(text) => text.replace('\n', " "),
                Err(e) => {
                    debug!("Reading {} region: {} failed: {}", file_name, rank, e);
                    continue;
                }
            };
            debug!("Reading {} region: {} result: {}", file_name, rank, text);

            if let Some(number) = profile
                .regex
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            {
                debug!("Region: {} found {} in document string: {}", rank, number, text);
                return Some((rank, number));
            }
        }
    }
    None
}
