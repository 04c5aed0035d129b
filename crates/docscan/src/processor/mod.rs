//! Reading a document identity off a scanned page.
//!
//! [`regions`] finds text blocks, [`ocr`] turns a block into a string and
//! [`identity`] drives both through the sensitivity back-off.

pub mod identity;
pub mod ocr;
pub mod regions;

pub use identity::{IdentityResolver, OcrPageLoader, PageLoader, RegionSource, ScannedPage};
pub use ocr::{apply_thread_limit, OcrEngine, TesseractEngine};
pub use regions::{Region, RegionExtractor};
