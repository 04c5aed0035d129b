use std::path::{Path, PathBuf};

use tracing::{debug, error, info, info_span, warn};

use crate::categorizer::DocumentClassifier;
use crate::config::Settings;
use crate::error::ExtractError;
use crate::media::{ContentSniffer, MediaSniffer};
use crate::notify::{DisabledNotifier, Notifier, SpoolNotifier};
use crate::processor::{
    IdentityResolver, OcrPageLoader, PageLoader, RegionExtractor, TesseractEngine,
};
use crate::record::DocumentRecord;
use crate::remote::{RemoteStore, RemoteSync};
use crate::sanitize;
use crate::stats::RankStatistics;
use crate::storage::Archivist;

use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};

/// Where a file ended up after one pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Identified and moved into the done archive.
    Archived(PathBuf),
    /// Not identified, handed off for mailing, moved to `unreadable/`.
    Unreadable(PathBuf),
    /// Kept where it was; nothing safe to do with it.
    LeftInPlace,
    /// Never entered the pipeline (unopenable or unclassified).
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub archived: usize,
    pub unreadable: usize,
    pub left_in_place: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Archived(_) => self.archived += 1,
            ProcessOutcome::Unreadable(_) => self.unreadable += 1,
            ProcessOutcome::LeftInPlace => self.left_in_place += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.archived + self.unreadable + self.left_in_place + self.skipped
    }
}

/// Classify, identify, sync and archive, one file at a time.
pub struct Pipeline<S> {
    classifier: DocumentClassifier,
    sniffer: Box<dyn MediaSniffer>,
    pages: Box<dyn PageLoader>,
    resolver: IdentityResolver,
    sync: RemoteSync<S>,
    notifier: Box<dyn Notifier>,
    archivist: Archivist,
    stats: RankStatistics,
}

impl<S: RemoteStore> Pipeline<S> {
    /// Production constructor: Tesseract OCR, content sniffing and the
    /// configured notification sink.
    pub fn from_settings(settings: &Settings, store: S, stats: RankStatistics) -> Self {
        let ocr = TesseractEngine::new(&settings.ocr.languages, settings.ocr.dpi);
        let pages = OcrPageLoader::new(RegionExtractor::new(settings.ocr.regions.clone()), ocr);

        let notifier: Box<dyn Notifier> = match &settings.notification {
            Some(notification) => Box::new(SpoolNotifier::new(notification.clone(), settings.retry)),
            None => Box::new(DisabledNotifier),
        };

        Self::new(
            DocumentClassifier::new(settings.profiles.clone()),
            Box::new(pages),
            RemoteSync::new(store),
            Archivist::new(&settings.done_path),
        )
        .with_notifier(notifier)
        .with_stats(stats)
    }

    /// Minimal constructor; sniffing by content, notifications off and
    /// statistics kept in memory until replaced.
    pub fn new(
        classifier: DocumentClassifier,
        pages: Box<dyn PageLoader>,
        sync: RemoteSync<S>,
        archivist: Archivist,
    ) -> Self {
        Self {
            classifier,
            sniffer: Box::new(ContentSniffer::new()),
            pages,
            resolver: IdentityResolver::new(),
            sync,
            notifier: Box::new(DisabledNotifier),
            archivist,
            stats: RankStatistics::in_memory(),
        }
    }

    pub fn with_sniffer(mut self, sniffer: Box<dyn MediaSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_stats(mut self, stats: RankStatistics) -> Self {
        self.stats = stats;
        self
    }

    pub fn sync(&self) -> &RemoteSync<S> {
        &self.sync
    }

    pub fn stats(&self) -> &RankStatistics {
        &self.stats
    }

    /// Hands the statistics back so they can be saved once at exit.
    pub fn into_stats(self) -> RankStatistics {
        self.stats
    }

    /// Processes `paths` in order. A failing record never stops the run.
    pub fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            let outcome = self.process(path.as_ref());
            summary.record(&outcome);
        }

        info!(
            "Processed {} file(s): {} archived, {} unreadable, {} left in place, {} skipped",
            summary.total(),
            summary.archived,
            summary.unreadable,
            summary.left_in_place,
            summary.skipped
        );
        summary
    }

    /// Runs the full pipeline for a single file.
    pub fn process(&mut self, path: &Path) -> ProcessOutcome {
        let filename = sanitize::redact_path(path);
        let _pipeline_span = info_span!("pipeline", filename = %filename).entered();

        let mut ctx = match self.step_open(path) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Unable to parse file {}: {}. IGNORING.", filename, e);
                return ProcessOutcome::Skipped;
            }
        };

        {
            let _step = info_span!("classify").entered();
            if let Err(e) = self.step_classify(&mut ctx) {
                warn!("{}. Skipping.", e);
                return ProcessOutcome::Skipped;
            }
        }

        {
            let _step = info_span!("identify").entered();
            self.step_identify(&mut ctx);
        }

        {
            let _step = info_span!("sync").entered();
            self.step_sync(&mut ctx);
        }

        if ctx.attachment_id == 0 {
            let _step = info_span!("notify").entered();
            self.step_notify(&mut ctx);
        }

        let _step = info_span!("archive").entered();
        if let Err(e) = self.step_archive(&mut ctx) {
            error!("Could not archive {}: {}", filename, e);
            return ProcessOutcome::LeftInPlace;
        }

        for warning in &ctx.warnings {
            debug!("{}: {:?}", filename, warning);
        }

        match ctx.archive_path {
            Some(path) if ctx.record.identity().is_empty() => ProcessOutcome::Unreadable(path),
            Some(path) => ProcessOutcome::Archived(path),
            None => ProcessOutcome::LeftInPlace,
        }
    }

    fn step_open(&self, path: &Path) -> Result<PipelineContext, PipelineError> {
        Ok(PipelineContext::new(DocumentRecord::open(path)?))
    }

    fn step_classify(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let doc_type = ctx
            .record
            .document_type(&self.classifier, self.sniffer.as_ref())?
            .to_string();

        match self.classifier.profile(&doc_type) {
            Some(profile) if !doc_type.is_empty() => {
                ctx.profile = Some(profile.clone());
                Ok(())
            }
            _ => Err(ExtractError::UnclassifiedDocument(
                ctx.record.source_path().to_path_buf(),
            )
            .into()),
        }
    }

    fn step_identify(&mut self, ctx: &mut PipelineContext) {
        let Some(profile) = ctx.profile.as_ref() else {
            return;
        };

        let mut page = match self.pages.load(ctx.record.source_path()) {
            Ok(page) => page,
            Err(e) => {
                warn!("Cannot read {}: {}", ctx.record.file_name(), e);
                ctx.warnings
                    .push(PipelineWarning::ExtractionFailed(e.to_string()));
                return;
            }
        };

        let resolved = ctx
            .record
            .resolve_identity(&self.resolver, profile, page.as_mut(), Some(&mut self.stats))
            .map(str::to_string);

        match resolved {
            Ok(identity) if identity.is_empty() => {
                let exhausted = ExtractError::ExtractionExhausted {
                    path: ctx.record.source_path().to_path_buf(),
                    minimum: profile.sensitivity.minimum,
                };
                warn!("{}", exhausted);
                ctx.warnings.push(PipelineWarning::ExtractionExhausted {
                    minimum: profile.sensitivity.minimum,
                });
            }
            Ok(identity) => info!("Identified {} as {}", ctx.record.file_name(), identity),
            Err(e) => {
                warn!("Extraction failed for {}: {}", ctx.record.file_name(), e);
                ctx.warnings
                    .push(PipelineWarning::ExtractionFailed(e.to_string()));
            }
        }
    }

    fn step_sync(&mut self, ctx: &mut PipelineContext) {
        let Some(profile) = ctx.profile.as_ref() else {
            return;
        };

        ctx.attachment_id = self.sync.upload_attachment(&mut ctx.record, profile);
        if ctx.attachment_id > 0 {
            info!(
                "Saved {} ID: {} attachment: {} document: {}",
                ctx.record.identity(),
                ctx.record.remote_record_id(),
                ctx.attachment_id,
                ctx.record.remote_document_id()
            );
        } else {
            ctx.warnings.push(PipelineWarning::NotSynced);
        }
    }

    fn step_notify(&self, ctx: &mut PipelineContext) {
        let content = match std::fs::read(ctx.record.source_path()) {
            Ok(content) => content,
            Err(e) => {
                ctx.warnings.push(PipelineWarning::NotifyFailed(e.to_string()));
                return;
            }
        };

        error!(
            "Unable to process file: {}. Handing it off for mailing.",
            ctx.record.file_name()
        );
        match self.notifier.notify(&ctx.record, &content) {
            Ok(true) => ctx.record.mark_notified(),
            Ok(false) => {}
            Err(e) => {
                warn!("Notification for {} failed: {}", ctx.record.file_name(), e);
                ctx.warnings.push(PipelineWarning::NotifyFailed(e.to_string()));
            }
        }
    }

    fn step_archive(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        ctx.archive_path = self.archivist.archive(&mut ctx.record)?;
        Ok(())
    }
}
