use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ArchiveError;
use crate::record::DocumentRecord;

pub const UNREADABLE_DIR: &str = "unreadable";

/// Highest `_N` suffix tried before a target counts as taken.
const MAX_DUPLICATES: u32 = 1000;

fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// `file_name` in `directory`, or the first of `stem_2.ext`, `stem_3.ext`, ...
/// that is still free.
fn free_target(directory: &Path, file_name: &str) -> Result<PathBuf, ArchiveError> {
    let wanted = directory.join(file_name);
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    std::iter::once(wanted.clone())
        .chain((2..=MAX_DUPLICATES).map(|n| directory.join(format!("{}_{}{}", stem, n, extension))))
        .find(|candidate| !occupied(candidate))
        .ok_or(ArchiveError::FileExists(wanted))
}

/// Renames `from` onto `to`. When the rename is refused (other volume) the
/// content is copied and the source removed.
fn relocate_file(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    let move_error = |source| ArchiveError::MoveFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Err(e) = std::fs::rename(from, to) {
        debug!("Rename failed ({}), copying instead", e);
        std::fs::copy(from, to).map_err(move_error)?;
        std::fs::remove_file(from).map_err(move_error)?;
    }
    Ok(())
}

/// `type/year/number` split out of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLayout<'a> {
    pub doc_type: &'a str,
    pub year: &'a str,
    pub number: u64,
}

impl<'a> IdentityLayout<'a> {
    pub fn parse(identity: &'a str) -> Result<Self, ArchiveError> {
        let layout_error = || ArchiveError::Layout(identity.to_string());

        let mut parts = identity.split('/');
        let (Some(doc_type), Some(year), Some(number), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(layout_error());
        };
        if !is_plain_component(doc_type) || !is_plain_component(year) {
            return Err(layout_error());
        }
        let number = number.trim().parse::<u64>().map_err(|_| layout_error())?;

        Ok(Self {
            doc_type,
            year,
            number,
        })
    }

    /// Hundred-sized bucket directory name: 12412 -> "12400", 99 -> "0000".
    pub fn bucket_dir(&self) -> String {
        format!("{:02}00", self.number / 100)
    }

    pub fn relative_dir(&self) -> PathBuf {
        Path::new(self.doc_type).join(self.year).join(self.bucket_dir())
    }
}

/// A single normal path component: not empty, not `.` or `..`, no separators.
fn is_plain_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

/// Archive file name embedding the identity and both remote ids.
pub fn archive_file_name(doc: &DocumentRecord) -> String {
    let original = doc
        .source_path()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!(
        "{}-id-{}-aid-{}-{}",
        doc.identity().replace('/', "-"),
        doc.remote_record_id(),
        doc.remote_attachment_id(),
        original
    )
}

/// Moves processed files into the done archive next to their source.
///
/// The archive root is `done_path` resolved against the directory the file
/// currently lives in (an absolute `done_path` is used as is).
pub struct Archivist {
    done_path: PathBuf,
}

impl Archivist {
    pub fn new<P: AsRef<Path>>(done_path: P) -> Self {
        Self {
            done_path: done_path.as_ref().to_path_buf(),
        }
    }

    pub fn done_root(&self, doc: &DocumentRecord) -> PathBuf {
        let parent = doc.source_path().parent().unwrap_or_else(|| Path::new(""));
        parent.join(&self.done_path)
    }

    /// Relocates `doc` and returns its new path, or `None` when the file was
    /// left where it is because its identity has no archive layout.
    pub fn archive(&self, doc: &mut DocumentRecord) -> Result<Option<PathBuf>, ArchiveError> {
        let done_root = self.done_root(doc);

        if doc.identity().is_empty() && doc.notified_by_email() {
            let target = self.place(doc, &done_root.join(UNREADABLE_DIR), &original_name(doc))?;
            warn!(
                "Moved unreadable file -> {}",
                crate::sanitize::redact_path(&target)
            );
            return Ok(Some(target));
        }

        let layout = match IdentityLayout::parse(doc.identity()) {
            Ok(layout) => layout,
            Err(e) => {
                warn!(
                    "No appropriate document name for {}. Can not be safely moved: {}",
                    doc.file_name(),
                    e
                );
                return Ok(None);
            }
        };

        let directory = done_root.join(layout.relative_dir());

        if doc.remote_record_id() == 0 || doc.remote_attachment_id() == 0 {
            warn!(
                "Document {} file: {} is not saved to the remote store",
                doc.identity(),
                doc.file_name()
            );
        }

        let file_name = archive_file_name(doc);
        debug!("Targeting {} for file {}", file_name, doc.file_name());
        let target = self.place(doc, &directory, &file_name)?;

        info!(
            "Moved {} -> {}",
            doc.identity(),
            crate::sanitize::redact_path(&target)
        );
        Ok(Some(target))
    }

    /// Moves `doc` into `directory` under `file_name` (or its first free
    /// variant) and points the record at the new location.
    fn place(
        &self,
        doc: &mut DocumentRecord,
        directory: &Path,
        file_name: &str,
    ) -> Result<PathBuf, ArchiveError> {
        std::fs::create_dir_all(directory).map_err(|e| ArchiveError::CreateDirectory {
            path: directory.to_path_buf(),
            source: e,
        })?;
        let target = free_target(directory, file_name)?;
        relocate_file(doc.source_path(), &target)?;
        doc.relocate(target.clone());
        Ok(target)
    }
}

fn original_name(doc: &DocumentRecord) -> String {
    doc.source_path()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
