//! Turning command line arguments into the list of files to process.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathArg {
    Glob(String),
    Directory(PathBuf),
    File(PathBuf),
    Invalid(String),
}

fn looks_like_glob(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Decides what a single path argument refers to.
pub fn classify_path_arg(arg: &str) -> PathArg {
    if looks_like_glob(arg) {
        return match glob::Pattern::new(arg) {
            Ok(_) => PathArg::Glob(arg.to_string()),
            Err(e) => {
                debug!("'{}' is not a valid glob: {}", arg, e);
                PathArg::Invalid(arg.to_string())
            }
        };
    }

    let path = Path::new(arg);
    if path.is_dir() {
        PathArg::Directory(path.to_path_buf())
    } else if path.is_file() {
        PathArg::File(path.to_path_buf())
    } else {
        PathArg::Invalid(arg.to_string())
    }
}

/// Regular files named by `args`, in argument order and sorted within each
/// argument. Directories are listed without descending into them.
pub fn expand_path_args<S: AsRef<str>>(args: &[S]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        let mut found: Vec<PathBuf> = match classify_path_arg(arg) {
            PathArg::Glob(pattern) => match glob::glob(&pattern) {
                Ok(paths) => paths
                    .filter_map(|entry| entry.ok())
                    .filter(|path| path.is_file())
                    .collect(),
                Err(e) => {
                    warn!("Invalid glob '{}': {}", pattern, e);
                    Vec::new()
                }
            },
            PathArg::Directory(dir) => WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect(),
            PathArg::File(path) => vec![path],
            PathArg::Invalid(arg) => {
                warn!("Unable to find file(s) in {}. IGNORING.", arg);
                Vec::new()
            }
        };

        found.sort();
        debug!("{} file(s) from '{}'", found.len(), arg);
        files.extend(found);
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        std::fs::write(dir.join("b.jpg"), b"b").unwrap();
        std::fs::write(dir.join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.join("notes.txt"), b"n").unwrap();
        std::fs::create_dir(dir.join("done")).unwrap();
        std::fs::write(dir.join("done").join("old.jpg"), b"o").unwrap();
    }

    #[test]
    fn test_classify() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());
        let dir = temp_dir.path().to_str().unwrap();
        let file = temp_dir.path().join("a.jpg");

        assert_eq!(classify_path_arg(dir), PathArg::Directory(temp_dir.path().to_path_buf()));
        assert_eq!(classify_path_arg(file.to_str().unwrap()), PathArg::File(file.clone()));
        assert_eq!(
            classify_path_arg(&format!("{}/*.jpg", dir)),
            PathArg::Glob(format!("{}/*.jpg", dir))
        );
        assert!(matches!(classify_path_arg("/no/such/file.jpg"), PathArg::Invalid(_)));
        assert!(matches!(classify_path_arg("scans/[.jpg"), PathArg::Invalid(_)));
    }

    #[test]
    fn test_directory_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());

        let files = expand_path_args(&[temp_dir.path().to_str().unwrap()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "notes.txt"]);
    }

    #[test]
    fn test_glob_and_invalid_arguments() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());
        let pattern = format!("{}/*.jpg", temp_dir.path().display());

        let files = expand_path_args(&[pattern, "/no/such/dir".to_string()]);
        assert_eq!(
            files,
            vec![temp_dir.path().join("a.jpg"), temp_dir.path().join("b.jpg")]
        );
    }
}
