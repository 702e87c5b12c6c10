//! Input path expansion

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

/// Files to check, plus the inputs that were left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedPaths {
    pub files: Vec<PathBuf>,
    /// Paths without an `.ifc` extension and directories that could not be listed
    pub skipped: Vec<PathBuf>,
}

fn is_ifc(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ifc"))
}

/// Expand files and directories into the list of model files to check.
///
/// A directory contributes its immediate `.ifc` files in name order;
/// subdirectories are ignored. Other files are skipped silently, and a
/// directory that cannot be listed is skipped with a warning. A missing
/// `.ifc` path is kept so that opening it is reported as a per-file failure.
pub fn expand_paths<P: AsRef<Path>>(inputs: &[P]) -> ExpandedPaths {
    expand_with(inputs, list_directory)
}

fn list_directory(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            trace!("Not descending into {}", path.display());
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn expand_with<P, F>(inputs: &[P], list: F) -> ExpandedPaths
where
    P: AsRef<Path>,
    F: Fn(&Path) -> io::Result<Vec<PathBuf>>,
{
    let mut expanded = ExpandedPaths::default();

    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            push(&mut expanded, input.to_path_buf());
            continue;
        }
        match list(input) {
            Ok(files) => {
                for path in files {
                    push(&mut expanded, path);
                }
            }
            Err(e) => {
                warn!("Cannot list {}: {e}", input.display());
                expanded.skipped.push(input.to_path_buf());
            }
        }
    }

    debug!(
        files = expanded.files.len(),
        skipped = expanded.skipped.len(),
        "Expanded input paths"
    );
    expanded
}

fn push(expanded: &mut ExpandedPaths, path: PathBuf) {
    if !is_ifc(&path) {
        expanded.skipped.push(path);
    } else if !expanded.files.contains(&path) {
        expanded.files.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_expands_one_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.ifc"), "").unwrap();
        std::fs::write(dir.path().join("a.IFC"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.ifc"), "").unwrap();

        let expanded = expand_paths(&[dir.path()]);
        assert_eq!(
            expanded.files,
            vec![dir.path().join("a.IFC"), dir.path().join("b.ifc")]
        );
        assert_eq!(expanded.skipped, vec![dir.path().join("notes.txt")]);
    }

    #[test]
    fn test_mixed_inputs_keep_order_and_drop_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("m.ifc");
        std::fs::write(&model, "").unwrap();
        let missing = dir.path().join("missing.ifc");

        let expanded = expand_paths(&[missing.clone(), model.clone(), dir.path().to_path_buf()]);
        assert_eq!(expanded.files, vec![missing, model]);
        assert!(expanded.skipped.is_empty());
    }

    #[test]
    fn test_unlistable_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("m.ifc");
        std::fs::write(&model, "").unwrap();

        let expanded = expand_with(&[dir.path().to_path_buf(), model.clone()], |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });
        assert_eq!(expanded.files, vec![model]);
        assert_eq!(expanded.skipped, vec![dir.path().to_path_buf()]);
    }
}
