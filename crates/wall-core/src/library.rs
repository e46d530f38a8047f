// ABOUTME: Movie library built from a folder scan.
// ABOUTME: Provides the ordered movie list used for next/random playback.

use std::path::{Path, PathBuf};

/// A movie file and its display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieEntry {
    /// Relative folder plus file stem, e.g. `action/Heat`
    pub label: String,
    pub path: PathBuf,
}

/// Ordered list of movies found under a root folder
#[derive(Debug, Clone, Default)]
pub struct MovieLibrary {
    root: PathBuf,
    entries: Vec<MovieEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Failed to scan movie folder {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MovieLibrary {
    /// Recursively scan `root` for files with one of `extensions`.
    ///
    /// Hidden files and folders are skipped. Unreadable subfolders are
    /// logged and skipped; only an unreadable root is an error.
    pub fn scan(root: &Path, extensions: &[String]) -> Result<Self, LibraryError> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let read = match std::fs::read_dir(&dir) {
                Ok(read) => read,
                Err(source) if dir.as_path() == root => {
                    return Err(LibraryError::Scan {
                        path: dir,
                        source,
                    })
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable folder {}: {}", dir.display(), e);
                    continue;
                }
            };
            for entry in read.flatten() {
                let path = entry.path();
                if is_hidden(&path) {
                    continue;
                }
                if path.is_dir() {
                    pending.push(path);
                } else if has_extension(&path, extensions) {
                    files.push(path);
                }
            }
        }

        let library = Self::from_paths(root, files);
        tracing::info!(
            "Found {} movies under {}",
            library.len(),
            root.display()
        );
        Ok(library)
    }

    /// Build a library from already known paths (paths outside `root` keep their full path as label)
    pub fn from_paths(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut entries: Vec<MovieEntry> = paths
            .into_iter()
            .map(|path| MovieEntry {
                label: label_for(root, &path),
                path,
            })
            .collect();
        entries.sort_by(|a, b| sort_key(&a.label).cmp(&sort_key(&b.label)));
        entries.dedup_by(|a, b| a.label == b.label);
        Self {
            root: root.to_path_buf(),
            entries,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MovieEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(|e| e.path.as_path())
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path.as_path() == path)
    }

    pub fn path_for_label(&self, label: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.path.as_path())
    }

    /// Label for any path, whether or not it is in the library
    pub fn label_for(&self, path: &Path) -> String {
        label_for(&self.root, path)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

fn label_for(root: &Path, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = path.parent().and_then(|p| p.strip_prefix(root).ok());
    match folder {
        Some(rel) if rel.as_os_str().is_empty() => stem,
        Some(rel) => format!("{}/{}", rel.to_string_lossy().replace('\\', "/"), stem),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Sort by folder first, then by name
fn sort_key(label: &str) -> (&str, &str) {
    match label.rsplit_once('/') {
        Some((folder, name)) => (folder, name),
        None => ("", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("zeta.mp4"));
        touch(&root.join("alpha.MOV"));
        touch(&root.join("notes.txt"));
        touch(&root.join(".hidden.mp4"));
        touch(&root.join("action").join("heat.mkv"));
        touch(&root.join(".trash").join("old.mp4"));

        let exts = vec!["mp4".to_string(), "mov".to_string(), ".mkv".to_string()];
        let library = MovieLibrary::scan(root, &exts).unwrap();

        let labels: Vec<&str> = library.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "zeta", "action/heat"]);
    }

    #[test]
    fn scan_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(MovieLibrary::scan(&missing, &["mp4".to_string()]).is_err());
    }

    #[test]
    fn lookups() {
        let root = Path::new("/movies");
        let library = MovieLibrary::from_paths(
            root,
            vec![PathBuf::from("/movies/b.mp4"), PathBuf::from("/movies/a.mp4")],
        );
        assert_eq!(library.get(0), Some(Path::new("/movies/a.mp4")));
        assert_eq!(library.position_of(Path::new("/movies/b.mp4")), Some(1));
        assert_eq!(library.path_for_label("b"), Some(Path::new("/movies/b.mp4")));
        assert_eq!(library.label_for(Path::new("/elsewhere/c.mp4")), "/elsewhere/c.mp4");
    }
}
