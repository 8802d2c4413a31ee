//! # Directory Walker Module
//!
//! Visita l'albero sorgente (ricorsivo o solo primo livello) e consegna ogni
//! file eleggibile a una callback, tipicamente l'invio di un work item al pool.
//!
//! ## Regole:
//! - Il token di annullamento viene controllato prima di ogni entry: se è
//!   attivo la visita si ferma, i work item già inviati non vengono ritirati
//! - Una directory non leggibile (permessi, sparita, loop di symlink) viene
//!   trattata come vuota: warning e si prosegue
//! - Ogni entry viene visitata al più una volta; l'ordine non è garantito

use crate::cancel::CancellationToken;
use crate::file_manager::FileManager;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counters describing one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Files handed to the callback
    pub eligible: usize,
    /// Entries that were not eligible files (other extensions, unfollowed symlinks, specials)
    pub ignored: usize,
    /// Subdirectories seen (descended into only when recursive)
    pub directories: usize,
    /// Entries or subtrees that could not be read
    pub unreadable: usize,
    /// The walk stopped early because the run was cancelled
    pub cancelled: bool,
}

/// Walks a source tree and reports eligible files
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    recursive: bool,
    follow_links: bool,
    token: CancellationToken,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>, recursive: bool, token: CancellationToken) -> Self {
        Self {
            root: root.into(),
            recursive,
            follow_links: true,
            token,
        }
    }

    /// Follow symbolic links (the default); link cycles are reported as unreadable entries
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Walk the tree, calling `on_eligible` once per eligible file.
    pub fn walk<F>(&self, mut on_eligible: F) -> WalkSummary
    where
        F: FnMut(PathBuf),
    {
        let mut summary = WalkSummary::default();

        let mut walk = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(self.follow_links);
        if !self.recursive {
            walk = walk.max_depth(1);
        }
        let mut entries = walk.into_iter();

        loop {
            if self.token.is_cancelled() {
                debug!("Walk of {} stopped by cancellation", self.root.display());
                summary.cancelled = true;
                break;
            }

            let entry = match entries.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path, e);
                    summary.unreadable += 1;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                summary.directories += 1;
                continue;
            }

            if FileManager::is_eligible(&entry) {
                summary.eligible += 1;
                on_eligible(entry.into_path());
            } else {
                summary.ignored += 1;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// a.png, B.JPG, c.jpeg, notes.txt, sub/d.bmp, sub/e.txt, sub/deeper/f.png, empty/
    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub").join("deeper")).unwrap();
        fs::create_dir(root.join("empty")).unwrap();
        for file in [
            "a.png",
            "B.JPG",
            "c.jpeg",
            "notes.txt",
            "sub/d.bmp",
            "sub/e.txt",
            "sub/deeper/f.png",
        ] {
            fs::write(root.join(file), b"x").unwrap();
        }
        temp_dir
    }

    fn collect(walker: &DirectoryWalker) -> (Vec<PathBuf>, WalkSummary) {
        let mut found = Vec::new();
        let summary = walker.walk(|path| found.push(path));
        found.sort();
        (found, summary)
    }

    #[test]
    fn test_shallow_walk_skips_subdirectories() {
        let tree = sample_tree();
        let walker = DirectoryWalker::new(tree.path(), false, CancellationToken::new());

        let (found, summary) = collect(&walker);

        assert_eq!(summary.eligible, 3);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| p.parent() == Some(tree.path())));
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.directories, 2);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_recursive_walk_counts_every_eligible_file() {
        let tree = sample_tree();
        let walker = DirectoryWalker::new(tree.path(), true, CancellationToken::new());

        let (found, summary) = collect(&walker);

        assert_eq!(summary.eligible, 5);
        assert!(found.contains(&tree.path().join("sub").join("d.bmp")));
        assert!(found.contains(&tree.path().join("sub").join("deeper").join("f.png")));
        assert_eq!(summary.ignored, 2);
    }

    #[test]
    fn test_each_file_reported_once() {
        let tree = sample_tree();
        let walker = DirectoryWalker::new(tree.path(), true, CancellationToken::new());

        let (found, _) = collect(&walker);
        let mut deduped = found.clone();
        deduped.dedup();

        assert_eq!(found, deduped);
    }

    #[test]
    fn test_cancelled_before_walk_reports_nothing() {
        let tree = sample_tree();
        let token = CancellationToken::new();
        token.signal();
        let walker = DirectoryWalker::new(tree.path(), true, token);

        let (found, summary) = collect(&walker);

        assert!(found.is_empty());
        assert!(summary.cancelled);
    }

    #[test]
    fn test_cancel_mid_walk_stops_at_next_check() {
        let tree = sample_tree();
        let token = CancellationToken::new();
        let walker = DirectoryWalker::new(tree.path(), true, token.clone());

        let mut found = Vec::new();
        let summary = walker.walk(|path| {
            found.push(path);
            token.signal();
        });

        assert_eq!(found.len(), 1);
        assert_eq!(summary.eligible, 1);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_missing_root_is_treated_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let walker = DirectoryWalker::new(temp_dir.path().join("gone"), true, CancellationToken::new());

        let (found, summary) = collect(&walker);

        assert!(found.is_empty());
        assert_eq!(summary.unreadable, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_followed_by_default() {
        let tree = sample_tree();
        std::os::unix::fs::symlink(tree.path().join("a.png"), tree.path().join("link.png")).unwrap();

        let walker = DirectoryWalker::new(tree.path(), false, CancellationToken::new());
        let (found, _) = collect(&walker);
        assert!(found.contains(&tree.path().join("link.png")));

        let walker = DirectoryWalker::new(tree.path(), false, CancellationToken::new()).follow_links(false);
        let (found, summary) = collect(&walker);
        assert!(!found.contains(&tree.path().join("link.png")));
        assert_eq!(summary.eligible, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped() {
        let tree = sample_tree();
        std::os::unix::fs::symlink(tree.path(), tree.path().join("sub").join("loop")).unwrap();

        let walker = DirectoryWalker::new(tree.path(), true, CancellationToken::new());
        let (found, summary) = collect(&walker);

        assert_eq!(found.len(), 5);
        assert_eq!(summary.unreadable, 1);
    }
}
