//! Directory traversal: turns a local tree into per-directory upload batches.
//!
//! [`walk`] is lazy and does no uploading. It yields one [`DirectoryBatch`] per
//! directory in depth-first post-order, so a consumer that finishes each batch
//! before pulling the next one completes every subtree before its parent's own
//! files. Within a batch the entry-point file, if present, is the last task.
//!
//! Listing a directory is the only fatal failure. An entry whose type cannot be
//! determined, or whose name cannot be turned into an object key, is reported in
//! [`DirectoryBatch::unreadable`] and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::contract::UploadTask;
use crate::synchronise::SyncError;

/// Everything to upload from a single directory, subdirectories excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBatch {
    pub local_dir: PathBuf,
    pub remote_prefix: String,
    pub files: Vec<UploadTask>,
    pub unreadable: Vec<PathBuf>,
}

/// Move every name equal to `entry_point` behind the others, keeping relative order.
pub fn order_entry_point_last(mut names: Vec<String>, entry_point: &str) -> Vec<String> {
    names.sort_by_key(|name| name == entry_point);
    names
}

/// Normalise a user-supplied remote root into a key prefix.
///
/// Backslashes become `/`, empty segments and surrounding slashes are dropped.
/// An empty result means the bucket root.
pub fn normalize_prefix(remote_root: &str) -> String {
    remote_root
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Key of `name` inside the already normalised `prefix`.
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Start a lazy walk of `local_root`, keyed under `remote_root`.
pub fn walk(
    local_root: impl Into<PathBuf>,
    remote_root: &str,
    entry_point: impl Into<String>,
) -> Walk {
    Walk {
        entry_point: entry_point.into(),
        root: Some((local_root.into(), normalize_prefix(remote_root))),
        stack: Vec::new(),
    }
}

/// Iterator returned by [`walk`]. Ends after the first error.
#[derive(Debug)]
pub struct Walk {
    entry_point: String,
    root: Option<(PathBuf, String)>,
    stack: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    batch: DirectoryBatch,
    subdirs: std::vec::IntoIter<(PathBuf, String)>,
}

impl Walk {
    fn enter(&mut self, local_dir: PathBuf, remote_prefix: String) -> Result<(), SyncError> {
        let (batch, subdirs) = scan(local_dir, remote_prefix, &self.entry_point)?;
        self.stack.push(Frame {
            batch,
            subdirs: subdirs.into_iter(),
        });
        Ok(())
    }
}

impl Iterator for Walk {
    type Item = Result<DirectoryBatch, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((local_root, prefix)) = self.root.take() {
            if let Err(e) = self.enter(local_root, prefix) {
                return Some(Err(e));
            }
        }

        loop {
            let next_subdir = self.stack.last_mut()?.subdirs.next();
            match next_subdir {
                Some((local_dir, remote_prefix)) => {
                    if let Err(e) = self.enter(local_dir, remote_prefix) {
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
                None => return self.stack.pop().map(|frame| Ok(frame.batch)),
            }
        }
    }
}

fn scan(
    local_dir: PathBuf,
    remote_prefix: String,
    entry_point: &str,
) -> Result<(DirectoryBatch, Vec<(PathBuf, String)>), SyncError> {
    let list_error = |source: std::io::Error| SyncError::ListDirectory {
        path: local_dir.clone(),
        source,
    };

    let mut file_names = Vec::new();
    let mut dir_names = Vec::new();
    let mut unreadable = Vec::new();

    for entry in fs::read_dir(&local_dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        let path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(path = %path.display(), name = ?raw, "[WALK] Skipping entry with a non UTF-8 name");
                unreadable.push(path);
                continue;
            }
        };
        // `DirEntry::file_type` does not follow symlinks.
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => dir_names.push(name),
            Ok(_) => file_names.push(name),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "[WALK] Cannot determine entry type");
                unreadable.push(path);
            }
        }
    }

    file_names.sort();
    dir_names.sort();

    let files = order_entry_point_last(file_names, entry_point)
        .into_iter()
        .map(|name| UploadTask::new(local_dir.join(&name), join_key(&remote_prefix, &name)))
        .collect::<Vec<_>>();
    let subdirs = dir_names
        .into_iter()
        .map(|name| (local_dir.join(&name), join_key(&remote_prefix, &name)))
        .collect::<Vec<_>>();

    debug!(
        dir = %local_dir.display(),
        files = files.len(),
        subdirs = subdirs.len(),
        unreadable = unreadable.len(),
        "[WALK] Listed directory"
    );

    Ok((
        DirectoryBatch {
            local_dir,
            remote_prefix,
            files,
            unreadable,
        },
        subdirs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn keys(batch: &DirectoryBatch) -> Vec<&str> {
        batch.files.iter().map(|t| t.remote_key.as_str()).collect()
    }

    #[test]
    fn entry_point_moves_to_the_end() {
        let ordered = order_entry_point_last(names(&["a.txt", "index.html", "b.txt"]), "index.html");
        assert_eq!(ordered, names(&["a.txt", "b.txt", "index.html"]));
    }

    #[test]
    fn lone_entry_point_stays_single() {
        let ordered = order_entry_point_last(names(&["index.html"]), "index.html");
        assert_eq!(ordered, names(&["index.html"]));
    }

    #[test]
    fn entry_point_match_is_exact() {
        let ordered = order_entry_point_last(
            names(&["index.html.bak", "Index.html", "index.html", "zz.css"]),
            "index.html",
        );
        assert_eq!(ordered, names(&["index.html.bak", "Index.html", "zz.css", "index.html"]));
    }

    #[test]
    fn prefixes_are_normalised() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("site/"), "site");
        assert_eq!(normalize_prefix("/site//v2/"), "site/v2");
        assert_eq!(normalize_prefix("site\\v2"), "site/v2");
        assert_eq!(normalize_prefix("./site"), "site");
        assert_eq!(join_key("", "a.txt"), "a.txt");
        assert_eq!(join_key("site/v2", "a.txt"), "site/v2/a.txt");
    }

    #[test]
    fn subtrees_come_before_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("index.html"));
        touch(&root.join("about.html"));
        touch(&root.join("assets/app.js"));
        touch(&root.join("assets/img/logo.png"));
        touch(&root.join("docs/index.html"));
        touch(&root.join("docs/guide.html"));
        fs::create_dir_all(root.join("empty")).unwrap();

        let batches = walk(root, "/site/", "index.html")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let prefixes: Vec<&str> = batches.iter().map(|b| b.remote_prefix.as_str()).collect();
        assert_eq!(
            prefixes,
            vec!["site/assets/img", "site/assets", "site/docs", "site/empty", "site"]
        );
        assert_eq!(keys(&batches[0]), vec!["site/assets/img/logo.png"]);
        assert_eq!(keys(&batches[2]), vec!["site/docs/guide.html", "site/docs/index.html"]);
        assert!(batches[3].files.is_empty());
        assert_eq!(keys(&batches[4]), vec!["site/about.html", "site/index.html"]);
        assert_eq!(batches[4].files[1].local_path, root.join("index.html"));
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut walker = walk(dir.path().join("does-not-exist"), "", "index.html");
        assert!(matches!(walker.next(), Some(Err(SyncError::ListDirectory { .. }))));
        assert!(walker.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_treated_as_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        touch(&root.join("real/page.html"));
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();

        let batches = walk(&root, "", "index.html")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(keys(&batches[1]), vec!["alias"]);
    }
}
