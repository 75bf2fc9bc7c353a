//! Atomic writer for rendered output.
//!
//! ## `atomic_write` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. Compare with the file already on disk → skip if identical.
//! 3. Write to `<path>.bootprint.tmp`.
//! 4. Rename to the final path (atomic on POSIX).
//!
//! Files already in the target directory that the render did not produce are
//! left alone.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bootprint_renderer::RenderResult;

use crate::error::{io_err, WriteError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; the content on disk already matches.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Output paths
// ---------------------------------------------------------------------------

/// Join a rendered output path onto `target_dir`.
///
/// Rendered paths are relative and `/`-separated; absolute paths and `..`
/// segments are rejected.
pub fn output_path(target_dir: &Path, relative: &str) -> Result<PathBuf, WriteError> {
    let outside = || WriteError::OutsideTarget { path: relative.to_owned() };
    let rel = Path::new(relative);
    if relative.is_empty() {
        return Err(outside());
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(outside())
            }
        }
    }
    Ok(target_dir.join(rel))
}

// ---------------------------------------------------------------------------
// atomic_write
// ---------------------------------------------------------------------------

/// Atomically write a single rendered file.
pub(crate) fn atomic_write(path: &Path, content: &str, dry_run: bool) -> Result<WriteResult, WriteError> {
    let normalized = content.replace("\r\n", "\n");
    let content = normalized.as_str();

    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite { path: path.to_path_buf() });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.bootprint.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written { path: path.to_path_buf() })
}

// ---------------------------------------------------------------------------
// write_files
// ---------------------------------------------------------------------------

/// Write every rendered file below `target_dir`, creating it if needed.
///
/// Every path is validated before anything is written, so a bad path leaves
/// the target directory untouched.
pub fn write_files(
    target_dir: &Path,
    files: &RenderResult,
    dry_run: bool,
) -> Result<Vec<WriteResult>, WriteError> {
    let planned = files
        .iter()
        .map(|(relative, content)| Ok((output_path(target_dir, relative)?, content)))
        .collect::<Result<Vec<_>, WriteError>>()?;

    let mut writes = Vec::with_capacity(planned.len());
    for (path, content) in planned {
        writes.push(atomic_write(&path, content, dry_run)?);
    }

    let written = writes.iter().filter(|w| matches!(w, WriteResult::Written { .. })).count();
    tracing::info!(
        "{} file(s) in {}: {written} written, {} unchanged",
        writes.len(),
        target_dir.display(),
        writes.iter().filter(|w| matches!(w, WriteResult::Unchanged { .. })).count(),
    );
    Ok(writes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn files(entries: &[(&str, &str)]) -> RenderResult {
        entries.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect()
    }

    #[test]
    fn rerender_reports_unchanged_until_content_differs() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("site");
        let page = files(&[("index.html", "<h1>Pets</h1>\r\n")]);

        let first = write_files(&target, &page, false).unwrap();
        assert!(matches!(first[0], WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "<h1>Pets</h1>\n");

        let again = write_files(&target, &files(&[("index.html", "<h1>Pets</h1>\n")]), false).unwrap();
        assert!(matches!(again[0], WriteResult::Unchanged { .. }));

        let edited = write_files(&target, &files(&[("index.html", "<h1>Cats</h1>")]), false).unwrap();
        assert!(matches!(edited[0], WriteResult::Written { .. }));
    }

    #[test]
    fn dry_run_reports_without_creating_the_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("site");
        let writes = write_files(&target, &files(&[("main.css", "body {}")]), true).unwrap();
        assert_eq!(writes, vec![WriteResult::WouldWrite { path: target.join("main.css") }]);
        assert!(!target.exists(), "dry-run must not create files");
    }

    #[test]
    fn write_files_creates_target_and_nested_directories() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("site");
        let writes = write_files(
            &target,
            &files(&[("index.html", "<h1>Hi</h1>"), ("api/pets.html", "pets")]),
            false,
        )
        .unwrap();

        assert_eq!(writes.len(), 2);
        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "<h1>Hi</h1>");
        assert_eq!(fs::read_to_string(target.join("api/pets.html")).unwrap(), "pets");
    }

    #[test]
    fn write_files_leaves_unrelated_files_alone() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.txt"), "mine").unwrap();
        write_files(tmp.path(), &files(&[("index.html", "x")]), false).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn escaping_paths_are_rejected_before_anything_is_written() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("site");
        for bad in ["../escape.html", "/etc/passwd", "a/../../b", ""] {
            let err = write_files(&target, &files(&[("aaa.html", "ok"), (bad, "no")]), false)
                .unwrap_err();
            assert!(matches!(err, WriteError::OutsideTarget { .. }), "{bad}: {err:?}");
        }
        assert!(!target.exists(), "nothing may be written");
    }

    #[test]
    fn output_path_accepts_nested_relative_paths() {
        let target = Path::new("/out");
        assert_eq!(output_path(target, "a/b.html").unwrap(), PathBuf::from("/out/a/b.html"));
        assert_eq!(output_path(target, "./c.css").unwrap(), PathBuf::from("/out/./c.css"));
    }
}
