//! Unified diff of rendered output against the target directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use bootprint_renderer::RenderResult;

use crate::error::{io_err, WriteError};
use crate::writer::output_path;

/// A single rendered file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Compare `files` with what is currently on disk below `target_dir`.
///
/// Files whose content already matches are omitted; missing files diff
/// against the empty string. No files are written.
pub fn diff_files(target_dir: &Path, files: &RenderResult) -> Result<Vec<FileDiff>, WriteError> {
    let mut diffs = Vec::new();
    for (relative, rendered) in files {
        let path = output_path(target_dir, relative)?;
        let rendered = normalize_line_endings(rendered);
        let existing = read_existing_or_empty(&path)?;
        if existing == rendered {
            continue;
        }

        let old_header = format!("a/{relative}");
        let new_header = format!("b/{relative}");
        let unified = TextDiff::from_lines(&existing, &rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff { path, unified_diff: unified });
    }
    Ok(diffs)
}

fn read_existing_or_empty(path: &Path) -> Result<String, WriteError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(normalize_line_endings(&content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::writer::write_files;

    use super::*;

    fn rendered() -> RenderResult {
        RenderResult::from([
            ("index.html".to_string(), "<h1>Petstore</h1>\n".to_string()),
            ("main.css".to_string(), "body {\n  margin: 0;\n}\n".to_string()),
        ])
    }

    #[test]
    fn no_diffs_after_clean_write() {
        let target = TempDir::new().expect("target");
        write_files(target.path(), &rendered(), false).expect("write");

        let diffs = diff_files(target.path(), &rendered()).expect("diff");
        assert!(diffs.is_empty(), "written output should have no diff");
    }

    #[test]
    fn local_edit_produces_unified_diff() {
        let target = TempDir::new().expect("target");
        write_files(target.path(), &rendered(), false).expect("write");

        let index = target.path().join("index.html");
        let edited = format!("{}manual tweak\n", fs::read_to_string(&index).expect("read"));
        fs::write(&index, edited).expect("write");

        let diffs = diff_files(target.path(), &rendered()).expect("diff");
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0];
        assert!(diff.path.ends_with("index.html"));
        assert!(diff.unified_diff.contains("--- a/index.html"));
        assert!(diff.unified_diff.contains("+++ b/index.html"));
        assert!(diff.unified_diff.contains("-manual tweak"));
        assert!(diff.unified_diff.contains("@@"));
    }

    #[test]
    fn missing_target_diffs_every_file() {
        let target = TempDir::new().expect("target");
        let diffs = diff_files(&target.path().join("absent"), &rendered()).expect("diff");
        assert_eq!(diffs.len(), 2);
        assert!(diffs[1].unified_diff.contains("+  margin: 0;"));
    }

    #[test]
    fn crlf_on_disk_is_not_a_difference() {
        let target = TempDir::new().expect("target");
        fs::write(target.path().join("index.html"), "<h1>Petstore</h1>\r\n").expect("write");
        fs::write(target.path().join("main.css"), "body {\r\n  margin: 0;\r\n}\r\n").expect("write");

        let diffs = diff_files(target.path(), &rendered()).expect("diff");
        assert!(diffs.is_empty());
    }
}
