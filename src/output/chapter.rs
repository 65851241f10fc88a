//! Chapter file output
//!
//! Each fetched page is written verbatim to `<dir>/<title>.html`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Characters that are not allowed in file names on common filesystems
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Longest title kept in a file name, in characters
const MAX_TITLE_CHARS: usize = 80;

/// Name used when a page has no usable title
pub const UNTITLED: &str = "untitled";

/// Turns a page title into a file name stem
///
/// Removes path separators and other characters filesystems reject, trims
/// whitespace, and keeps at most 80 characters.
///
/// # Examples
///
/// ```
/// use chapter_chain::output::sanitize_title;
///
/// assert_eq!(sanitize_title(Some("Chapter 1: <Dawn>")), "Chapter 1 Dawn");
/// assert_eq!(sanitize_title(None), "untitled");
/// ```
pub fn sanitize_title(title: Option<&str>) -> String {
    let cleaned: String = title
        .unwrap_or_default()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();

    let truncated: String = cleaned.trim().chars().take(MAX_TITLE_CHARS).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() || truncated.chars().all(|c| c == '.') {
        UNTITLED.to_string()
    } else {
        truncated.to_string()
    }
}

/// Writes chapter pages into one output directory
#[derive(Debug, Clone)]
pub struct ChapterWriter {
    dir: PathBuf,
}

impl ChapterWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a chapter with this (already sanitized) title is written to
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.html", title))
    }

    /// Writes `content` verbatim, creating the directory if needed
    ///
    /// A chapter with the same title as an earlier one replaces it.
    ///
    /// # Returns
    ///
    /// The path of the written file
    pub fn write(&self, title: &str, content: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(title);
        fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_forbidden_characters() {
        assert_eq!(
            sanitize_title(Some(r#"A/B\C*D?E:F"G<H>I|J"#)),
            "ABCDEFGHIJ"
        );
    }

    #[test]
    fn test_trims_whitespace_and_newlines() {
        assert_eq!(sanitize_title(Some("  \n Chapter 3 \t")), "Chapter 3");
    }

    #[test]
    fn test_truncates_to_80_chars() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_title(Some(&long)).chars().count(), 80);

        let wide = "章".repeat(100);
        assert_eq!(sanitize_title(Some(&wide)).chars().count(), 80);
    }

    #[test]
    fn test_untitled_fallbacks() {
        assert_eq!(sanitize_title(None), UNTITLED);
        assert_eq!(sanitize_title(Some("")), UNTITLED);
        assert_eq!(sanitize_title(Some("???")), UNTITLED);
        assert_eq!(sanitize_title(Some("..")), UNTITLED);
    }

    #[test]
    fn test_write_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let writer = ChapterWriter::new(tmp.path().join("novels").join("book"));

        let path = writer.write("Chapter 1", "<html>one</html>").unwrap();

        assert_eq!(path, tmp.path().join("novels/book/Chapter 1.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html>one</html>");
    }

    #[test]
    fn test_same_title_overwrites() {
        let tmp = TempDir::new().unwrap();
        let writer = ChapterWriter::new(tmp.path());

        writer.write("Same", "first").unwrap();
        let path = writer.write("Same", "second").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }
}
