//! Newline-delimited source lists, one per platform.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::model::Platform;

/// Handles from list-file content: blank and `#` lines skipped, leading `@`
/// stripped, file order preserved.
pub fn parse_sources(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.trim_start_matches('@').trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Read a source list. A missing file is an empty list.
pub fn load_sources(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(parse_sources(&s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(target: "track", path = %path.display(), "source list missing; nothing to track");
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("reading source list {}", path.display())),
    }
}

/// Trim, strip `@`, drop blanks.
pub fn clean_handles<S: AsRef<str>>(handles: &[S]) -> Vec<String> {
    handles
        .iter()
        .map(|h| h.as_ref().trim().trim_start_matches('@').trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Replace a source list. Returns the handles as written.
pub fn save_sources<S: AsRef<str>>(
    path: &Path,
    platform: Platform,
    handles: &[S],
) -> Result<Vec<String>> {
    let cleaned = clean_handles(handles);

    let mut body = format!(
        "# {} sources to track\n# Updated at {}\n\n",
        platform.display_name(),
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );
    for h in &cleaned {
        body.push_str(h);
        body.push('\n');
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, body).with_context(|| format!("writing source list {}", path.display()))?;

    info!(target: "track", platform = %platform, count = cleaned.len(), "source list updated");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_blanks_and_at_signs_are_handled() {
        assert_eq!(parse_sources("# comment\n@alice\n\nbob\n"), vec!["alice", "bob"]);
        assert_eq!(parse_sources("  @carol  \r\n#x\n@\n"), vec!["carol"]);
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_sources(&tmp.path().join("none.txt")).unwrap().is_empty());
    }

    #[test]
    fn saved_lists_load_back_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lists/handletwitter.txt");
        let written = save_sources(&path, Platform::Twitter, &["@zed", " ", "amy "]).unwrap();
        assert_eq!(written, vec!["zed", "amy"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("# Twitter sources to track\n# Updated at "));
        assert_eq!(load_sources(&path).unwrap(), vec!["zed", "amy"]);
    }
}
