//! File naming and delivery of encoded exports.

use std::path::{Path, PathBuf};

use crate::config::FileKind;
use crate::dimensions::TargetDimensions;
use crate::error::Result;

/// Lowercase `name` and replace every character outside `[a-z0-9]` with `_`.
///
/// An empty name becomes `design`.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "design".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `<sanitized-name>-<width>x<height>.<ext>` for raster kinds,
/// `<sanitized-name>.doc` for Word output.
pub fn export_file_name(name: &str, target: TargetDimensions, kind: FileKind) -> String {
    let base = sanitize_name(name);
    match kind {
        FileKind::Doc => format!("{base}.{}", kind.extension()),
        _ => format!("{base}-{target}.{}", kind.extension()),
    }
}

/// Write `bytes` to `dir/file_name` in one step.
///
/// The data goes to a temporary sibling first and is renamed into place, so
/// a failure never leaves a partial file under the final name.
pub fn write_download(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let final_path = dir.join(file_name);
    let partial = dir.join(format!(".{file_name}.part"));

    if let Err(e) = std::fs::write(&partial, bytes) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&partial, &final_path) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }

    tracing::info!(path = %final_path.display(), bytes = bytes.len(), "export written");
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Wedding Invite! 2026"), "my_wedding_invite__2026");
        assert_eq!(sanitize_name("Poster"), "poster");
        assert_eq!(sanitize_name(""), "design");
        assert_eq!(sanitize_name("  "), "__");
        assert_eq!(sanitize_name(" Gala "), "_gala_");
        assert_eq!(sanitize_name("Café"), "caf_");
    }

    #[test]
    fn test_export_file_name() {
        let dims = TargetDimensions::new(1080, 1350);
        assert_eq!(
            export_file_name("Spring Sale", dims, FileKind::Jpeg),
            "spring_sale-1080x1350.jpg"
        );
        assert_eq!(
            export_file_name("Spring Sale", dims, FileKind::Pdf),
            "spring_sale-1080x1350.pdf"
        );
        assert_eq!(export_file_name("Spring Sale", dims, FileKind::Doc), "spring_sale.doc");
    }

    #[test]
    fn test_write_download_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_download(dir.path(), "a.png", b"data").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"data");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
    }
}
