//! Folder scanning and subfolder listing

use crate::sidecar::read_folder_meta_lenient;
use crate::{FsError, Result};
use ipc_proto::{FolderNode, ScanResult, ScannedPhoto};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Photo extensions picked up by a scan (compared lowercase)
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "heic", "heif", "tiff", "tif", "gif", "bmp", "avif",
];

/// Check if a path has a supported photo extension
pub fn is_supported_photo(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn ensure_dir(folder: &Path) -> Result<()> {
    if !folder.exists() {
        return Err(FsError::NotFound(folder.display().to_string()));
    }
    if !folder.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", folder.display())));
    }
    Ok(())
}

/// Scan one folder (non-recursive), newest first, with sidecar metadata merged in
pub fn scan_folder(folder: &Path) -> Result<ScanResult> {
    ensure_dir(folder)?;
    let sidecar = read_folder_meta_lenient(folder);

    let mut photos = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        if !is_supported_photo(&path) {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let meta = sidecar.photos.get(&filename).copied().unwrap_or_default();

        photos.push(ScannedPhoto {
            path: path.to_string_lossy().to_string(),
            filename,
            size: metadata.len(),
            modified,
            meta,
        });
    }

    photos.sort_by(|a, b| match b.modified.cmp(&a.modified) {
        Ordering::Equal => natural_sort_key(&a.filename).cmp(&natural_sort_key(&b.filename)),
        other => other,
    });

    tracing::debug!("Scanned {} photos in {}", photos.len(), folder.display());
    Ok(ScanResult {
        photos,
        folder_path: folder.to_string_lossy().to_string(),
    })
}

/// List visible subfolders, sorted case-insensitively
pub fn list_subfolders(folder: &Path) -> Result<Vec<FolderNode>> {
    ensure_dir(folder)?;

    let mut folders = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.metadata()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&name) {
            continue;
        }
        let path = entry.path();
        let has_children = has_children(&path);
        folders.push(FolderNode {
            name,
            path: path.to_string_lossy().to_string(),
            has_children,
        });
    }

    folders.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(folders)
}

/// A folder is expandable when it holds a visible subfolder or a photo
fn has_children(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.filter_map(|e| e.ok()).any(|e| match e.metadata() {
        Ok(m) if m.is_dir() => !is_hidden(&e.file_name().to_string_lossy()),
        Ok(_) => is_supported_photo(&e.path()),
        Err(_) => false,
    })
}

/// Natural sort key: "IMG_2.jpg" < "IMG_10.jpg"
fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                if let Ok(n) = current_num.parse::<u64>() {
                    parts.push(NaturalSortPart::Num(n));
                }
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        if let Ok(n) = current_num.parse::<u64>() {
            parts.push(NaturalSortPart::Num(n));
        }
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    Num(u64),
    Str(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::write_folder_meta;
    use ipc_proto::{FolderMeta, Label, PhotoMeta};
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["IMG10.jpg", "IMG2.jpg", "IMG1.jpg"];
        names.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));
        assert_eq!(names, vec!["IMG1.jpg", "IMG2.jpg", "IMG10.jpg"]);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_photo(Path::new("a.JPG")));
        assert!(is_supported_photo(Path::new("a.heic")));
        assert!(!is_supported_photo(Path::new("a.txt")));
        assert!(!is_supported_photo(Path::new("README")));
    }

    #[test]
    fn test_scan_newest_first_with_sidecar() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.jpg", 300);
        touch(dir.path(), "new.png", 10);
        touch(dir.path(), "notes.txt", 5);
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let mut meta = FolderMeta::default();
        meta.photos.insert(
            "old.jpg".into(),
            PhotoMeta {
                rating: 4,
                label: Label::Yellow,
                ..Default::default()
            },
        );
        write_folder_meta(dir.path(), &meta).unwrap();

        let result = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = result.photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["new.png", "old.jpg"]);
        assert_eq!(result.photos[1].meta.rating, 4);
        assert_eq!(result.photos[1].meta.label, Label::Yellow);
        assert!(result.photos[0].meta.is_default());
    }

    #[test]
    fn test_scan_missing_folder() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            scan_folder(&dir.path().join("missing")),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_subfolders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        touch(&dir.path().join("beta"), "x.jpg", 0);

        let folders = list_subfolders(dir.path()).unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta"]);
        assert!(!folders[0].has_children);
        assert!(folders[1].has_children);
    }
}
