use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::warn;

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(ExtractError::UnsupportedFormat(name.to_string()))
        }
    }
}

/// Unpacks an archive into `destination`. Every entry path is validated
/// before anything is written: absolute paths and parent-directory segments
/// are skipped, so extraction can never escape the destination, regardless of
/// what the archive library would accept.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    destination: &Path,
) -> Result<(), ExtractError> {
    fs::create_dir_all(destination)?;
    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, destination),
        ArchiveFormat::Zip => extract_zip(archive, destination),
    }
}

/// Entry path relative to the extraction root, or `None` when the entry must
/// not be written.
fn sanitize_entry_path(raw: &Path) -> Option<PathBuf> {
    let mut safe = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => safe.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if safe.as_os_str().is_empty() {
        None
    } else {
        Some(safe)
    }
}

fn extract_tar_gz(archive: &Path, destination: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.into_owned();
        let Some(safe) = sanitize_entry_path(&raw) else {
            warn!(entry = %raw.display(), "skipping archive entry with unsafe path");
            continue;
        };

        let target = destination.join(safe);
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if !kind.is_file() {
            // Symlinks and specials could point outside the destination.
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

fn extract_zip(archive: &Path, destination: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let raw = PathBuf::from(entry.name());
        let Some(safe) = sanitize_entry_path(&raw) else {
            warn!(entry = %raw.display(), "skipping archive entry with unsafe path");
            continue;
        };

        let target = destination.join(safe);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            // Write the name into the header bytes directly; set_path would
            // refuse the traversal names this test needs.
            let mut header = tar::Header::new_gnu();
            header.as_mut_bytes()[..name.len()].copy_from_slice(name.as_bytes());
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(name.to_string(), options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn sanitize_rejects_traversal_and_absolute_paths() {
        assert!(sanitize_entry_path(Path::new("../../etc/passwd")).is_none());
        assert!(sanitize_entry_path(Path::new("/etc/passwd")).is_none());
        assert!(sanitize_entry_path(Path::new("a/../../b")).is_none());
        assert_eq!(
            sanitize_entry_path(Path::new("./src/lib.rs")),
            Some(PathBuf::from("src/lib.rs"))
        );
    }

    #[test]
    fn extracts_tar_gz_contents() {
        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("repo.tar.gz");
        fs::write(
            &archive,
            build_tar_gz(&[("repo/src/main.rs", "fn main() {}\n")]),
        )
        .unwrap();

        let dest = scratch.path().join("out");
        extract(&archive, ArchiveFormat::TarGz, &dest).unwrap();

        let extracted = fs::read_to_string(dest.join("repo/src/main.rs")).unwrap();
        assert_eq!(extracted, "fn main() {}\n");
    }

    #[test]
    fn tar_traversal_entry_is_skipped() {
        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("repo.tar.gz");
        fs::write(
            &archive,
            build_tar_gz(&[("../escape.txt", "boom"), ("safe.txt", "ok")]),
        )
        .unwrap();

        let dest = scratch.path().join("out");
        extract(&archive, ArchiveFormat::TarGz, &dest).unwrap();

        assert!(!scratch.path().join("escape.txt").exists());
        assert_eq!(fs::read_to_string(dest.join("safe.txt")).unwrap(), "ok");
    }

    #[test]
    fn zip_traversal_entry_is_skipped() {
        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("repo.zip");
        fs::write(
            &archive,
            build_zip(&[("../../etc/passwd", "boom"), ("readme.txt", "ok")]),
        )
        .unwrap();

        let dest = scratch.path().join("out");
        extract(&archive, ArchiveFormat::Zip, &dest).unwrap();

        // Nothing named passwd may exist anywhere under the scratch root.
        let stray: Vec<_> = walkdir::WalkDir::new(scratch.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() == "passwd")
            .collect();
        assert!(stray.is_empty());
        assert_eq!(fs::read_to_string(dest.join("readme.txt")).unwrap(), "ok");
    }

    #[test]
    fn zip_absolute_entry_is_skipped() {
        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("repo.zip");
        fs::write(&archive, build_zip(&[("/abs.txt", "boom")])).unwrap();

        let dest = scratch.path().join("out");
        extract(&archive, ArchiveFormat::Zip, &dest).unwrap();

        assert!(!dest.join("abs.txt").exists());
        assert!(!Path::new("/abs.txt").exists());
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("repo.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let dest = scratch.path().join("out");
        assert!(extract(&archive, ArchiveFormat::TarGz, &dest).is_err());
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("x/repo.tar.gz")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("repo.zip")).unwrap(),
            ArchiveFormat::Zip
        );
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("repo.rar")),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }
}
