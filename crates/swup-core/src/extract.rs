//! Archive extraction module
//!
//! Handles the two packagings toolchains ship in: `tar.gz` archives on
//! Linux and `.pkg` installer packages on macOS.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use flate2::read::GzDecoder;
use swup_schema::PackageFormat;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("`{tool}` exited with {status}")]
    Tool {
        tool: &'static str,
        status: std::process::ExitStatus,
    },
}

/// Name of the archive embedded in a macOS installer package.
pub const PAYLOAD_NAME: &str = "Payload";

/// Extract `archive` into `dest_dir` according to `format`.
///
/// Returns the toolchain root inside `dest_dir`.
///
/// # Errors
///
/// Returns an [`ExtractError`] if the archive is malformed or an external
/// tool fails.
pub fn extract(format: PackageFormat, archive: &Path, dest_dir: &Path) -> Result<PathBuf, ExtractError> {
    match format {
        PackageFormat::Archive => {
            extract_tar_gz(archive, dest_dir)?;
        }
        PackageFormat::InstallerPackage => extract_pkg(archive, dest_dir)?,
    }
    Ok(locate_toolchain_root(dest_dir)?)
}

/// Extract a tar.gz archive to a destination directory.
///
/// Returns the number of entries unpacked.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(decoder);
    archive.set_preserve_permissions(true);
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        // unpack_in refuses entries that would escape dest_dir
        if !entry.unpack_in(dest_dir)? {
            let path = entry.path()?.display().to_string();
            return Err(ExtractError::Archive(format!("Invalid path in archive: {path}")));
        }
        count += 1;
    }

    Ok(count)
}

/// Extract a macOS installer package.
///
/// Two stages: `xar` unpacks the package container into a scratch
/// directory, then the embedded `Payload` is unpacked into `dest_dir` with
/// the system `tar` (bsdtar reads the gzip'd cpio payload natively).
pub fn extract_pkg(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let scratch = tempfile::Builder::new().prefix("swup-pkg-").tempdir()?;

    let status = Command::new("xar")
        .arg("-xf")
        .arg(archive_path)
        .arg("-C")
        .arg(scratch.path())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        return Err(ExtractError::Tool { tool: "xar", status });
    }

    unpack_payload(scratch.path(), dest_dir)
}

/// Unpack the shallowest `Payload` under an expanded package into `dest_dir`.
fn unpack_payload(expanded: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let payload = find_payload(expanded)
        .ok_or_else(|| ExtractError::Archive("No Payload found in pkg".to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let status = Command::new("tar")
        .arg("-xf")
        .arg(&payload)
        .arg("-C")
        .arg(dest_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        return Err(ExtractError::Tool { tool: "tar", status });
    }

    Ok(())
}

/// First file named `Payload` under `dir`, shallowest first.
fn find_payload(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == PAYLOAD_NAME)
        .min_by_key(walkdir::DirEntry::depth)
        .map(walkdir::DirEntry::into_path)
}

/// Find the toolchain root inside an extraction directory.
///
/// The root is the directory containing `usr/`. Archives usually wrap it in
/// one version-named directory (`swift-wasm-5.8.0-RELEASE/usr/bin/...`); when
/// the extraction holds exactly one visible directory we descend into it.
pub fn locate_toolchain_root(dir: &Path) -> io::Result<PathBuf> {
    if dir.join("usr").is_dir() {
        return Ok(dir.to_path_buf());
    }

    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(Result::ok).collect();
    // Filter out hidden files (like .DS_Store)
    entries.retain(|e| !e.file_name().to_string_lossy().starts_with('.'));

    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries[0].path());
    }

    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    fn write_tarball(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_nested_tarball_finds_root() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("t.tar.gz");
        write_tarball(
            &archive,
            &[
                ("swift-wasm-5.8.0-RELEASE/usr/bin/swift", b"#!/bin/sh\n"),
                ("swift-wasm-5.8.0-RELEASE/usr/lib/libx.so", b"lib"),
            ],
        );

        let dest = dir.path().join("out");
        let root = extract(PackageFormat::Archive, &archive, &dest).unwrap();
        assert_eq!(root, dest.join("swift-wasm-5.8.0-RELEASE"));
        assert!(root.join("usr/bin/swift").is_file());
    }

    #[test]
    fn test_extract_flat_tarball_root_is_dest() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("t.tar.gz");
        write_tarball(&archive, &[("usr/bin/swift", b"x")]);

        let dest = dir.path().join("out");
        assert_eq!(extract_tar_gz(&archive, &dest).unwrap(), 1);
        assert_eq!(locate_toolchain_root(&dest).unwrap(), dest);
    }

    #[test]
    fn test_corrupt_tarball_errors() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("bad.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        assert!(extract_tar_gz(&archive, &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_locate_root_ignores_hidden_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("swift-wasm-x/usr")).unwrap();
        fs::write(dir.path().join(".DS_Store"), b"junk").unwrap();
        assert_eq!(
            locate_toolchain_root(dir.path()).unwrap(),
            dir.path().join("swift-wasm-x")
        );
    }

    #[test]
    fn test_find_payload_prefers_shallow() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a.pkg/deeper")).unwrap();
        fs::write(dir.path().join("a.pkg/Payload"), b"p").unwrap();
        fs::write(dir.path().join("a.pkg/deeper/Payload"), b"q").unwrap();
        assert_eq!(find_payload(dir.path()), Some(dir.path().join("a.pkg/Payload")));
        assert_eq!(find_payload(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_unpack_payload_extracts_into_dest() {
        let dir = tempdir().unwrap();
        let expanded = dir.path().join("expanded");
        fs::create_dir_all(expanded.join("swift.pkg")).unwrap();
        write_tarball(
            &expanded.join("swift.pkg").join(PAYLOAD_NAME),
            &[("usr/bin/swift", b"#!/bin/sh\n")],
        );

        let dest = dir.path().join("out");
        unpack_payload(&expanded, &dest).unwrap();
        assert!(dest.join("usr/bin/swift").is_file());
        assert_eq!(locate_toolchain_root(&dest).unwrap(), dest);
    }

    #[test]
    fn test_unpack_payload_without_payload_is_archive_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("swift.pkg")).unwrap();
        fs::write(dir.path().join("swift.pkg/Bom"), b"bom").unwrap();

        let dest = dir.path().join("out");
        let err = unpack_payload(dir.path(), &dest).unwrap_err();
        assert!(matches!(err, ExtractError::Archive(ref m) if m.contains("Payload")));
        assert!(!dest.exists());
    }

    #[test]
    fn test_corrupt_payload_reports_tar_failure() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PAYLOAD_NAME), b"not an archive").unwrap();
        let err = unpack_payload(dir.path(), &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ExtractError::Tool { tool: "tar", .. }), "{err}");
    }

    #[test]
    fn test_extract_pkg_rejects_non_package() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("bogus.pkg");
        fs::write(&pkg, b"not a xar container").unwrap();
        // Missing xar surfaces as Io, a present one as a Tool failure.
        assert!(extract(PackageFormat::InstallerPackage, &pkg, &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_extract_pkg_round_trip() {
        let xar_available = Command::new("xar")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success());
        if !xar_available {
            return;
        }

        let dir = tempdir().unwrap();
        let contents = dir.path().join("contents");
        fs::create_dir_all(contents.join("swift.pkg")).unwrap();
        write_tarball(
            &contents.join("swift.pkg").join(PAYLOAD_NAME),
            &[("swift-wasm-5.8.0-RELEASE/usr/bin/swift", b"x")],
        );
        let pkg = dir.path().join("swift.pkg");
        let status = Command::new("xar")
            .arg("-cf")
            .arg(&pkg)
            .arg("-C")
            .arg(&contents)
            .arg("swift.pkg")
            .status()
            .unwrap();
        assert!(status.success());

        let dest = dir.path().join("out");
        let root = extract(PackageFormat::InstallerPackage, &pkg, &dest).unwrap();
        assert_eq!(root, dest.join("swift-wasm-5.8.0-RELEASE"));
        assert!(root.join("usr/bin/swift").is_file());
    }
}
