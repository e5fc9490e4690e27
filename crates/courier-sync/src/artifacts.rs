use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use courier_db::models::{ReplyRow, SubmissionRow};
use courier_types::ArtifactKind;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ItemFailure, Result, SyncError};

const COMPRESSED_SUFFIX: &str = ".gz";
const CHUNK_SIZE: usize = 4096;

/// A row that owns files in the data directory. Draft replies never do.
pub trait OnDisk {
    fn kind(&self) -> ArtifactKind;
    fn uuid(&self) -> &str;
    fn filename(&self) -> &str;
}

impl OnDisk for SubmissionRow {
    fn kind(&self) -> ArtifactKind {
        self.kind.artifact_kind()
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

impl OnDisk for ReplyRow {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Reply
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

/// Renames and removes artifact files in the data directory.
///
/// Encrypted artifacts are stored as `<counter>-<slug>-<kind>[.gz].gpg`; the
/// decrypted sibling drops the encryption suffix and, for compressed
/// documents, the compression suffix as well. Every operation tolerates files
/// that are already gone, since the download pipeline may be working on the
/// same directory.
pub struct Artifacts<'a> {
    dir: &'a Path,
}

impl<'a> Artifacts<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self { dir }
    }

    /// Path of a file inside the data directory. Names that could escape it
    /// are refused.
    pub fn path(&self, name: &str) -> io::Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing artifact name {:?}", name),
            ));
        }
        Ok(self.dir.join(name))
    }

    /// Path of the decrypted sibling of an encrypted artifact.
    pub fn decrypted_path(&self, filename: &str) -> io::Result<PathBuf> {
        self.path(decrypted_name(filename))
    }

    /// Moves the decrypted sibling of `old_filename` to the decrypted name of
    /// `new_filename`. Returns whether anything was moved; a missing source
    /// file means there is nothing to rename yet.
    pub fn rename(&self, old_filename: &str, new_filename: &str) -> io::Result<bool> {
        let from = self.decrypted_path(old_filename)?;
        let to = self.decrypted_path(new_filename)?;
        if from == to {
            return Ok(false);
        }

        match fs::rename(&from, &to) {
            Ok(()) => {
                info!("Renamed {} to {}", from.display(), to.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Nothing to rename at {}", from.display());
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes every name the artifact can have at any processing stage.
    /// Stops at the first error other than "not found".
    pub fn delete(&self, item: &dyn OnDisk) -> std::result::Result<(), ItemFailure> {
        for name in stage_names(item.filename()) {
            let path = self.path(name).map_err(|source| ItemFailure {
                kind: item.kind().as_str(),
                uuid: item.uuid().to_string(),
                path: self.dir.join(name),
                source,
            })?;

            match fs::remove_file(&path) {
                Ok(()) => debug!("Deleted {} for {} {}", path.display(), item.kind(), item.uuid()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ItemFailure {
                        kind: item.kind().as_str(),
                        uuid: item.uuid().to_string(),
                        path,
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

/// `1-foo-doc.gz.gpg` -> `1-foo-doc`, `1-foo-msg.gpg` -> `1-foo-msg`.
pub fn decrypted_name(filename: &str) -> &str {
    let stem = strip_extension(filename);
    stem.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(stem)
}

/// The filename followed by each shorter name left by peeling one extension
/// at a time: `a.gz.gpg`, `a.gz`, `a`.
pub fn stage_names(filename: &str) -> Vec<&str> {
    let mut names = vec![filename];
    let mut rest = filename;
    loop {
        let stripped = strip_extension(rest);
        if stripped == rest {
            break;
        }
        names.push(stripped);
        rest = stripped;
    }
    names
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Leading `<counter>-` of an artifact filename.
pub fn parse_file_counter(filename: &str) -> Option<i64> {
    let (counter, _) = filename.split_once('-')?;
    counter.parse().ok()
}

/// Checks a downloaded file against the server's etag.
///
/// Only `sha256:<hex>` etags are verified; a missing etag or another algorithm
/// passes.
pub fn check_file_integrity(path: &Path, etag: &str) -> io::Result<bool> {
    if etag.is_empty() {
        debug!("No etag, skipping integrity check for {}", path.display());
        return Ok(true);
    }

    let Some(("sha256", expected)) = etag.split_once(':') else {
        debug!("Unknown etag {:?}, skipping integrity check for {}", etag, path.display());
        return Ok(true);
    };

    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let actual = hex::encode(hasher.finalize());
    if actual != expected {
        warn!("Checksum mismatch for {}: expected {}, got {}", path.display(), expected, actual);
    }
    Ok(actual == expected)
}

/// Creates the data directory owner-only, refusing an existing one that
/// group or other can access.
pub fn prepare_data_dir(dir: &Path) -> Result<()> {
    if !dir.is_absolute() {
        return Err(SyncError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("data directory must be absolute: {}", dir.display()),
        )));
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dir)?.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(SyncError::UnsafePermissions {
                path: dir.to_path_buf(),
                mode,
            });
        }
    }

    info!("Data directory: {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::SubmissionKind;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"I am test content").unwrap();
        path
    }

    fn message(filename: &str) -> SubmissionRow {
        SubmissionRow {
            id: 1,
            uuid: "test-uuid".into(),
            kind: SubmissionKind::Message,
            source_id: 1,
            file_counter: 1,
            filename: filename.into(),
            size: 1,
            download_url: String::new(),
            is_downloaded: Some(true),
            is_decrypted: None,
            is_read: false,
            content: None,
        }
    }

    #[test]
    fn decrypted_names() {
        assert_eq!(decrypted_name("1-foo-msg.gpg"), "1-foo-msg");
        assert_eq!(decrypted_name("1-foo-doc.gz.gpg"), "1-foo-doc");
        assert_eq!(decrypted_name("foo.txt"), "foo");
        assert_eq!(decrypted_name("plain"), "plain");
    }

    #[test]
    fn stage_names_peel_each_extension() {
        assert_eq!(
            stage_names("1-foo-doc.gz.gpg"),
            vec!["1-foo-doc.gz.gpg", "1-foo-doc.gz", "1-foo-doc"]
        );
        assert_eq!(stage_names("1-foo-reply.gpg"), vec!["1-foo-reply.gpg", "1-foo-reply"]);
    }

    #[test]
    fn counters_come_from_the_prefix() {
        assert_eq!(parse_file_counter("12-foo-msg.gpg"), Some(12));
        assert_eq!(parse_file_counter("foo-msg.gpg"), None);
        assert_eq!(parse_file_counter("nodash"), None);
    }

    #[test]
    fn rename_moves_decrypted_sibling() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo"), b"bar").unwrap();

        let renamed = Artifacts::new(dir.path()).rename("foo.txt", "baz.txt").unwrap();

        assert!(renamed);
        assert_eq!(fs::read(dir.path().join("baz")).unwrap(), b"bar");
        assert!(!dir.path().join("foo").exists());
    }

    #[test]
    fn rename_of_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let renamed = Artifacts::new(dir.path()).rename("foo.txt", "bar.txt").unwrap();
        assert!(!renamed);
        assert!(!dir.path().join("bar").exists());
    }

    #[test]
    fn delete_removes_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let paths = [
            touch(dir.path(), "1-foo-doc.gz.gpg"),
            touch(dir.path(), "1-foo-doc.gz"),
            touch(dir.path(), "1-foo-doc"),
        ];
        let unrelated = touch(dir.path(), "1-foo-doc2");

        Artifacts::new(dir.path()).delete(&message("1-foo-doc.gz.gpg")).unwrap();

        for path in &paths {
            assert!(!path.exists());
        }
        assert!(unrelated.exists());
    }

    #[test]
    fn delete_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        Artifacts::new(dir.path()).delete(&message("1-gone-msg.gpg")).unwrap();
        // twice: the second pass finds nothing at all
        Artifacts::new(dir.path()).delete(&message("1-gone-msg.gpg")).unwrap();
    }

    #[test]
    fn delete_reports_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where a file is expected cannot be removed with remove_file
        fs::create_dir(dir.path().join("1-stuck-msg")).unwrap();

        let failure = Artifacts::new(dir.path()).delete(&message("1-stuck-msg.gpg")).unwrap_err();

        assert_eq!(failure.uuid, "test-uuid");
        assert_eq!(failure.path, dir.path().join("1-stuck-msg"));
    }

    #[test]
    fn names_cannot_escape_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = Artifacts::new(dir.path());
        assert!(artifacts.path("../etc/passwd").is_err());
        assert!(artifacts.path("..").is_err());
        assert!(artifacts.rename("1-a-msg.gpg", "../1-b-msg.gpg").is_err());
    }

    #[test]
    fn integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, b"abc").unwrap();
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

        assert!(check_file_integrity(&path, &format!("sha256:{}", digest)).unwrap());
        assert!(!check_file_integrity(&path, "sha256:00").unwrap());
        assert!(check_file_integrity(&path, "").unwrap());
        assert!(check_file_integrity(&path, "md5:whatever").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn data_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        prepare_data_dir(&data).unwrap();
        assert_eq!(fs::metadata(&data).unwrap().permissions().mode() & 0o777, 0o700);

        fs::set_permissions(&data, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(
            prepare_data_dir(&data),
            Err(SyncError::UnsafePermissions { mode: 0o755, .. })
        ));

        assert!(prepare_data_dir(Path::new("relative/data")).is_err());
    }
}
