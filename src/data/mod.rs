/// The AI database: per class/track AI levels and lap times
pub mod database;
/// Player best lap times per class/track
pub mod player_times;

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ErrorKind;

/// Host-provided file access. The core only ever reads a whole file as text
/// or replaces a whole file with text.
pub trait TextLoader {
    fn read_text(&self, path: &Path) -> Result<String, ErrorKind>;
    fn write_text(&self, path: &Path, text: &str) -> Result<(), ErrorKind>;
}

/// [`TextLoader`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl TextLoader for FsLoader {
    fn read_text(&self, path: &Path) -> Result<String, ErrorKind> {
        debug!("reading {}", path.display());
        Ok(fs::read_to_string(path)?)
    }

    /// Writes to a sibling temp file first and renames it over the target,
    /// so a failure never leaves a truncated file behind.
    fn write_text(&self, path: &Path, text: &str) -> Result<(), ErrorKind> {
        debug!("writing {}", path.display());
        let tmp_path = temp_path_for(path);
        let result = fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(text.as_bytes())?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&tmp_path, path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(ErrorKind::IoError(e));
        }
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// [`TextLoader`] whose reads and writes are delegated to closures, for hosts
/// that obtain files some other way (dialogs, uploads, in-memory fixtures).
pub struct TextLoaderWithCallback<R, W> {
    read: R,
    write: W,
}

impl<R, W> TextLoaderWithCallback<R, W>
where
    R: Fn(&Path) -> Result<String, ErrorKind>,
    W: Fn(&Path, &str) -> Result<(), ErrorKind>,
{
    pub fn new(read: R, write: W) -> Self {
        Self { read, write }
    }
}

impl<R, W> TextLoader for TextLoaderWithCallback<R, W>
where
    R: Fn(&Path) -> Result<String, ErrorKind>,
    W: Fn(&Path, &str) -> Result<(), ErrorKind>,
{
    fn read_text(&self, path: &Path) -> Result<String, ErrorKind> {
        (self.read)(path)
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<(), ErrorKind> {
        (self.write)(path, text)
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aiadaptation.xml");
        FsLoader.write_text(&path, "<AiAdaptation/>").unwrap();
        assert_eq!(FsLoader.read_text(&path).unwrap(), "<AiAdaptation/>");

        FsLoader.write_text(&path, "replaced").unwrap();
        assert_eq!(FsLoader.read_text(&path).unwrap(), "replaced");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn fs_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsLoader.read_text(&dir.path().join("nope.xml")).unwrap_err();
        assert!(matches!(err, ErrorKind::IoError(_)));
    }

    #[test]
    fn fs_failed_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.xml");
        assert!(FsLoader.write_text(&path, "data").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn callback_loader() {
        let files = RefCell::new(HashMap::new());
        let loader = TextLoaderWithCallback::new(
            |path: &Path| {
                files
                    .borrow()
                    .get(path)
                    .cloned()
                    .ok_or_else(|| ErrorKind::IoError(std::io::ErrorKind::NotFound.into()))
            },
            |path: &Path, text: &str| {
                files.borrow_mut().insert(path.to_path_buf(), text.to_string());
                Ok(())
            },
        );

        let path = Path::new("memory.xml");
        assert!(loader.read_text(path).is_err());
        loader.write_text(path, "hello").unwrap();
        assert_eq!(loader.read_text(path).unwrap(), "hello");
    }
}
