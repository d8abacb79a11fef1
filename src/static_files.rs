//! Static file serving from a root directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, error};

use crate::http::{Headers, Reply, StatusCode};

/// Body of the `404` reply for a missing static file.
pub const FILE_NOT_FOUND_MESSAGE: &str = "File not found";

/// Reads files below a root directory.
///
/// Relative paths may not leave the root: any `..`, root or prefix component
/// is treated as a missing file.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `relative` onto the root, or `None` if it would escape it.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in relative.as_ref().components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }

    /// Guesses a MIME type from the file extension.
    pub fn content_type(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            "xml" => "application/xml",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }

    /// Reads `relative` and returns its bytes and content type.
    ///
    /// # Errors
    ///
    /// `NotFound` for paths outside the root, missing files and directories;
    /// any other I/O error as returned by the filesystem.
    pub fn load(&self, relative: impl AsRef<Path>) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .resolve(relative)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }

    /// Answers with the file contents, `404 File not found`, or `500` on a read failure.
    pub fn serve(&self, relative: impl AsRef<Path>) -> Reply {
        let relative = relative.as_ref();
        match self.load(relative) {
            Ok((bytes, content_type)) => Reply::from((
                bytes,
                StatusCode::OK,
                Headers::from([("Content-Type", content_type)]),
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %relative.display(), "static file not found");
                Reply::from((FILE_NOT_FOUND_MESSAGE, StatusCode::NOT_FOUND))
            }
            Err(e) => {
                error!(path = %relative.display(), error = %e, "failed to read static file");
                Reply::from(("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}
