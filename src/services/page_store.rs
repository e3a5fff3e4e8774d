use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::errors::WikiError;
use crate::types::Page;
use crate::utils::escape_html;

const PAGE_EXTENSION: &str = "md";

/// Persistent storage for pages.
///
/// The index only needs `list_titles`, so storage backends other than a
/// directory of files can be swapped in without touching it.
pub trait PageStore: Send + Sync {
    /// Load a page. Any failure to read it is reported as `NotFound`.
    fn load(&self, title: &str) -> Result<Page, WikiError>;

    /// Create or overwrite a page.
    fn save(&self, page: &Page) -> Result<(), WikiError>;

    /// Titles of every stored page, in no particular order.
    fn list_titles(&self) -> Result<Vec<String>, WikiError>;
}

/// Pages stored as `<title>.md` files in a single directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!("Creating FileStore with root directory: {:?}", root);
        Self { root }
    }

    /// Path of the file backing `title`
    pub fn page_path(&self, title: &str) -> Result<PathBuf, WikiError> {
        if title.is_empty()
            || title == "."
            || title == ".."
            || title.contains(['/', '\\'])
        {
            return Err(WikiError::InvalidTitle(title.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", escape_html(title), PAGE_EXTENSION)))
    }
}

impl PageStore for FileStore {
    fn load(&self, title: &str) -> Result<Page, WikiError> {
        let path = self.page_path(title)?;
        match fs::read(&path) {
            Ok(body) => {
                debug!("Read page {:?}, {} bytes", path, body.len());
                Ok(Page { title: title.to_string(), body })
            }
            Err(e) => {
                info!("Missing file {:?}: {}", path, e);
                Err(WikiError::NotFound)
            }
        }
    }

    fn save(&self, page: &Page) -> Result<(), WikiError> {
        let path = self.page_path(&page.title)?;
        write_private(&path, &page.body).map_err(|e| {
            error!("Saving {:?} failed: {}", path, e);
            WikiError::Io(e)
        })?;
        info!("Saved page {:?}, {} bytes", path, page.body.len());
        Ok(())
    }

    fn list_titles(&self) -> Result<Vec<String>, WikiError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            warn!("Failed to read directory {:?}: {}", self.root, e);
            WikiError::Io(e)
        })?;

        let mut titles = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            // Follows symlinks, so linked pages are listed too
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(OsStr::to_str) != Some(PAGE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
                titles.push(stem.to_string());
            }
        }
        debug!("Listed {:?}, found {} pages", self.root, titles.len());
        Ok(titles)
    }
}

/// Create or truncate `path`, readable only by the owner
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.flush()
}
