use crate::container::{ContainerReader, SubContainer};
use crate::signal::CancelToken;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Progress callback receiving `(processed, total)`.
pub type ProgressFn = dyn FnMut(usize, usize) + Send;

/// A file that produced at least one sub-container. The containers are
/// dropped together with this value, before the next file is loaded.
#[derive(Debug)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub index: usize,
    pub containers: Vec<SubContainer>,
}

/// Lazily loads each input file through a [`ContainerReader`], skipping files
/// without sub-containers.
pub struct FileScanner<'a, R: ContainerReader + ?Sized> {
    files: &'a [PathBuf],
    reader: &'a mut R,
    cancel: &'a CancelToken,
    progress: Option<&'a mut (dyn FnMut(usize, usize) + 'a)>,
    position: usize,
}

impl<'a, R: ContainerReader + ?Sized> FileScanner<'a, R> {
    pub fn new(files: &'a [PathBuf], reader: &'a mut R, cancel: &'a CancelToken) -> Self {
        Self {
            files,
            reader,
            cancel,
            progress: None,
            position: 0,
        }
    }

    pub fn with_progress(mut self, progress: &'a mut (dyn FnMut(usize, usize) + 'a)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }
}

impl<R: ContainerReader + ?Sized> Iterator for FileScanner<'_, R> {
    type Item = ScannedFile;

    fn next(&mut self) -> Option<ScannedFile> {
        let total = self.files.len();
        while self.position < total {
            if self.cancel.is_cancelled() {
                return None;
            }

            let index = self.position;
            self.position += 1;
            let path = &self.files[index];

            match self.reader.load(path) {
                Ok(containers) if !containers.is_empty() => {
                    info!("[{}/{}] Processed {}", index + 1, total, display_name(path));
                    if let Some(progress) = self.progress.as_mut() {
                        progress(index + 1, total);
                    }
                    return Some(ScannedFile {
                        path: path.clone(),
                        index,
                        containers,
                    });
                }
                Ok(_) => debug!("{} holds no containers, skipping", path.display()),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        None
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
