//! Caller-owned build session: the location map in use, the offsets handed
//! out from it and the cancellation flag shared with whoever drives a build.

use crate::catalog::{AssetCatalog, CatalogBuilder};
use crate::config::{CatalogRequest, Config};
use crate::container::ContainerReader;
use crate::errors::{MapError, Result};
use crate::export::{ExportHandle, spawn_export};
use crate::fixup::{ResourceIndex, update_containers};
use crate::location::{LocationEntry, LocationMap, OffsetRegistry};
use crate::scanner::{FileScanner, ProgressFn, ScannedFile};
use crate::signal::CancelToken;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct MapSession {
    config: Config,
    base_folder: PathBuf,
    location_map: LocationMap,
    offsets: OffsetRegistry,
    cancel: CancelToken,
    progress: Option<Box<ProgressFn>>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MapSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            base_folder: PathBuf::new(),
            location_map: LocationMap::default(),
            offsets: OffsetRegistry::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    pub fn location_map(&self) -> &LocationMap {
        &self.location_map
    }

    pub fn offsets(&self) -> &OffsetRegistry {
        &self.offsets
    }

    /// Installs a `(processed, total)` callback invoked after each scanned file.
    pub fn set_progress(&mut self, progress: impl FnMut(usize, usize) + Send + 'static) {
        self.progress = Some(Box::new(progress));
    }

    /// Handle that aborts the build currently running on this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn map_path(&self, map_name: &str) -> PathBuf {
        self.config.map_path(map_name)
    }

    /// Names of the location maps stored under the maps root, sorted. The
    /// directory is created if missing.
    pub fn list_maps(&self) -> Result<Vec<String>> {
        let root = &self.config.maps_root;
        std::fs::create_dir_all(root)?;

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "bin") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Scans `files`, records where every sub-container lives and persists
    /// the sorted map as `<maps_root>/<map_name>.bin`.
    ///
    /// Returns `false` if the build failed or was cancelled; nothing is
    /// written in that case.
    pub fn build_location_map(
        &mut self,
        files: &[PathBuf],
        map_name: &str,
        base_folder: &Path,
        reader: &mut dyn ContainerReader,
    ) -> bool {
        info!("Building CABMap...");
        self.location_map = LocationMap::default();

        let mut map = LocationMap::new(base_folder);
        let result = self.scan(files, reader, |file, cancel| {
            map.add_file(&file.path, &file.containers, cancel)
        });
        let result = result.and_then(|()| self.persist_location_map(map, map_name));
        settle(result, "CABMap").is_some()
    }

    /// Loads `<maps_root>/<map_name>.bin`. A missing or damaged map leaves the
    /// session with an empty one.
    pub fn load_location_map(&mut self, map_name: &str) -> bool {
        info!("Loading {}", map_name);
        match LocationMap::load(&self.map_path(map_name)) {
            Ok(map) => {
                self.base_folder = map.base_folder().to_path_buf();
                self.location_map = map;
                info!("Loaded {} !!", map_name);
                true
            }
            Err(e) => {
                warn!("{} was not loaded, {}", map_name, e);
                self.location_map = LocationMap::default();
                false
            }
        }
    }

    /// Scans `files` into a catalog and exports it in the background.
    ///
    /// Returns `None` if the build failed or was cancelled; the request's
    /// completion signal is still set so nobody waits forever.
    pub fn build_asset_map(
        &mut self,
        files: &[PathBuf],
        map_name: &str,
        request: CatalogRequest,
        reader: &mut dyn ContainerReader,
        resources: &dyn ResourceIndex,
    ) -> Option<ExportHandle> {
        info!("Building AssetMap...");
        let mut builder = self.catalog_builder(&request);
        let result = self.scan(files, reader, |file, cancel| {
            builder.add_file(&file.path, &mut file.containers, cancel)
        });
        let result = result.and_then(|()| {
            let catalog = finish_catalog(builder, resources);
            export(catalog, map_name, &request)
        });
        finish_request(settle(result, "AssetMap"), &request)
    }

    /// Builds the location map and the catalog from a single pass over
    /// `files`, then persists the map and exports the catalog.
    pub fn build_both(
        &mut self,
        files: &[PathBuf],
        map_name: &str,
        base_folder: &Path,
        request: CatalogRequest,
        reader: &mut dyn ContainerReader,
        resources: &dyn ResourceIndex,
    ) -> Option<ExportHandle> {
        info!("Building Both...");
        self.location_map = LocationMap::default();

        let mut map = LocationMap::new(base_folder);
        let mut builder = self.catalog_builder(&request);
        let result = self.scan(files, reader, |file, cancel| {
            map.add_file(&file.path, &file.containers, cancel)?;
            builder.add_file(&file.path, &mut file.containers, cancel)
        });
        let result = result
            .and_then(|()| self.persist_location_map(map, map_name))
            .and_then(|()| {
                let catalog = finish_catalog(builder, resources);
                export(catalog, map_name, &request)
            });
        finish_request(settle(result, "AssetMap"), &request)
    }

    /// Resolves `identifier` to the file holding it and remembers the offset
    /// of its sub-container for that file.
    pub fn try_add(&mut self, identifier: &str) -> Option<PathBuf> {
        let entry = self.location_map.get(identifier)?;
        let path = self.base_folder.join(&entry.path);
        self.offsets.record(path.clone(), entry.offset);
        Some(path)
    }

    pub fn try_get(&self, path: &Path) -> Option<Vec<i64>> {
        self.offsets.offsets(path)
    }

    pub fn entry(&self, identifier: &str) -> Option<&LocationEntry> {
        self.location_map.get(identifier)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.offsets.remove(path)
    }

    pub fn clear_offsets(&mut self) {
        self.offsets.clear();
    }

    /// Forgets the loaded map and recorded offsets and re-arms cancellation.
    pub fn clear(&mut self) {
        self.location_map = LocationMap::default();
        self.offsets.clear();
        self.base_folder = PathBuf::new();
        self.cancel = CancelToken::new();
    }

    fn catalog_builder(&self, request: &CatalogRequest) -> CatalogBuilder {
        CatalogBuilder::new(self.config.game, request.filters.clone(), self.config.minimal)
    }

    fn scan<F>(
        &mut self,
        files: &[PathBuf],
        reader: &mut dyn ContainerReader,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(&mut ScannedFile, &CancelToken) -> Result<()>,
    {
        let cancel = &self.cancel;
        let mut scanner = FileScanner::new(files, reader, cancel);
        if let Some(progress) = self.progress.as_deref_mut() {
            scanner = scanner.with_progress(progress);
        }
        for mut file in scanner {
            visit(&mut file, cancel)?;
        }
        if cancel.is_cancelled() {
            return Err(MapError::Cancelled);
        }
        Ok(())
    }

    fn persist_location_map(&mut self, mut map: LocationMap, map_name: &str) -> Result<()> {
        map.sort();
        map.save(&self.map_path(map_name))?;
        info!("CABMap build successfully !! {} collisions found", map.collisions());
        self.base_folder = map.base_folder().to_path_buf();
        self.location_map = map;
        Ok(())
    }
}

fn finish_catalog(builder: CatalogBuilder, resources: &dyn ResourceIndex) -> AssetCatalog {
    if builder.failures() > 0 {
        warn!("{} objects could not be read and were skipped", builder.failures());
    }
    let mut catalog = builder.finish();
    update_containers(&mut catalog, resources);
    catalog
}

fn export(catalog: AssetCatalog, map_name: &str, request: &CatalogRequest) -> Result<ExportHandle> {
    spawn_export(
        catalog,
        map_name,
        &request.save_path,
        request.format,
        request.completion.clone(),
    )
}

fn settle<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(MapError::Cancelled) => {
            info!("{} build has been cancelled", what);
            None
        }
        Err(e) => {
            warn!("{} was not built, {}", what, e);
            None
        }
    }
}

fn finish_request(handle: Option<ExportHandle>, request: &CatalogRequest) -> Option<ExportHandle> {
    if handle.is_none() {
        if let Some(signal) = &request.completion {
            signal.set();
        }
    }
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SubContainer;

    fn session(root: &Path) -> MapSession {
        MapSession::new(Config {
            maps_root: root.to_path_buf(),
            ..Config::default()
        })
    }

    #[test]
    fn clear_rearms_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let token = session.cancel_token();
        token.cancel();

        session.clear();
        assert!(token.is_cancelled());
        assert!(!session.cancel_token().is_cancelled());
        assert!(session.location_map().is_empty());
        assert_eq!(session.base_folder(), Path::new(""));
    }

    #[test]
    fn list_maps_creates_root_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Maps");
        let session = session(&root);
        assert!(session.list_maps().unwrap().is_empty());
        assert!(root.is_dir());

        std::fs::write(root.join("SR.bin"), b"").unwrap();
        std::fs::write(root.join("GI.bin"), b"").unwrap();
        std::fs::write(root.join("notes.txt"), b"").unwrap();
        assert_eq!(session.list_maps().unwrap(), vec!["GI", "SR"]);
    }

    #[test]
    fn progress_is_reported() {
        use std::sync::{Arc, Mutex};

        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_progress(move |done, total| sink.lock().unwrap().push((done, total)));

        let files = vec![PathBuf::from("a.blk"), PathBuf::from("b.blk")];
        let mut reader = |path: &Path| -> Result<Vec<SubContainer>> {
            Ok(vec![SubContainer::new(path.to_string_lossy(), 0)])
        };
        assert!(session.build_location_map(&files, "test", Path::new(""), &mut reader));
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }
}
