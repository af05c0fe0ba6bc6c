//! Asset catalog construction.
//!
//! Objects are read once, in scan order. Whatever cannot be decided while an
//! object is read (animator names, binary payload keys, bundle containers) is
//! recorded as a deferral against a pointer and settled once every object of
//! the file has been seen. Pointers never leave the file they were loaded
//! with, so each file is resolved on its own and its scratch state dropped.

use crate::class_id::{ClassIdType, GameType};
use crate::container::{PPtr, SubContainer};
use crate::dispatch::{Extracted, ObjectKind, rule_for};
use crate::errors::{MapError, Result};
use crate::filter::Filters;
use crate::signal::CancelToken;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetEntry {
    pub name: String,
    pub container: String,
    pub source: String,
    #[serde(rename = "PathID")]
    pub path_id: i64,
    #[serde(rename = "Type")]
    pub class_id: ClassIdType,
}

#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    pub game: GameType,
    pub entries: Vec<AssetEntry>,
}

impl AssetCatalog {
    pub fn new(game: GameType) -> Self {
        Self {
            game,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Slot of an object inside the current file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(usize);

struct Slot {
    entry: AssetEntry,
    kind: ObjectKind,
    listed: bool,
}

/// Pointer together with the sub-container it was read from.
#[derive(Debug, Clone, Copy)]
struct PointerRef {
    owner: usize,
    pptr: PPtr,
}

/// Per-file arena, object tables and pending deferrals.
#[derive(Default)]
struct FileScope {
    slots: Vec<Slot>,
    /// Path id → handle, one table per sub-container.
    tables: Vec<HashMap<i64, ObjectHandle>>,
    /// Lowercased container identifier → sub-container index.
    by_name: HashMap<String, usize>,
    dependencies: Vec<Vec<String>>,
    animators: Vec<(PointerRef, ObjectHandle)>,
    bin_names: Vec<(PointerRef, String)>,
    container_names: Vec<String>,
    containers: Vec<(PointerRef, usize)>,
}

impl FileScope {
    fn new(containers: &[SubContainer]) -> Self {
        let mut scope = FileScope::default();
        for (index, container) in containers.iter().enumerate() {
            scope.tables.push(HashMap::new());
            scope.by_name.entry(container.name.to_lowercase()).or_insert(index);
            scope.dependencies.push(container.dependencies.clone());
        }
        scope
    }

    fn push(&mut self, slot: Slot) -> ObjectHandle {
        self.slots.push(slot);
        ObjectHandle(self.slots.len() - 1)
    }

    fn register(&mut self, owner: usize, path_id: i64, handle: ObjectHandle) {
        self.tables[owner].insert(path_id, handle);
    }

    fn resolve(&self, pointer: &PointerRef) -> Option<ObjectHandle> {
        let PointerRef { owner, pptr } = *pointer;
        if pptr.is_null() {
            return None;
        }
        let target = match pptr.file_id {
            0 => owner,
            n if n > 0 => {
                let dependency = self.dependencies[owner].get(n as usize - 1)?;
                *self.by_name.get(&dependency.to_lowercase())?
            }
            _ => return None,
        };
        self.tables[target].get(&pptr.path_id).copied()
    }

    fn slot(&mut self, handle: ObjectHandle) -> &mut Slot {
        &mut self.slots[handle.0]
    }
}

/// Builds an [`AssetCatalog`] file by file.
pub struct CatalogBuilder {
    filters: Filters,
    minimal: bool,
    catalog: AssetCatalog,
    failures: usize,
}

impl CatalogBuilder {
    pub fn new(game: GameType, filters: Filters, minimal: bool) -> Self {
        Self {
            filters,
            minimal,
            catalog: AssetCatalog::new(game),
            failures: 0,
        }
    }

    /// Objects skipped because they could not be read.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn finish(self) -> AssetCatalog {
        self.catalog
    }

    /// Reads every object of one scanned file, settles its deferrals and
    /// appends the admitted entries. On cancellation nothing from this file is
    /// kept.
    pub fn add_file(
        &mut self,
        file: &Path,
        containers: &mut [SubContainer],
        cancel: &CancelToken,
    ) -> Result<()> {
        let source = file.to_string_lossy().into_owned();
        let mut scope = FileScope::new(containers);

        for (owner, container) in containers.iter_mut().enumerate() {
            for object in container.objects.iter_mut() {
                if cancel.is_cancelled() {
                    info!("Building AssetMap has been cancelled !!");
                    return Err(MapError::Cancelled);
                }

                let class = object.class_id;
                let rule = rule_for(class);
                let extracted = match (rule.extract)(class, object.reader.as_mut()) {
                    Ok(extracted) => extracted,
                    Err(e) => {
                        self.failures += 1;
                        error!(
                            assets = %container.name,
                            path = %container.original_path.display(),
                            class = %class,
                            path_id = object.path_id,
                            "Unable to load object in {source}: {e}"
                        );
                        continue;
                    }
                };

                let mut entry = AssetEntry {
                    name: String::new(),
                    container: String::new(),
                    source: source.clone(),
                    path_id: object.path_id,
                    class_id: class,
                };
                let mut animator_target = None;

                match extracted {
                    Extracted::Named(name) => entry.name = name,
                    Extracted::Animator(pptr) => animator_target = Some(pptr),
                    Extracted::BinData => {}
                    Extracted::Bundle(bundle) => {
                        for (name, info) in &bundle.containers {
                            let name_index = scope.container_names.len();
                            scope.container_names.push(name.clone());
                            for pptr in bundle.preload_range(info) {
                                let pointer = PointerRef { owner, pptr: *pptr };
                                scope.containers.push((pointer, name_index));
                            }
                        }
                        entry.name = bundle.name;
                    }
                    Extracted::Index(index) => {
                        for (key, pptr) in index.asset_map {
                            scope.bin_names.push((PointerRef { owner, pptr }, key));
                        }
                        entry.name = "IndexObject".to_string();
                    }
                }

                let listed = self.admits(&entry) && rule.exportable.allows(self.minimal);
                if !listed && !rule.retain {
                    continue;
                }

                let handle = scope.push(Slot {
                    entry,
                    kind: rule.kind,
                    listed,
                });
                if rule.retain {
                    scope.register(owner, object.path_id, handle);
                }
                if let Some(pptr) = animator_target {
                    scope.animators.push((PointerRef { owner, pptr }, handle));
                }
            }
        }

        self.resolve_animators(&mut scope);
        resolve_bin_names(&mut scope);
        self.resolve_containers(&mut scope);

        let before = self.catalog.entries.len();
        self.catalog.entries.extend(
            scope
                .slots
                .into_iter()
                .filter(|slot| slot.listed)
                .map(|slot| slot.entry),
        );
        debug!(
            "{} contributed {} entries",
            source,
            self.catalog.entries.len() - before
        );
        Ok(())
    }

    /// First-stage filter. Animators pass until their name is known.
    fn admits(&self, entry: &AssetEntry) -> bool {
        if entry.class_id == ClassIdType::Animator {
            return true;
        }
        self.filters.name_matches(&entry.name) && self.filters.type_matches(entry.class_id)
    }

    fn resolve_animators(&self, scope: &mut FileScope) {
        let animators = std::mem::take(&mut scope.animators);
        for (pointer, handle) in animators {
            let driven = scope
                .resolve(&pointer)
                .map(|target| &scope.slots[target.0])
                .filter(|slot| slot.kind == ObjectKind::GameObject)
                .map(|slot| slot.entry.name.clone());

            let slot = scope.slot(handle);
            match driven {
                Some(name)
                    if self.filters.name_matches(&name)
                        && self.filters.type_matches(slot.entry.class_id) =>
                {
                    slot.entry.name = name;
                }
                _ => slot.listed = false,
            }
        }
    }

    fn resolve_containers(&self, scope: &mut FileScope) {
        let containers = std::mem::take(&mut scope.containers);
        for (pointer, name_index) in containers {
            let Some(handle) = scope.resolve(&pointer) else {
                continue;
            };
            let name = &scope.container_names[name_index];
            if self.filters.container_matches(name) {
                let name = name.clone();
                scope.slot(handle).entry.container = name;
            } else {
                scope.slot(handle).listed = false;
            }
        }
    }
}

fn resolve_bin_names(scope: &mut FileScope) {
    let bin_names = std::mem::take(&mut scope.bin_names);
    for (pointer, key) in bin_names {
        let Some(handle) = scope.resolve(&pointer) else {
            continue;
        };
        let slot = scope.slot(handle);
        if slot.kind != ObjectKind::BinData {
            continue;
        }
        match parse_hex_i32(&key) {
            Some(hash) => {
                slot.entry.name = key;
                slot.entry.container = hash.to_string();
            }
            None => slot.entry.name = format!("BinFile #{}", slot.entry.path_id),
        }
    }
}

/// Parses a hexadecimal key as a 32-bit two's-complement integer, so
/// `FFFFFFFF` is `-1`. Signs and prefixes are not accepted.
fn parse_hex_i32(key: &str) -> Option<i32> {
    let digits = key.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(|v| v as i32)
}
