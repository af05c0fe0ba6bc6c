//! Container identifier → file location index.

use crate::container::SubContainer;
use crate::errors::{MapError, Result};
use crate::reader::{MapReader, MapWriter};
use crate::signal::CancelToken;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

const MAX_ENTRIES: usize = i32::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEntry {
    pub identifier: String,
    /// Path of the owning file relative to the map's base folder.
    pub path: String,
    pub offset: i64,
    pub dependencies: Vec<String>,
}

/// Entries are keyed by the lowercased identifier; the original spelling is
/// kept on the entry and is what gets persisted.
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    base_folder: PathBuf,
    entries: IndexMap<String, LocationEntry>,
    collisions: usize,
}

impl LocationMap {
    pub fn new(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
            ..Default::default()
        }
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Duplicate identifiers dropped since the map was created.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn get(&self, identifier: &str) -> Option<&LocationEntry> {
        self.entries.get(&identifier.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationEntry> {
        self.entries.values()
    }

    /// Inserts `entry` unless its identifier is already present. The first
    /// entry wins; a duplicate only bumps the collision counter.
    pub fn insert(&mut self, entry: LocationEntry) -> bool {
        let key = entry.identifier.to_lowercase();
        if self.entries.contains_key(&key) {
            self.collisions += 1;
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Records every sub-container of `file`, checking for cancellation
    /// between containers.
    pub fn add_file(
        &mut self,
        file: &Path,
        containers: &[SubContainer],
        cancel: &CancelToken,
    ) -> Result<()> {
        let relative = self.relative_path(file);
        for container in containers {
            if cancel.is_cancelled() {
                return Err(MapError::Cancelled);
            }
            self.insert(LocationEntry {
                identifier: container.name.clone(),
                path: relative.clone(),
                offset: container.offset,
                dependencies: container.dependencies.clone(),
            });
        }
        Ok(())
    }

    /// Path of `file` below the base folder. Both are resolved against the
    /// current directory first, so `./game` and `game/a.blk` agree. Files
    /// outside the base folder are kept as given.
    pub fn relative_path(&self, file: &Path) -> String {
        let resolved = match (lexical_absolute(&self.base_folder), lexical_absolute(file)) {
            (Some(base), Some(full)) => full.strip_prefix(&base).ok().map(Path::to_path_buf),
            _ => None,
        };
        let relative = resolved
            .or_else(|| file.strip_prefix(&self.base_folder).ok().map(Path::to_path_buf))
            .unwrap_or_else(|| file.to_path_buf());
        relative.to_string_lossy().into_owned()
    }

    /// Reorders entries by identifier, ignoring case.
    pub fn sort(&mut self) {
        self.entries.sort_by(|ka, a, kb, b| {
            ka.cmp(kb).then_with(|| a.identifier.cmp(&b.identifier))
        });
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_prefixed_string(&self.base_folder.to_string_lossy())?;
        writer.write_count(self.entries.len())?;
        for entry in self.entries.values() {
            writer.write_prefixed_string(&entry.identifier)?;
            writer.write_prefixed_string(&entry.path)?;
            writer.write_i64::<LittleEndian>(entry.offset)?;
            writer.write_count(entry.dependencies.len())?;
            for dependency in &entry.dependencies {
                writer.write_prefixed_string(dependency)?;
            }
        }
        Ok(())
    }

    /// Reads a persisted map. Entries keep their file order.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut map = LocationMap::new(reader.read_prefixed_string()?);
        let count = reader.read_count(MAX_ENTRIES)?;
        for _ in 0..count {
            let identifier = reader.read_prefixed_string()?;
            let path = reader.read_prefixed_string()?;
            let offset = reader.read_i64::<LittleEndian>()?;
            let dependencies = reader.read_array(|r| r.read_prefixed_string(), MAX_ENTRIES)?;
            map.insert(LocationEntry {
                identifier,
                path,
                offset,
                dependencies,
            });
        }
        Ok(map)
    }

    /// Writes to a sibling temp file and renames it over `path`, so a failed
    /// write leaves the previous map intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let written = File::create(&temp_path)
            .map_err(MapError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                self.write_to(&mut writer)?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn lexical_absolute(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Some(normalized)
}

/// Offsets already handed out per file, so a loader can skip locations it
/// has visited.
#[derive(Debug, Clone, Default)]
pub struct OffsetRegistry {
    offsets: HashMap<PathBuf, BTreeSet<i64>>,
}

impl OffsetRegistry {
    pub fn record(&mut self, path: impl Into<PathBuf>, offset: i64) -> bool {
        self.offsets.entry(path.into()).or_default().insert(offset)
    }

    /// Recorded offsets for `path`, ascending.
    pub fn offsets(&self, path: &Path) -> Option<Vec<i64>> {
        self.offsets
            .get(path)
            .map(|set| set.iter().copied().collect())
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.offsets.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry(id: &str, path: &str, offset: i64, deps: &[&str]) -> LocationEntry {
        LocationEntry {
            identifier: id.into(),
            path: path.into(),
            offset,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn first_entry_wins_and_collisions_are_counted() {
        let mut map = LocationMap::new("/game");
        assert!(map.insert(entry("CAB-x", "a.blk", 0, &[])));
        assert!(!map.insert(entry("cab-X", "b.blk", 10, &[])));
        assert!(!map.insert(entry("CAB-X", "c.blk", 20, &[])));

        assert_eq!(map.len(), 1);
        assert_eq!(map.collisions(), 2);
        let kept = map.get("CAB-X").unwrap();
        assert_eq!(kept.path, "a.blk");
        assert_eq!(kept.identifier, "CAB-x");
    }

    #[test]
    fn sort_ignores_case() {
        let mut map = LocationMap::new("");
        map.insert(entry("b", "1", 0, &[]));
        map.insert(entry("C", "2", 0, &[]));
        map.insert(entry("A", "3", 0, &[]));
        map.sort();
        let order: Vec<_> = map.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(order, vec!["A", "b", "C"]);
    }

    #[test]
    fn binary_layout_is_stable() {
        let mut map = LocationMap::new("R");
        map.insert(entry("id", "p", 258, &["d"]));

        let mut buf = Vec::new();
        map.write_to(&mut buf).unwrap();

        let parts: [&[u8]; 7] = [
            &[1, b'R'],
            &1i32.to_le_bytes(),
            &[2, b'i', b'd'],
            &[1, b'p'],
            &258i64.to_le_bytes(),
            &1i32.to_le_bytes(),
            &[1, b'd'],
        ];
        let expected = parts.concat();
        assert_eq!(buf, expected);
    }

    #[test]
    fn read_keeps_file_order() {
        let mut map = LocationMap::new("root");
        map.insert(entry("zeta", "z", 1, &[]));
        map.insert(entry("alpha", "a", 2, &["zeta", "beta"]));

        let mut buf = Vec::new();
        map.write_to(&mut buf).unwrap();
        let loaded = LocationMap::read_from(&mut Cursor::new(buf)).unwrap();

        assert_eq!(loaded.base_folder(), Path::new("root"));
        let entries: Vec<_> = loaded.iter().cloned().collect();
        let original: Vec<_> = map.iter().cloned().collect();
        assert_eq!(entries, original);
    }

    #[test]
    fn truncated_input_fails() {
        let mut map = LocationMap::new("root");
        map.insert(entry("alpha", "a", 2, &["dep"]));
        let mut buf = Vec::new();
        map.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);

        assert!(LocationMap::read_from(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn relative_path_falls_back_to_input() {
        let map = LocationMap::new("/data/game");
        assert_eq!(
            map.relative_path(Path::new("/data/game/sub/a.blk")),
            Path::new("sub").join("a.blk").to_string_lossy()
        );
        assert_eq!(map.relative_path(Path::new("/elsewhere/b.blk")), "/elsewhere/b.blk");
    }

    #[test]
    fn relative_path_resolves_differently_spelled_base() {
        let map = LocationMap::new("./game");
        assert_eq!(
            map.relative_path(Path::new("game/blocks/a.blk")),
            Path::new("blocks").join("a.blk").to_string_lossy()
        );

        let map = LocationMap::new("game/sub/..");
        assert_eq!(map.relative_path(Path::new("./game/a.blk")), "a.blk");

        let cwd = std::env::current_dir().unwrap();
        let map = LocationMap::new("game");
        assert_eq!(map.relative_path(&cwd.join("game").join("a.blk")), "a.blk");
    }

    #[test]
    fn save_replaces_map_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GI.bin");

        let mut first = LocationMap::new("old");
        first.insert(entry("CAB-a", "a.blk", 0, &[]));
        first.save(&path).unwrap();

        let mut second = LocationMap::new("new");
        second.insert(entry("CAB-b", "b.blk", 8, &[]));
        second.save(&path).unwrap();

        let loaded = LocationMap::load(&path).unwrap();
        assert_eq!(loaded.base_folder(), Path::new("new"));
        assert!(loaded.get("CAB-b").is_some());
        assert!(!dir.path().join("GI.tmp").exists());
    }

    #[test]
    fn failed_save_keeps_previous_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GI.bin");

        let mut good = LocationMap::new("old");
        good.insert(entry("CAB-a", "a.blk", 0, &[]));
        good.save(&path).unwrap();

        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir(dir.path().join("GI.tmp")).unwrap();
        let replacement = LocationMap::new("new");
        assert!(replacement.save(&path).is_err());

        let loaded = LocationMap::load(&path).unwrap();
        assert_eq!(loaded.base_folder(), Path::new("old"));
        assert!(loaded.get("CAB-a").is_some());
    }

    #[test]
    fn add_file_uses_relative_paths() {
        let mut map = LocationMap::new("/game");
        let containers = vec![
            SubContainer::new("CAB-a", 0).with_dependencies(["CAB-b"]),
            SubContainer::new("CAB-b", 4096),
        ];
        map.add_file(Path::new("/game/blocks/1.blk"), &containers, &CancelToken::new())
            .unwrap();

        let b = map.get("cab-b").unwrap();
        assert_eq!(b.offset, 4096);
        assert_eq!(b.path, Path::new("blocks").join("1.blk").to_string_lossy());
        assert_eq!(map.get("CAB-a").unwrap().dependencies, vec!["CAB-b"]);
    }

    #[test]
    fn add_file_stops_when_cancelled() {
        let mut map = LocationMap::new("/game");
        let cancel = CancelToken::new();
        cancel.cancel();
        let containers = vec![SubContainer::new("CAB-a", 0)];
        let result = map.add_file(Path::new("/game/1.blk"), &containers, &cancel);
        assert!(matches!(result, Err(MapError::Cancelled)));
        assert!(map.is_empty());
    }

    #[test]
    fn registry_keeps_distinct_offsets() {
        let mut registry = OffsetRegistry::default();
        assert!(registry.record("/game/a.blk", 30));
        assert!(registry.record("/game/a.blk", 10));
        assert!(!registry.record("/game/a.blk", 30));

        assert_eq!(registry.offsets(Path::new("/game/a.blk")), Some(vec![10, 30]));
        assert!(registry.remove(Path::new("/game/a.blk")));
        assert_eq!(registry.offsets(Path::new("/game/a.blk")), None);
    }
}
