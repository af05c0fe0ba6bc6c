//! Boundary to the binary container deserializer.
//!
//! The scanner never parses container bytes itself. A [`ContainerReader`]
//! turns one file into [`SubContainer`]s, and every object inside exposes an
//! [`ObjectReader`] through which the few fields the catalog needs are read.

use crate::class_id::ClassIdType;
use crate::errors::{MapError, Result};
use std::path::{Path, PathBuf};

/// Reference to an object. `file_id == 0` targets the owning sub-container,
/// `file_id == n` the n-th declared dependency of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    pub fn new(file_id: i32, path_id: i64) -> Self {
        Self { file_id, path_id }
    }

    pub fn local(path_id: i64) -> Self {
        Self::new(0, path_id)
    }

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub preload_index: i32,
    pub preload_size: i32,
}

#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub name: String,
    pub preload_table: Vec<PPtr>,
    /// Virtual container name and the slice of the preload table it owns.
    pub containers: Vec<(String, AssetInfo)>,
}

impl AssetBundle {
    /// Preload pointers covered by `info`, clamped to the table.
    pub fn preload_range(&self, info: &AssetInfo) -> &[PPtr] {
        let len = self.preload_table.len();
        let start = usize::try_from(info.preload_index).unwrap_or(0).min(len);
        let size = usize::try_from(info.preload_size).unwrap_or(0);
        let end = start.saturating_add(size).min(len);
        &self.preload_table[start..end]
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameObject {
    pub name: String,
}

/// Key to binary payload table.
#[derive(Debug, Clone, Default)]
pub struct IndexObject {
    pub asset_map: Vec<(String, PPtr)>,
}

pub trait ObjectReader {
    /// Leading length-prefixed, 4-byte aligned string of the object body.
    fn read_aligned_string(&mut self) -> Result<String>;
    fn read_pptr(&mut self) -> Result<PPtr>;
    fn read_asset_bundle(&mut self) -> Result<AssetBundle>;
    fn read_game_object(&mut self) -> Result<GameObject>;
    fn read_index_object(&mut self) -> Result<IndexObject>;
    /// Name stored in the parsed form of a shader.
    fn read_serialized_shader_name(&mut self) -> Result<String>;
}

pub struct ObjectEntry {
    pub path_id: i64,
    pub class_id: ClassIdType,
    pub reader: Box<dyn ObjectReader>,
}

impl ObjectEntry {
    pub fn new(path_id: i64, class_id: ClassIdType, reader: impl ObjectReader + 'static) -> Self {
        Self {
            path_id,
            class_id,
            reader: Box::new(reader),
        }
    }
}

impl std::fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("path_id", &self.path_id)
            .field("class_id", &self.class_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct SubContainer {
    /// Container identifier, the key of the location map.
    pub name: String,
    pub original_path: PathBuf,
    pub offset: i64,
    pub dependencies: Vec<String>,
    pub objects: Vec<ObjectEntry>,
}

impl SubContainer {
    pub fn new(name: impl Into<String>, offset: i64) -> Self {
        Self {
            name: name.into(),
            offset,
            ..Default::default()
        }
    }

    pub fn with_original_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.original_path = path.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_object(mut self, object: ObjectEntry) -> Self {
        self.objects.push(object);
        self
    }
}

pub trait ContainerReader {
    /// Loads every sub-container of `path`. Files that are not containers
    /// return an empty list rather than an error.
    fn load(&mut self, path: &Path) -> Result<Vec<SubContainer>>;
}

impl<F> ContainerReader for F
where
    F: FnMut(&Path) -> Result<Vec<SubContainer>>,
{
    fn load(&mut self, path: &Path) -> Result<Vec<SubContainer>> {
        self(path)
    }
}

/// Object whose fields were already decoded by the reader.
#[derive(Debug, Clone)]
pub enum DecodedObject {
    Named(String),
    Shader { name: String, parsed_name: String },
    Component { game_object: PPtr },
    GameObject(GameObject),
    Bundle(AssetBundle),
    Index(IndexObject),
    /// Payload without readable fields.
    Opaque,
    /// Payload the reader could not make sense of; every read fails.
    Corrupt(String),
}

impl DecodedObject {
    fn mismatch(&self, wanted: &str) -> MapError {
        match self {
            DecodedObject::Corrupt(message) => MapError::Decode(message.clone()),
            _ => MapError::Decode(format!("object holds no {wanted}")),
        }
    }
}

impl ObjectReader for DecodedObject {
    fn read_aligned_string(&mut self) -> Result<String> {
        match self {
            DecodedObject::Named(name) | DecodedObject::Shader { name, .. } => Ok(name.clone()),
            DecodedObject::GameObject(go) => Ok(go.name.clone()),
            DecodedObject::Bundle(bundle) => Ok(bundle.name.clone()),
            other => Err(other.mismatch("name")),
        }
    }

    fn read_pptr(&mut self) -> Result<PPtr> {
        match self {
            DecodedObject::Component { game_object } => Ok(*game_object),
            other => Err(other.mismatch("pointer")),
        }
    }

    fn read_asset_bundle(&mut self) -> Result<AssetBundle> {
        match self {
            DecodedObject::Bundle(bundle) => Ok(std::mem::take(bundle)),
            other => Err(other.mismatch("asset bundle")),
        }
    }

    fn read_game_object(&mut self) -> Result<GameObject> {
        match self {
            DecodedObject::GameObject(go) => Ok(std::mem::take(go)),
            other => Err(other.mismatch("game object")),
        }
    }

    fn read_index_object(&mut self) -> Result<IndexObject> {
        match self {
            DecodedObject::Index(index) => Ok(std::mem::take(index)),
            other => Err(other.mismatch("index")),
        }
    }

    fn read_serialized_shader_name(&mut self) -> Result<String> {
        match self {
            DecodedObject::Shader { parsed_name, .. } => Ok(parsed_name.clone()),
            other => Err(other.mismatch("parsed shader")),
        }
    }
}
