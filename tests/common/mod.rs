#![allow(dead_code)]

use assetmap::container::{AssetBundle, AssetInfo, DecodedObject, GameObject};
use assetmap::{ClassIdType, Config, MapSession, ObjectEntry, PPtr};
use std::path::Path;

pub fn session(maps_root: &Path) -> MapSession {
    MapSession::new(Config {
        maps_root: maps_root.to_path_buf(),
        ..Config::default()
    })
}

pub fn named(path_id: i64, class: ClassIdType, name: &str) -> ObjectEntry {
    ObjectEntry::new(path_id, class, DecodedObject::Named(name.to_string()))
}

pub fn game_object(path_id: i64, name: &str) -> ObjectEntry {
    ObjectEntry::new(
        path_id,
        ClassIdType::GameObject,
        DecodedObject::GameObject(GameObject {
            name: name.to_string(),
        }),
    )
}

pub fn animator(path_id: i64, game_object: PPtr) -> ObjectEntry {
    ObjectEntry::new(
        path_id,
        ClassIdType::Animator,
        DecodedObject::Component { game_object },
    )
}

/// Bundle declaring one container over `preload` pointers.
pub fn bundle(path_id: i64, container: &str, preload: &[i64]) -> ObjectEntry {
    let bundle = AssetBundle {
        name: "bundle".to_string(),
        preload_table: preload.iter().map(|&id| PPtr::local(id)).collect(),
        containers: vec![(
            container.to_string(),
            AssetInfo {
                preload_index: 0,
                preload_size: preload.len() as i32,
            },
        )],
    };
    ObjectEntry::new(path_id, ClassIdType::AssetBundle, DecodedObject::Bundle(bundle))
}

pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}
