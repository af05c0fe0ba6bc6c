use crate::catalog::AssetCatalog;
use crate::class_id::ClassIdType;
use std::path::Path;
use tracing::info;

/// Game-side lookup from a numeric file id and hash remainder to the asset's
/// canonical path.
pub trait ResourceIndex {
    fn container(&self, id: u32, last: u32) -> Option<String>;
}

impl<F> ResourceIndex for F
where
    F: Fn(u32, u32) -> Option<String>,
{
    fn container(&self, id: u32, last: u32) -> Option<String> {
        self(id, last)
    }
}

/// Index for games that have none; nothing resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResourceIndex;

impl ResourceIndex for NoResourceIndex {
    fn container(&self, _id: u32, _last: u32) -> Option<String> {
        None
    }
}

/// Replaces numeric container placeholders with canonical paths for the GI
/// family. Returns the number of entries rewritten.
pub fn update_containers(catalog: &mut AssetCatalog, index: &dyn ResourceIndex) -> usize {
    if !catalog.game.is_gi_sub_group() || catalog.is_empty() {
        return 0;
    }

    info!("Updating Containers...");
    let mut updated = 0;
    for entry in catalog.entries.iter_mut() {
        let Ok(value) = entry.container.parse::<i32>() else {
            continue;
        };
        let last = value as u32;
        let Some(id) = Path::new(&entry.source)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u32>().ok())
        else {
            continue;
        };
        let Some(path) = index.container(id, last).filter(|p| !p.is_empty()) else {
            continue;
        };

        if entry.class_id == ClassIdType::MiHoYoBinData {
            if let Some(stem) = Path::new(&path).file_stem() {
                entry.name = stem.to_string_lossy().into_owned();
            }
        }
        entry.container = path;
        updated += 1;
    }
    info!("Updated {} containers !!", updated);
    updated
}
