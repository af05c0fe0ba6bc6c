//! Per-type handling rules for catalog entries.

use crate::class_id::ClassIdType;
use crate::container::{AssetBundle, IndexObject, ObjectReader, PPtr};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exportable {
    Always,
    UnlessMinimal,
}

impl Exportable {
    pub fn allows(self, minimal: bool) -> bool {
        match self {
            Exportable::Always => true,
            Exportable::UnlessMinimal => !minimal,
        }
    }
}

/// How a retained object may be dereferenced later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    GameObject,
    BinData,
    Other,
}

/// What reading an object produced.
#[derive(Debug)]
pub enum Extracted {
    Named(String),
    /// Name is only known after resolving the driven game object.
    Animator(PPtr),
    BinData,
    Bundle(AssetBundle),
    Index(IndexObject),
}

pub type ExtractFn = fn(ClassIdType, &mut dyn ObjectReader) -> Result<Extracted>;

#[derive(Clone, Copy)]
pub struct TypeRule {
    pub extract: ExtractFn,
    pub exportable: Exportable,
    /// Whether the object is kept for pointer dereference within its file.
    pub retain: bool,
    pub kind: ObjectKind,
}

const BUNDLE: TypeRule = TypeRule {
    extract: |_, reader| Ok(Extracted::Bundle(reader.read_asset_bundle()?)),
    exportable: Exportable::UnlessMinimal,
    retain: false,
    kind: ObjectKind::Other,
};

const GAME_OBJECT: TypeRule = TypeRule {
    extract: |_, reader| Ok(Extracted::Named(reader.read_game_object()?.name)),
    exportable: Exportable::UnlessMinimal,
    retain: true,
    kind: ObjectKind::GameObject,
};

const SHADER: TypeRule = TypeRule {
    extract: read_shader_name,
    exportable: Exportable::Always,
    retain: true,
    kind: ObjectKind::Other,
};

const ANIMATOR: TypeRule = TypeRule {
    extract: |_, reader| Ok(Extracted::Animator(reader.read_pptr()?)),
    exportable: Exportable::Always,
    retain: true,
    kind: ObjectKind::Other,
};

const BIN_DATA: TypeRule = TypeRule {
    extract: |_, _| Ok(Extracted::BinData),
    exportable: Exportable::Always,
    retain: true,
    kind: ObjectKind::BinData,
};

const INDEX: TypeRule = TypeRule {
    extract: |_, reader| Ok(Extracted::Index(reader.read_index_object()?)),
    exportable: Exportable::UnlessMinimal,
    retain: false,
    kind: ObjectKind::Other,
};

const NAMED: TypeRule = TypeRule {
    extract: |_, reader| Ok(Extracted::Named(reader.read_aligned_string()?)),
    exportable: Exportable::Always,
    retain: true,
    kind: ObjectKind::Other,
};

const OTHER: TypeRule = TypeRule {
    extract: |class, _| Ok(Extracted::Named(class.name().to_string())),
    exportable: Exportable::UnlessMinimal,
    retain: true,
    kind: ObjectKind::Other,
};

fn read_shader_name(_: ClassIdType, reader: &mut dyn ObjectReader) -> Result<Extracted> {
    let name = reader.read_aligned_string()?;
    if !name.is_empty() {
        return Ok(Extracted::Named(name));
    }
    Ok(Extracted::Named(reader.read_serialized_shader_name()?))
}

pub fn rule_for(class: ClassIdType) -> &'static TypeRule {
    use crate::class_id::ClassIdType as C;
    match class {
        C::AssetBundle => &BUNDLE,
        C::GameObject => &GAME_OBJECT,
        C::Shader => &SHADER,
        C::Animator => &ANIMATOR,
        C::MiHoYoBinData => &BIN_DATA,
        C::IndexObject => &INDEX,
        C::Font
        | C::Material
        | C::Texture
        | C::Mesh
        | C::Sprite
        | C::TextAsset
        | C::Texture2D
        | C::VideoClip
        | C::AudioClip
        | C::AnimationClip => &NAMED,
        _ => &OTHER,
    }
}
