use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

/// Object kinds a container can hold, keyed by their serialized class id.
///
/// Only the kinds the catalog treats specially are significant; every other
/// known kind lands in the "other" bucket of the dispatch table.
#[repr(i32)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
pub enum ClassIdType {
    #[default]
    UnknownType = -1,
    Object = 0,
    GameObject = 1,
    Component = 2,
    Transform = 4,
    Camera = 20,
    Material = 21,
    MeshRenderer = 23,
    Texture = 27,
    Texture2D = 28,
    MeshFilter = 33,
    Mesh = 43,
    Shader = 48,
    TextAsset = 49,
    Rigidbody2D = 50,
    Rigidbody = 54,
    Collider = 56,
    MeshCollider = 64,
    BoxCollider = 65,
    ComputeShader = 72,
    AnimationClip = 74,
    AudioListener = 81,
    AudioSource = 82,
    AudioClip = 83,
    RenderTexture = 84,
    Cubemap = 89,
    Avatar = 90,
    AnimatorController = 91,
    RuntimeAnimatorController = 93,
    Animator = 95,
    TrailRenderer = 96,
    TextMesh = 102,
    Light = 108,
    Animation = 111,
    MonoBehaviour = 114,
    MonoScript = 115,
    Texture3D = 117,
    LineRenderer = 120,
    Font = 128,
    PhysicMaterial = 134,
    SphereCollider = 135,
    CapsuleCollider = 136,
    SkinnedMeshRenderer = 137,
    AssetBundle = 142,
    PreloadData = 150,
    TerrainData = 156,
    ParticleSystem = 198,
    ParticleSystemRenderer = 199,
    ShaderVariantCollection = 200,
    LodGroup = 205,
    SpriteRenderer = 212,
    Sprite = 213,
    ReflectionProbe = 215,
    Terrain = 218,
    AnimatorOverrideController = 221,
    CanvasRenderer = 222,
    Canvas = 223,
    RectTransform = 224,
    CanvasGroup = 225,
    LightProbes = 258,
    AssetBundleManifest = 290,
    VideoPlayer = 328,
    VideoClip = 329,
    IndexObject = 1204,
    MiHoYoBinData = 1208,
    SpriteAtlas = 687078895,
}

impl ClassIdType {
    pub fn from_id(id: i32) -> Self {
        Self::from_repr(id).unwrap_or(Self::UnknownType)
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Game families the scanner knows about. The ordinal is what the binary
/// catalog envelope stores.
#[repr(i32)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
pub enum GameType {
    #[default]
    Normal = 0,
    #[strum(serialize = "UnityCN")]
    #[serde(rename = "UnityCN")]
    UnityCn,
    #[strum(serialize = "GI")]
    #[serde(rename = "GI")]
    Gi,
    #[strum(serialize = "GI_Pack")]
    #[serde(rename = "GI_Pack")]
    GiPack,
    #[strum(serialize = "GI_CB1")]
    #[serde(rename = "GI_CB1")]
    GiCb1,
    #[strum(serialize = "GI_CB2")]
    #[serde(rename = "GI_CB2")]
    GiCb2,
    #[strum(serialize = "GI_CB3")]
    #[serde(rename = "GI_CB3")]
    GiCb3,
    #[strum(serialize = "GI_CB3Pre")]
    #[serde(rename = "GI_CB3Pre")]
    GiCb3Pre,
    #[strum(serialize = "BH3")]
    #[serde(rename = "BH3")]
    Bh3,
    #[strum(serialize = "BH3Pre")]
    #[serde(rename = "BH3Pre")]
    Bh3Pre,
    #[strum(serialize = "ZZZ_CB1")]
    #[serde(rename = "ZZZ_CB1")]
    ZzzCb1,
    #[strum(serialize = "SR_CB2")]
    #[serde(rename = "SR_CB2")]
    SrCb2,
    #[strum(serialize = "SR")]
    #[serde(rename = "SR")]
    Sr,
    #[strum(serialize = "TOT")]
    #[serde(rename = "TOT")]
    Tot,
}

impl GameType {
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Titles whose containers are numeric placeholders resolved through a
    /// resource index.
    pub fn is_gi_sub_group(self) -> bool {
        matches!(
            self,
            Self::Gi | Self::GiPack | Self::GiCb1 | Self::GiCb2 | Self::GiCb3 | Self::GiCb3Pre
        )
    }
}
