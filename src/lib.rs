//! Location maps and asset catalogs for packed game asset files.
//!
//! A location map records which file (and at which offset) every packed
//! sub-container lives in, so a loader can open just the files a set of
//! containers needs. An asset catalog lists the objects inside those files
//! with their names, containers and types, exported as XML, JSON or
//! LZ4-compressed MessagePack.

pub mod catalog;
pub mod class_id;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod errors;
pub mod export;
pub mod filter;
pub mod fixup;
pub mod location;
pub mod logging;
pub mod reader;
pub mod scanner;
pub mod session;
pub mod signal;

pub use catalog::{AssetCatalog, AssetEntry, CatalogBuilder};
pub use class_id::{ClassIdType, GameType};
pub use config::{CatalogRequest, Config};
pub use container::{ContainerReader, ObjectEntry, ObjectReader, PPtr, SubContainer};
pub use errors::{MapError, Result};
pub use export::{ExportFormat, ExportHandle, ExportReport};
pub use filter::Filters;
pub use fixup::{NoResourceIndex, ResourceIndex};
pub use location::{LocationEntry, LocationMap, OffsetRegistry};
pub use session::MapSession;
pub use signal::{CancelToken, CompletionSignal};
