//! Catalog export in markup, JSON and compressed MessagePack form.

use crate::catalog::{AssetCatalog, AssetEntry};
use crate::class_id::{ClassIdType, GameType};
use crate::errors::{MapError, Result};
use crate::signal::CompletionSignal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use strum::{Display, EnumString};
use tracing::info;

/// Extension type MessagePack readers use to tag an LZ4 block array.
const LZ4_BLOCK_ARRAY_EXT: i8 = 98;
const LZ4_BLOCK_SIZE: usize = 1 << 20;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    #[strum(serialize = "xml")]
    Xml,
    #[strum(serialize = "json")]
    Json,
    #[strum(serialize = "messagepack", serialize = "msgpack")]
    MessagePack,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xml => ".xml",
            ExportFormat::Json => ".json",
            ExportFormat::MessagePack => ".map",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub entries: usize,
}

/// Background export in flight.
#[derive(Debug)]
pub struct ExportHandle {
    path: PathBuf,
    handle: JoinHandle<Result<ExportReport>>,
}

impl ExportHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the export is done and returns its outcome.
    pub fn join(self) -> Result<ExportReport> {
        self.handle.join().map_err(|_| MapError::ExportWorker)?
    }
}

pub fn export_path(save_path: &Path, name: &str, format: ExportFormat) -> PathBuf {
    save_path.join(format!("{}{}", name, format.extension()))
}

/// Writes `catalog` to `<save_path>/<name><ext>` on a worker thread.
///
/// `completion` is set once the worker is done, whether or not the export
/// succeeded; the outcome itself comes from [`ExportHandle::join`].
pub fn spawn_export(
    catalog: AssetCatalog,
    name: &str,
    save_path: &Path,
    format: ExportFormat,
    completion: Option<Arc<CompletionSignal>>,
) -> Result<ExportHandle> {
    let path = export_path(save_path, name, format);
    let target = path.clone();
    let handle = std::thread::Builder::new()
        .name("assetmap-export".to_string())
        .spawn(move || {
            let result = write_catalog(&catalog, &target, format);
            if result.is_ok() {
                info!("Finished building AssetMap with {} assets.", catalog.len());
            }
            if let Some(signal) = completion {
                signal.set();
            }
            result
        })?;
    Ok(ExportHandle { path, handle })
}

pub fn write_catalog(
    catalog: &AssetCatalog,
    path: &Path,
    format: ExportFormat,
) -> Result<ExportReport> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Xml => {
            let created_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
            write_xml(&mut writer, catalog, &path.to_string_lossy(), &created_at)?
        }
        ExportFormat::Json => write_json(&mut writer, catalog)?,
        ExportFormat::MessagePack => write_message_pack(&mut writer, catalog)?,
    }
    writer.flush()?;
    Ok(ExportReport {
        path: path.to_path_buf(),
        entries: catalog.len(),
    })
}

/// XML 1.0 has no representation, not even a character reference, for most
/// C0 controls and the two noncharacters at the top of the BMP.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn escape(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ if !is_xml_char(c) => return Err(MapError::InvalidXmlCharacter(c)),
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn write_element<W: Write>(writer: &mut W, tag: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        writeln!(writer, "    <{tag} />")?;
    } else {
        writeln!(writer, "    <{tag}>{}</{tag}>", escape(value)?)?;
    }
    Ok(())
}

pub fn write_xml<W: Write>(
    writer: &mut W,
    catalog: &AssetCatalog,
    filename: &str,
    created_at: &str,
) -> Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(
        writer,
        r#"<Assets filename="{}" createdAt="{}">"#,
        escape(filename)?,
        escape(created_at)?
    )?;
    for asset in &catalog.entries {
        writeln!(writer, "  <Asset>")?;
        write_element(writer, "Name", &asset.name)?;
        write_element(writer, "Container", &asset.container)?;
        writeln!(
            writer,
            r#"    <Type id="{}">{}</Type>"#,
            asset.class_id.id(),
            asset.class_id
        )?;
        write_element(writer, "PathID", &asset.path_id.to_string())?;
        write_element(writer, "Source", &asset.source)?;
        writeln!(writer, "  </Asset>")?;
    }
    writeln!(writer, "</Assets>")?;
    Ok(())
}

pub fn write_json<W: Write>(writer: &mut W, catalog: &AssetCatalog) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &catalog.entries)?;
    writeln!(writer)?;
    Ok(())
}

#[derive(Serialize)]
struct PackedEntry<'a> {
    name: &'a str,
    container: &'a str,
    source: &'a str,
    path_id: i64,
    class_id: i32,
}

#[derive(Serialize)]
struct PackedCatalog<'a> {
    game_type: i32,
    asset_entries: Vec<PackedEntry<'a>>,
}

#[derive(Deserialize)]
struct OwnedEntry(String, String, String, i64, i32);

#[derive(Deserialize)]
struct OwnedCatalog(i32, Vec<OwnedEntry>);

/// Serializes the catalog positionally and wraps it in an LZ4 block array:
/// `[ext(98, block lengths...), bin(block)...]`.
pub fn write_message_pack<W: Write>(writer: &mut W, catalog: &AssetCatalog) -> Result<()> {
    let packed = PackedCatalog {
        game_type: catalog.game.id(),
        asset_entries: catalog
            .entries
            .iter()
            .map(|e| PackedEntry {
                name: &e.name,
                container: &e.container,
                source: &e.source,
                path_id: e.path_id,
                class_id: e.class_id.id(),
            })
            .collect(),
    };
    let payload = rmp_serde::to_vec(&packed)?;
    let blocks: Vec<&[u8]> = payload.chunks(LZ4_BLOCK_SIZE).collect();

    let mut lengths = Vec::new();
    for block in &blocks {
        rmp::encode::write_sint(&mut lengths, block.len() as i64)?;
    }

    rmp::encode::write_array_len(writer, blocks.len() as u32 + 1)?;
    rmp::encode::write_ext_meta(writer, lengths.len() as u32, LZ4_BLOCK_ARRAY_EXT)?;
    writer.write_all(&lengths)?;
    for block in blocks {
        let compressed = lz4_flex::block::compress(block);
        rmp::encode::write_bin(writer, &compressed)?;
    }
    Ok(())
}

fn envelope_error(e: impl std::fmt::Display) -> MapError {
    MapError::MessagePack(e.to_string())
}

/// Reads a catalog written by [`write_message_pack`].
pub fn read_message_pack(bytes: &[u8]) -> Result<AssetCatalog> {
    let mut rd = bytes;
    let items = rmp::decode::read_array_len(&mut rd).map_err(envelope_error)? as usize;
    let ext = rmp::decode::read_ext_meta(&mut rd).map_err(envelope_error)?;
    if ext.typeid != LZ4_BLOCK_ARRAY_EXT || items == 0 {
        return Err(MapError::MessagePack("not an LZ4 block array".to_string()));
    }

    let header_len = ext.size as usize;
    if header_len > rd.len() {
        return Err(MapError::MessagePack("truncated block header".to_string()));
    }
    let (mut header, rest) = rd.split_at(header_len);
    rd = rest;

    let mut payload = Vec::new();
    for _ in 1..items {
        let expected: i64 = rmp::decode::read_int(&mut header).map_err(envelope_error)?;
        let len = rmp::decode::read_bin_len(&mut rd).map_err(envelope_error)? as usize;
        if len > rd.len() || expected < 0 {
            return Err(MapError::MessagePack("truncated block".to_string()));
        }
        let (compressed, rest) = rd.split_at(len);
        rd = rest;
        let block =
            lz4_flex::block::decompress(compressed, expected as usize).map_err(envelope_error)?;
        payload.extend_from_slice(&block);
    }

    let OwnedCatalog(game, entries) =
        rmp_serde::from_slice(&payload).map_err(envelope_error)?;
    Ok(AssetCatalog {
        game: GameType::from_repr(game).unwrap_or_default(),
        entries: entries
            .into_iter()
            .map(|OwnedEntry(name, container, source, path_id, class_id)| AssetEntry {
                name,
                container,
                source,
                path_id,
                class_id: ClassIdType::from_id(class_id),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AssetCatalog {
        AssetCatalog {
            game: GameType::Gi,
            entries: vec![
                AssetEntry {
                    name: "Eff_<Fire> & \"Smoke\"".into(),
                    container: "".into(),
                    source: "data/1001.blk".into(),
                    path_id: -42,
                    class_id: ClassIdType::Texture2D,
                },
                AssetEntry {
                    name: "Avatar".into(),
                    container: "assets/avatar.prefab".into(),
                    source: "data/1002.blk".into(),
                    path_id: 7,
                    class_id: ClassIdType::Animator,
                },
            ],
        }
    }

    #[test]
    fn xml_layout() {
        let mut buf = Vec::new();
        write_xml(&mut buf, &catalog(), "out/map.xml", "2024-05-01T10:00:00").unwrap();
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains(r#"<Assets filename="out/map.xml" createdAt="2024-05-01T10:00:00">"#));
        assert!(xml.contains("<Name>Eff_&lt;Fire&gt; &amp; &quot;Smoke&quot;</Name>"));
        assert!(xml.contains("<Container />"));
        assert!(xml.contains(r#"<Type id="28">Texture2D</Type>"#));
        assert!(xml.contains(r#"<Type id="95">Animator</Type>"#));
        assert!(xml.contains("<PathID>-42</PathID>"));
        assert_eq!(xml.matches("<Asset>").count(), 2);
        assert!(xml.trim_end().ends_with("</Assets>"));
    }

    #[test]
    fn xml_rejects_control_characters() {
        let mut catalog = catalog();
        catalog.entries[1].name = "Avatar\u{1}".into();

        let mut buf = Vec::new();
        let err = write_xml(&mut buf, &catalog, "map.xml", "2024-05-01T10:00:00").unwrap_err();
        assert!(matches!(err, MapError::InvalidXmlCharacter('\u{1}')));

        catalog.entries[1].name = "tab\there\nnewline".into();
        let mut buf = Vec::new();
        write_xml(&mut buf, &catalog, "map.xml", "2024-05-01T10:00:00").unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("<Name>tab\there\nnewline</Name>"));
    }

    #[test]
    fn json_uses_type_names() {
        let mut buf = Vec::new();
        write_json(&mut buf, &catalog()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let first = &value[0];
        assert_eq!(first["Name"], "Eff_<Fire> & \"Smoke\"");
        assert_eq!(first["Type"], "Texture2D");
        assert_eq!(first["PathID"], -42);
        assert_eq!(value[1]["Container"], "assets/avatar.prefab");
    }

    #[test]
    fn message_pack_envelope_round_trips() {
        let original = catalog();
        let mut buf = Vec::new();
        write_message_pack(&mut buf, &original).unwrap();

        // fixarray of 2, then ext 98
        assert_eq!(buf[0], 0x92);
        let restored = read_message_pack(&buf).unwrap();
        assert_eq!(restored.game, GameType::Gi);
        assert_eq!(restored.entries, original.entries);
    }

    #[test]
    fn format_names_and_extensions() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("msgpack".parse::<ExportFormat>().unwrap(), ExportFormat::MessagePack);
        assert_eq!(
            export_path(Path::new("out"), "GI", ExportFormat::MessagePack),
            Path::new("out").join("GI.map")
        );
    }

    #[test]
    fn background_export_reports_and_signals() {
        let dir = tempfile::tempdir().unwrap();
        let signal = Arc::new(CompletionSignal::new());
        let handle = spawn_export(
            catalog(),
            "assets",
            dir.path(),
            ExportFormat::Json,
            Some(Arc::clone(&signal)),
        )
        .unwrap();

        let report = handle.join().unwrap();
        assert!(signal.is_set());
        assert_eq!(report.entries, 2);
        assert_eq!(report.path, dir.path().join("assets.json"));
        assert!(report.path.exists());
    }

    #[test]
    fn failed_export_still_signals() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let signal = Arc::new(CompletionSignal::new());
        let handle = spawn_export(
            catalog(),
            "assets",
            &blocker,
            ExportFormat::Xml,
            Some(Arc::clone(&signal)),
        )
        .unwrap();

        assert!(handle.join().is_err());
        assert!(signal.is_set());
    }
}
