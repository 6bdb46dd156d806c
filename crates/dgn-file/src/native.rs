//! 容器二进制格式（.dgn）
//!
//! 文件头之后是一组带标签的段，每段独立用 MessagePack 序列化并用 Zstd 压缩：
//!
//! ```text
//! +----------------------------+
//! | 文件头 16 字节              |  magic "DGN8" | version | flags | section_count
//! +----------------------------+
//! | 段: tag(4) raw(4) size(4)  |  INFO 文件信息
//! |     data(size)             |  META 元数据
//! | ...                        |  UNIT 单位
//! |                            |  COLR 颜色表
//! |                            |  LEVL 层表
//! |                            |  MODL 模型定义
//! |                            |  ELEM 每个模型的图元
//! +----------------------------+
//! ```
//!
//! 结构段（除 ELEM 外）可以单独读取，种子复制只读结构段，跳过图元数据。
//! 写入时先写临时文件再重命名，目标路径上要么没有文件，要么是完整的文件。

use crate::catalog::{LevelTable, ModelDefinition, Units};
use crate::error::{DgnError, Result};
use crate::metadata::DgnMetadata;
use chrono::{DateTime, Utc};
use dgn_core::{ColorTable, Element, ElementId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 文件魔数 "DGN8"
const MAGIC: &[u8; 4] = b"DGN8";

/// 当前文件格式版本
const FORMAT_VERSION: u32 = 1;

/// 单段解压后的上限
const MAX_SECTION_SIZE: u32 = 1 << 30;

const TAG_INFO: [u8; 4] = *b"INFO";
const TAG_META: [u8; 4] = *b"META";
const TAG_UNIT: [u8; 4] = *b"UNIT";
const TAG_COLR: [u8; 4] = *b"COLR";
const TAG_LEVL: [u8; 4] = *b"LEVL";
const TAG_MODL: [u8; 4] = *b"MODL";
const TAG_ELEM: [u8; 4] = *b"ELEM";

/// 文件头（16 字节）
#[derive(Debug)]
struct FileHeader {
    magic: [u8; 4],
    version: u32,
    /// 标志位（预留）
    flags: u32,
    section_count: u32,
}

impl FileHeader {
    fn new(section_count: u32) -> Self {
        Self {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            flags: 0,
            section_count,
        }
    }

    fn write(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.section_count.to_le_bytes())?;
        Ok(())
    }

    fn read(reader: &mut impl Read) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic, "file header")?;

        if &magic != MAGIC {
            return Err(DgnError::InvalidFormat(
                "Invalid magic number, not a DGN container".to_string(),
            ));
        }

        let version = read_u32(reader, "file header")?;
        let flags = read_u32(reader, "file header")?;
        let section_count = read_u32(reader, "file header")?;

        if version == 0 || version > FORMAT_VERSION {
            return Err(DgnError::InvalidFormat(format!(
                "File version {} is not supported (newest supported is {})",
                version, FORMAT_VERSION
            )));
        }

        if flags != 0 {
            tracing::debug!("Ignoring header flags {:#x}", flags);
        }

        Ok(Self {
            magic,
            version,
            flags,
            section_count,
        })
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => DgnError::InvalidFormat(format!("Truncated {}", what)),
        _ => DgnError::Io(e),
    })
}

fn read_u32(reader: &mut impl Read, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, what)?;
    Ok(u32::from_le_bytes(buf))
}

/// 文件信息段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub guid: Uuid,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// 下一个可分配的图元 ID
    pub next_element_id: ElementId,
    /// 默认模型序号
    pub default_model: u32,
}

impl FileInfo {
    pub fn fresh() -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4(),
            created_at: now,
            saved_at: now,
            next_element_id: 1,
            default_model: 0,
        }
    }
}

/// 结构段集合（种子复制的单位）
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub info: FileInfo,
    pub metadata: DgnMetadata,
    pub units: Units,
    pub colors: ColorTable,
    pub levels: LevelTable,
    pub models: Vec<ModelDefinition>,
}

impl Structure {
    fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(DgnError::InvalidFormat("Container has no models".to_string()));
        }
        if self.info.default_model as usize >= self.models.len() {
            return Err(DgnError::InvalidFormat(format!(
                "Default model {} out of range ({} models)",
                self.info.default_model,
                self.models.len()
            )));
        }
        if !self.colors.is_valid() {
            return Err(DgnError::InvalidFormat("Color table must have 256 entries".to_string()));
        }
        Ok(())
    }
}

/// 完整容器内容的借用视图，用于写入
pub(crate) struct ContainerImage<'a> {
    pub structure: &'a Structure,
    pub elements: Vec<&'a [Element]>,
}

/// 读取完整容器
pub(crate) fn read(path: &Path) -> Result<(Structure, Vec<Vec<Element>>)> {
    let (structure, elements) = read_sections(path, true)?;
    let elements = elements.ok_or_else(|| {
        DgnError::InvalidFormat("Missing ELEM section".to_string())
    })?;

    if elements.len() != structure.models.len() {
        return Err(DgnError::InvalidFormat(format!(
            "ELEM section has {} models, MODL section has {}",
            elements.len(),
            structure.models.len()
        )));
    }

    // 计数器必须大于所有已用 ID，否则新图元会与旧图元重号
    if let Some(max_id) = elements.iter().flatten().map(|e| e.id).max() {
        if structure.info.next_element_id <= max_id {
            return Err(DgnError::InvalidFormat(format!(
                "Next element id {} is not above stored id {}",
                structure.info.next_element_id, max_id
            )));
        }
    }

    tracing::info!(
        "Loaded {} elements, {} models from {}",
        elements.iter().map(Vec::len).sum::<usize>(),
        structure.models.len(),
        path.display()
    );

    Ok((structure, elements))
}

/// 只读取结构段，跳过图元数据
pub(crate) fn read_structure(path: &Path) -> Result<Structure> {
    let (structure, _) = read_sections(path, false)?;
    Ok(structure)
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DgnError::NotFound(path.display().to_string()),
        _ => DgnError::Io(e),
    })
}

fn read_sections(path: &Path, with_elements: bool) -> Result<(Structure, Option<Vec<Vec<Element>>>)> {
    let file = open_file(path)?;
    let mut reader = BufReader::new(file);

    let header = FileHeader::read(&mut reader)?;

    let mut info = None;
    let mut metadata = None;
    let mut units = None;
    let mut colors = None;
    let mut levels = None;
    let mut models = None;
    let mut elements = None;

    for _ in 0..header.section_count {
        let mut tag = [0u8; 4];
        read_exact(&mut reader, &mut tag, "section tag")?;
        let raw_size = read_u32(&mut reader, "section header")?;
        let size = read_u32(&mut reader, "section header")?;

        if raw_size > MAX_SECTION_SIZE || size > MAX_SECTION_SIZE {
            return Err(DgnError::InvalidFormat(format!(
                "Section {} is too large ({} bytes, {} compressed)",
                String::from_utf8_lossy(&tag),
                raw_size,
                size
            )));
        }

        let wanted = match tag {
            TAG_ELEM => with_elements,
            TAG_INFO | TAG_META | TAG_UNIT | TAG_COLR | TAG_LEVL | TAG_MODL => true,
            _ => {
                tracing::debug!("Skipping unknown section {}", String::from_utf8_lossy(&tag));
                false
            }
        };

        if !wanted {
            skip(&mut reader, size as u64, &tag)?;
            continue;
        }

        let mut compressed = vec![0u8; size as usize];
        read_exact(&mut reader, &mut compressed, "section data")?;

        match tag {
            TAG_INFO => info = Some(decode_section::<FileInfo>(&tag, &compressed, raw_size)?),
            TAG_META => metadata = Some(decode_section::<DgnMetadata>(&tag, &compressed, raw_size)?),
            TAG_UNIT => units = Some(decode_section::<Units>(&tag, &compressed, raw_size)?),
            TAG_COLR => colors = Some(decode_section::<ColorTable>(&tag, &compressed, raw_size)?),
            TAG_LEVL => levels = Some(decode_section::<LevelTable>(&tag, &compressed, raw_size)?),
            TAG_MODL => {
                models = Some(decode_section::<Vec<ModelDefinition>>(&tag, &compressed, raw_size)?)
            }
            TAG_ELEM => {
                elements = Some(decode_section::<Vec<Vec<Element>>>(&tag, &compressed, raw_size)?)
            }
            _ => {}
        }
    }

    let missing = |name: &str| DgnError::InvalidFormat(format!("Missing {} section", name));
    let structure = Structure {
        info: info.ok_or_else(|| missing("INFO"))?,
        metadata: metadata.ok_or_else(|| missing("META"))?,
        units: units.ok_or_else(|| missing("UNIT"))?,
        colors: colors.ok_or_else(|| missing("COLR"))?,
        levels: levels.ok_or_else(|| missing("LEVL"))?,
        models: models.ok_or_else(|| missing("MODL"))?,
    };
    structure.validate()?;

    Ok((structure, elements))
}

fn skip(reader: &mut impl Read, size: u64, tag: &[u8; 4]) -> Result<()> {
    let skipped = std::io::copy(&mut reader.take(size), &mut std::io::sink())?;
    if skipped != size {
        return Err(DgnError::InvalidFormat(format!(
            "Truncated section {}",
            String::from_utf8_lossy(tag)
        )));
    }
    Ok(())
}

fn decode_section<T: DeserializeOwned>(tag: &[u8; 4], compressed: &[u8], raw_size: u32) -> Result<T> {
    let name = String::from_utf8_lossy(tag);
    // 输出上限为声明的大小，超出即视为损坏
    let data = zstd::bulk::decompress(compressed, raw_size as usize).map_err(|e| {
        DgnError::InvalidFormat(format!("Section {} decompression failed: {}", name, e))
    })?;
    if data.len() != raw_size as usize {
        return Err(DgnError::InvalidFormat(format!(
            "Section {} size mismatch: expected {}, got {}",
            name,
            raw_size,
            data.len()
        )));
    }
    rmp_serde::from_slice(&data)
        .map_err(|e| DgnError::InvalidFormat(format!("Section {} is corrupt: {}", name, e)))
}

fn encode_section<T: Serialize>(tag: [u8; 4], value: &T, level: i32) -> Result<(([u8; 4], u32), Vec<u8>)> {
    let data = rmp_serde::to_vec(value)?;
    let compressed = zstd::encode_all(data.as_slice(), level)?;
    Ok(((tag, data.len() as u32), compressed))
}

/// 临时文件落到目标路径的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    /// 重命名，覆盖已有文件
    Replace,
    /// 硬链接，目标已存在时失败
    NoClobber,
}

/// 原子写入容器
///
/// 先写同目录下的临时文件并同步，再重命名到目标路径。失败时删除临时文件。
pub(crate) fn write(path: &Path, image: &ContainerImage<'_>, compression_level: i32) -> Result<()> {
    save(path, image, compression_level, Commit::Replace)
}

/// 原子写入新容器，目标路径已有文件时返回 `AlreadyExists` 且不改动该文件
pub(crate) fn write_new(path: &Path, image: &ContainerImage<'_>, compression_level: i32) -> Result<()> {
    save(path, image, compression_level, Commit::NoClobber)
}

fn save(path: &Path, image: &ContainerImage<'_>, compression_level: i32, commit: Commit) -> Result<()> {
    let structure = image.structure;
    let sections = vec![
        encode_section(TAG_INFO, &structure.info, compression_level)?,
        encode_section(TAG_META, &structure.metadata, compression_level)?,
        encode_section(TAG_UNIT, &structure.units, compression_level)?,
        encode_section(TAG_COLR, &structure.colors, compression_level)?,
        encode_section(TAG_LEVL, &structure.levels, compression_level)?,
        encode_section(TAG_MODL, &structure.models, compression_level)?,
        encode_section(TAG_ELEM, &image.elements, compression_level)?,
    ];

    let temp_path = temp_path_for(path);
    let result = write_file(&temp_path, &sections).and_then(|()| match commit {
        Commit::Replace => std::fs::rename(&temp_path, path),
        Commit::NoClobber => std::fs::hard_link(&temp_path, path),
    });

    if let Err(source) = result {
        std::fs::remove_file(&temp_path).ok();
        if commit == Commit::NoClobber && source.kind() == ErrorKind::AlreadyExists {
            return Err(DgnError::AlreadyExists(path.to_path_buf()));
        }
        return Err(DgnError::WriteError {
            path: path.to_path_buf(),
            source,
        });
    }

    if commit == Commit::NoClobber {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::warn!("Failed to remove {}: {}", temp_path.display(), e);
        }
    }

    tracing::info!(
        "Saved {} elements, {} models to {} ({} bytes compressed)",
        image.elements.iter().map(|e| e.len()).sum::<usize>(),
        structure.models.len(),
        path.display(),
        sections.iter().map(|(_, data)| data.len()).sum::<usize>()
    );

    Ok(())
}

fn write_file(path: &Path, sections: &[(([u8; 4], u32), Vec<u8>)]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    FileHeader::new(sections.len() as u32).write(&mut writer)?;

    for ((tag, raw_size), data) in sections {
        writer.write_all(tag)?;
        writer.write_all(&raw_size.to_le_bytes())?;
        writer.write_all(&(data.len() as u32).to_le_bytes())?;
        writer.write_all(data)?;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "container".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgn_core::{Dimension, ElementKind};
    use dgn_core::math::Point3;

    fn structure() -> Structure {
        Structure {
            info: FileInfo::fresh(),
            metadata: DgnMetadata::default(),
            units: Units::default(),
            colors: ColorTable::default(),
            levels: LevelTable::default(),
            models: vec![ModelDefinition::new("Default", Dimension::Two)],
        }
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.dgn");

        let structure = structure();
        let elements = vec![Element::new(1, ElementKind::Point(Point3::new(0.0, 1.0, 0.0)))];
        let image = ContainerImage {
            structure: &structure,
            elements: vec![elements.as_slice()],
        };
        write(&path, &image, 3).unwrap();

        // 验证文件头
        let mut reader = BufReader::new(File::open(&path).unwrap());
        let header = FileHeader::read(&mut reader).unwrap();
        assert_eq!(&header.magic, MAGIC);
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.section_count, 7);

        let (loaded, loaded_elements) = read(&path).unwrap();
        assert_eq!(loaded, structure);
        assert_eq!(loaded_elements, vec![elements]);

        assert_eq!(read_structure(&path).unwrap(), structure);
    }

    #[test]
    fn test_no_temp_file_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.dgn");
        let structure = structure();
        let image = ContainerImage {
            structure: &structure,
            elements: vec![&[][..]],
        };
        write(&path, &image, 3).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("clean.dgn")]);
    }

    #[test]
    fn test_write_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.dgn");
        let structure = structure();
        let image = ContainerImage {
            structure: &structure,
            elements: vec![&[][..]],
        };
        assert!(matches!(
            write(&path, &image, 3),
            Err(DgnError::WriteError { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.dgn");

        let mut file = File::create(&path).unwrap();
        file.write_all(b"XXXX").unwrap();
        file.write_all(&[0u8; 12]).unwrap();

        assert!(matches!(read(&path), Err(DgnError::InvalidFormat(_))));
    }

    #[test]
    fn test_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.dgn");
        std::fs::write(&path, b"DGN8\x01\x00").unwrap();
        assert!(matches!(read(&path), Err(DgnError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.dgn");
        assert!(matches!(read(&path), Err(DgnError::NotFound(_))));
    }

    /// 手工拼出只含一个 INFO 段的文件
    fn write_raw_info(path: &Path, raw_size: u32, payload: &[u8], declared_size: u32) {
        let mut file = File::create(path).unwrap();
        FileHeader::new(1).write(&mut file).unwrap();
        file.write_all(&TAG_INFO).unwrap();
        file.write_all(&raw_size.to_le_bytes()).unwrap();
        file.write_all(&declared_size.to_le_bytes()).unwrap();
        file.write_all(payload).unwrap();
    }

    #[test]
    fn test_section_larger_than_declared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bomb.dgn");

        let payload = zstd::encode_all(&vec![0u8; 1 << 20][..], 3).unwrap();
        write_raw_info(&path, 16, &payload, payload.len() as u32);

        match read_structure(&path) {
            Err(DgnError::InvalidFormat(message)) => assert!(message.contains("INFO")),
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_compressed_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.dgn");

        // 声明 4 GiB 的压缩数据，但文件里只有几个字节
        write_raw_info(&path, 16, b"tiny", u32::MAX);
        match read_structure(&path) {
            Err(DgnError::InvalidFormat(message)) => assert!(message.contains("too large")),
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_element_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.dgn");

        let mut structure = structure();
        structure.info.next_element_id = 5;
        let elements = vec![
            Element::new(3, ElementKind::Point(Point3::new(0.0, 0.0, 0.0))),
            Element::new(7, ElementKind::Point(Point3::new(1.0, 1.0, 0.0))),
        ];
        let image = ContainerImage {
            structure: &structure,
            elements: vec![elements.as_slice()],
        };
        write(&path, &image, 3).unwrap();

        assert!(matches!(read(&path), Err(DgnError::InvalidFormat(_))));

        structure.info.next_element_id = 8;
        let image = ContainerImage {
            structure: &structure,
            elements: vec![elements.as_slice()],
        };
        write(&path, &image, 3).unwrap();
        assert!(read(&path).is_ok());
    }

    #[test]
    fn test_write_new_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.dgn");
        std::fs::write(&path, b"someone else's data").unwrap();

        let structure = structure();
        let image = ContainerImage {
            structure: &structure,
            elements: vec![&[][..]],
        };
        assert!(matches!(
            write_new(&path, &image, 3),
            Err(DgnError::AlreadyExists(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"someone else's data");

        let fresh = dir.path().join("fresh.dgn");
        write_new(&fresh, &image, 3).unwrap();
        assert_eq!(read_structure(&fresh).unwrap(), structure);

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(names.is_empty());
    }
}
