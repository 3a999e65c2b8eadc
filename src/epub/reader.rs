//! EPUB读取模块
//!
//! 通过压缩包读取container.xml、OPF和NCX，组装为一本 [`Epub`]，
//! 并支持按清单项读取内容、把修改后的OPF/NCX写回新的压缩包。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::epub::config::EpubConfig;
use crate::epub::container::Container;
use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::{NcxDocument, parse_navigation_with_depth};
use crate::epub::opf::{ManifestItem, PackageDocument, parse_package};

/// mimetype条目的期望内容
pub const MIMETYPE_EPUB: &str = "application/epub+zip";

/// 压缩包条目读取接口
pub trait Archive {
    /// 读取条目的全部字节，条目不存在时返回 `EntryNotFound`
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>>;

    /// 列出所有条目路径
    fn list_entries(&self) -> Vec<String>;
}

impl<R: Read + Seek> Archive for ZipArchive<R> {
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = match self.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(EpubError::EntryNotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn list_entries(&self) -> Vec<String> {
        self.file_names().map(str::to_string).collect()
    }
}

/// 内存中的压缩包，条目按路径排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加或替换条目
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), bytes.into());
    }

    pub fn with_entry(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl Archive for MemoryArchive {
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| EpubError::EntryNotFound(path.to_string()))
    }

    fn list_entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// 内容引用：相对OPF目录的路径，或者一个清单项
#[derive(Debug, Clone, Copy)]
pub enum ContentRef<'a> {
    Path(&'a str),
    Item(&'a ManifestItem),
}

impl ContentRef<'_> {
    fn href(&self) -> &str {
        match self {
            ContentRef::Path(path) => *path,
            ContentRef::Item(item) => item.href.as_str(),
        }
    }
}

impl<'a> From<&'a str> for ContentRef<'a> {
    fn from(path: &'a str) -> Self {
        ContentRef::Path(path)
    }
}

impl<'a> From<&'a ManifestItem> for ContentRef<'a> {
    fn from(item: &'a ManifestItem) -> Self {
        ContentRef::Item(item)
    }
}

/// 获取OPF文件所在目录，根目录时为空字符串
pub fn content_dir(opf_path: &str) -> &str {
    opf_path.rfind('/').map_or("", |index| &opf_path[..index])
}

/// 把相对OPF的href解析为压缩包内路径
///
/// 只做目录拼接，不对 `..` 或 `.` 做规范化。
pub fn resolve_path(opf_path: &str, href: &str) -> String {
    match content_dir(opf_path) {
        "" => href.to_string(),
        dir => format!("{}/{}", dir, href),
    }
}

/// 表示一个EPUB文件
pub struct Epub<A: Archive = ZipArchive<File>> {
    archive: A,
    config: EpubConfig,
    opf_path: String,
    package: PackageDocument,
    toc_path: Option<String>,
    toc: Option<NcxDocument>,
}

impl Epub<ZipArchive<File>> {
    /// 从文件路径打开EPUB，使用默认配置
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub>` - 成功返回Epub实例，失败返回错误
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, EpubConfig::default())
    }

    /// 从文件路径打开EPUB
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: EpubConfig) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        Self::from_archive_with_config(archive, config)
    }
}

impl<A: Archive> Epub<A> {
    pub fn from_archive(archive: A) -> Result<Self> {
        Self::from_archive_with_config(archive, EpubConfig::default())
    }

    /// 从压缩包组装EPUB
    ///
    /// 依次校验mimetype、解析container.xml、OPF，再解析spine的toc指向的NCX。
    ///
    /// # 返回值
    /// * `Result<Epub<A>>` - `strict_navigation` 关闭时NCX的错误只记录日志
    pub fn from_archive_with_config(mut archive: A, config: EpubConfig) -> Result<Self> {
        if config.check_mimetype {
            validate_mimetype(&mut archive)?;
        }

        let container = Container::parse(&archive.read_entry(&config.container_path)?)?;
        let opf_path = container.opf_path(&config.opf_media_type)?.to_string();
        log::debug!("OPF路径: {}", opf_path);

        let package = parse_package(&archive.read_entry(&opf_path)?)?;

        let toc_path = find_toc_item(&package, &config)
            .map(|item| resolve_path(&opf_path, &item.href));

        let toc = match &toc_path {
            Some(path) => {
                let parsed = archive
                    .read_entry(path)
                    .and_then(|bytes| parse_navigation_with_depth(&bytes, config.max_nav_depth));
                match parsed {
                    Ok(ncx) => Some(ncx),
                    Err(e) if !config.strict_navigation => {
                        log::warn!("NCX解析失败，忽略导航: {}: {}", path, e);
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        Ok(Epub {
            archive,
            config,
            opf_path,
            package,
            toc_path: if toc.is_some() { toc_path } else { None },
            toc,
        })
    }

    /// OPF文件在压缩包中的路径
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// OPF文件所在目录，清单项的href相对于它
    pub fn content_dir(&self) -> &str {
        content_dir(&self.opf_path)
    }

    pub fn package(&self) -> &PackageDocument {
        &self.package
    }

    pub fn package_mut(&mut self) -> &mut PackageDocument {
        &mut self.package
    }

    /// NCX导航文档，没有或未能解析时为None
    pub fn toc(&self) -> Option<&NcxDocument> {
        self.toc.as_ref()
    }

    pub fn toc_mut(&mut self) -> Option<&mut NcxDocument> {
        self.toc.as_mut()
    }

    /// NCX文件在压缩包中的路径
    pub fn toc_path(&self) -> Option<&str> {
        self.toc_path.as_deref()
    }

    pub fn config(&self) -> &EpubConfig {
        &self.config
    }

    /// 读取内容的原始字节
    ///
    /// 路径和清单项的href都相对OPF所在目录解析。
    pub fn read<'a>(&mut self, content: impl Into<ContentRef<'a>>) -> Result<Vec<u8>> {
        let path = resolve_path(&self.opf_path, content.into().href());
        self.archive.read_entry(&path)
    }

    /// 读取内容并按UTF-8解码
    pub fn read_to_string<'a>(&mut self, content: impl Into<ContentRef<'a>>) -> Result<String> {
        let bytes = self.read(content)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }

    /// 根据清单项ID读取内容，ID不存在时返回None
    pub fn read_by_id(&mut self, id: &str) -> Result<Option<Vec<u8>>> {
        let Some(href) = self.package.get_item(id).map(|item| item.href.clone()) else {
            return Ok(None);
        };
        self.read(href.as_str()).map(Some)
    }

    /// 列出EPUB文件中的所有条目
    pub fn list_entries(&self) -> Vec<String> {
        self.archive.list_entries()
    }

    /// 序列化OPF和NCX，返回 `(压缩包路径, 字节)` 列表
    pub fn serialized_entries(&self, indent: usize) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = vec![(self.opf_path.clone(), self.package.to_xml_bytes(indent)?)];

        if let (Some(path), Some(toc)) = (&self.toc_path, &self.toc) {
            entries.push((path.clone(), toc.to_xml_bytes(indent)?));
        }

        Ok(entries)
    }

    /// 把整本书写入新的压缩包
    ///
    /// OPF和NCX用当前的文档模型替换，其他条目原样复制。
    /// mimetype总是第一个条目且不压缩。
    pub fn write_zip<W: Write + Seek>(&mut self, writer: W) -> Result<W> {
        let replaced: BTreeMap<String, Vec<u8>> = self
            .serialized_entries(self.config.indent)?
            .into_iter()
            .collect();

        let stored = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::<()>::default();

        let mut zip = ZipWriter::new(writer);
        zip.start_file("mimetype", stored)?;
        zip.write_all(MIMETYPE_EPUB.as_bytes())?;

        for entry in self.archive.list_entries() {
            if entry == "mimetype" {
                continue;
            }
            if entry.ends_with('/') {
                zip.add_directory(entry.as_str(), deflated)?;
                continue;
            }

            let bytes = match replaced.get(&entry) {
                Some(bytes) => bytes.clone(),
                None => self.archive.read_entry(&entry)?,
            };
            zip.start_file(entry.as_str(), deflated)?;
            zip.write_all(&bytes)?;
        }

        log::debug!("已写出EPUB: {} 个条目被替换", replaced.len());
        Ok(zip.finish()?)
    }
}

/// 验证mimetype条目
///
/// 条目缺失只记录警告，内容不符时返回 `InvalidMimetype`。
fn validate_mimetype<A: Archive>(archive: &mut A) -> Result<()> {
    match archive.read_entry("mimetype") {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            // 去除可能的换行符和空白字符
            let content = content.trim();
            if content != MIMETYPE_EPUB {
                return Err(EpubError::InvalidMimetype {
                    expected: MIMETYPE_EPUB.to_string(),
                    found: content.to_string(),
                });
            }
            Ok(())
        }
        Err(EpubError::EntryNotFound(_)) => {
            log::warn!("EPUB缺少mimetype条目");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// spine的toc属性指向的清单项
///
/// 只有开启 `ncx_fallback` 时，才会退回到第一个NCX媒体类型的清单项。
fn find_toc_item<'a>(package: &'a PackageDocument, config: &EpubConfig) -> Option<&'a ManifestItem> {
    if let Some(item) = package.toc_item() {
        return Some(item);
    }
    if !config.ncx_fallback {
        return None;
    }

    let fallback = package
        .manifest
        .iter()
        .find(|item| item.media_type.as_deref() == Some(config.ncx_media_type.as_str()));
    if let Some(item) = fallback {
        log::debug!("spine的toc无法解析，使用清单项: {}", item.id);
    }
    fallback
}
