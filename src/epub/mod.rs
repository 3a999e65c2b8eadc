pub mod config;
pub mod container;
pub mod error;
pub mod ncx;
pub mod opf;
pub mod reader;
pub mod xml;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出配置
pub use config::{DEFAULT_CONFIG_PATH, EpubConfig, MIMETYPE_NCX};

// 重新导出容器相关
pub use container::{Container, MIMETYPE_OPF, RootFile, parse_container};

// 重新导出EPUB读取器
pub use reader::{Archive, ContentRef, Epub, MIMETYPE_EPUB, MemoryArchive, resolve_path};

// 重新导出OPF相关
pub use opf::{
    Creator, Date, GuideReference, Identifier, ManifestItem, Meta, Metadata, PackageDocument,
    SpineEntry, Title, parse_package,
};

// 重新导出NCX相关
pub use ncx::{
    NavLabel, NavList, NavMap, NavPoint, NavTarget, NcxDocument, PageList, PageTarget,
    parse_navigation, parse_navigation_with_depth,
};
