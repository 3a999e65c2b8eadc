pub mod epub;

// === 核心API重新导出 ===

/// EPUB文件（主要接口）
pub use epub::{Archive, ContentRef, Epub, MemoryArchive, resolve_path};

/// 错误处理
pub use epub::{EpubError, Result};

/// 配置
pub use epub::{DEFAULT_CONFIG_PATH, EpubConfig};

// === 文档模型 ===

/// 容器组件
pub use epub::{Container, RootFile, parse_container};

/// OPF组件
pub use epub::{
    Creator, Date, GuideReference, Identifier, ManifestItem, Meta, Metadata, PackageDocument,
    SpineEntry, Title, parse_package,
};

/// NCX组件
pub use epub::{
    NavLabel, NavList, NavMap, NavPoint, NavTarget, NcxDocument, PageList, PageTarget,
    parse_navigation, parse_navigation_with_depth,
};

// === 库信息 ===

/// opfkit库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// opfkit库的描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// === 便捷函数 ===

/// 快速打开EPUB文件
///
/// 这是 `Epub::open` 的便捷包装函数。
///
/// # 参数
/// * `path` - EPUB文件路径
///
/// # 返回值
/// * `Result<Epub>` - EPUB实例
///
/// # 示例
///
/// ```no_run
/// let epub = opfkit::open("book.epub")?;
/// println!("书名: {}", epub.package().metadata.title().unwrap_or_default());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Epub> {
    Epub::open(path)
}
