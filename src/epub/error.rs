use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Epub相关的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML格式错误: {0}")]
    MalformedXml(#[from] quick_xml::Error),

    #[error("文档结构错误: {0}")]
    MalformedDocument(String),

    #[error("找不到唯一标识符: {0}")]
    MissingIdentifier(String),

    #[error("container.xml中没有匹配的rootfile: {0}")]
    RootfileNotFound(String),

    #[error("压缩包中不存在条目: {0}")]
    EntryNotFound(String),

    #[error("多个清单项共用同一个href: {0}")]
    AmbiguousHref(String),

    #[error("无效的mimetype: {expected}, 找到: {found}")]
    InvalidMimetype { expected: String, found: String },

    #[error("配置文件错误: {0}")]
    ConfigError(String),
}
