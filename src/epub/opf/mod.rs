//! OPF（Open Packaging Format）文件解析模块
//!
//! 此模块提供EPUB 2 OPF包文件的文档模型，包括元数据、清单、脊柱和指南的解析与序列化。

mod guide;
mod manifest;
mod metadata;
mod parser;
mod spine;

pub use guide::{GuideReference, parse_guide};
pub use manifest::ManifestItem;
pub use metadata::{Creator, DC_NAMESPACE, Date, Identifier, Meta, Metadata, OPF_NAMESPACE, Title};
pub use parser::{PackageDocument, parse_package};
pub use spine::SpineEntry;
