//! NCX（Navigation Control file for XML）文件解析模块
//!
//! 此模块提供EPUB文件中NCX导航控制文件的文档模型，包括导航地图、页面列表和导航列表。
//! NCX文件主要用于定义EPUB的目录结构和导航信息。

pub mod navigation;
pub mod parser;

pub use navigation::{
    DEFAULT_MAX_NAV_DEPTH, NavLabel, NavList, NavMap, NavPoint, NavPoints, NavTarget, PageList,
    PageTarget,
};
pub use parser::{
    NCX_NAMESPACE, NCX_VERSION, NcxDocument, parse_navigation, parse_navigation_with_depth,
};
