//! NCX解析器模块
//!
//! 把 `<ncx>` 元素组装为 [`NcxDocument`]，并提供反向的序列化。

use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::navigation::{DEFAULT_MAX_NAV_DEPTH, NavList, NavMap, PageList};
use crate::epub::xml::{
    ELEMENT_DEPTH_MARGIN, Element, child_text, parse_document_with_depth, text_element,
};

/// NCX的XML命名空间
pub const NCX_NAMESPACE: &str = "http://www.daisy.org/z3986/2005/ncx/";

/// 默认NCX版本
pub const NCX_VERSION: &str = "2005-1";

/// NCX导航文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcxDocument {
    /// NCX版本，源文档没有version属性时为None
    pub version: Option<String>,
    /// xml:lang
    pub lang: Option<String>,
    /// dtb:uid，应与OPF的唯一标识符一致
    pub uid: String,
    /// dtb:depth
    pub depth: String,
    /// dtb:totalPageCount
    pub total_page_count: String,
    /// dtb:maxPageNumber
    pub max_page_number: String,
    /// dtb:generator
    pub generator: String,
    /// docTitle中的文本
    pub title: String,
    /// docAuthor中的文本，按文档顺序
    pub authors: Vec<String>,
    pub nav_map: NavMap,
    pub page_list: Option<PageList>,
    pub nav_lists: Vec<NavList>,
}

impl NcxDocument {
    /// 创建只有标题的空导航文档
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: Some(NCX_VERSION.to_string()),
            lang: None,
            uid: String::new(),
            depth: String::new(),
            total_page_count: String::new(),
            max_page_number: String::new(),
            generator: String::new(),
            title: title.into(),
            authors: Vec::new(),
            nav_map: NavMap::new(),
            page_list: None,
            nav_lists: Vec::new(),
        }
    }

    /// 从 `<ncx>` 根元素组装导航文档
    ///
    /// # 参数
    /// * `ncx` - 根元素
    /// * `max_depth` - navPoint允许的最大嵌套层数
    ///
    /// # 返回值
    /// * `Result<NcxDocument>` - 缺少docTitle或navMap时返回 `MalformedDocument`
    pub fn from_element(ncx: &Element, max_depth: usize) -> Result<NcxDocument> {
        let doc_title = ncx
            .first_child("docTitle")
            .ok_or_else(|| EpubError::MalformedDocument("NCX缺少docTitle".to_string()))?;
        let nav_map = ncx
            .first_child("navMap")
            .ok_or_else(|| EpubError::MalformedDocument("NCX缺少navMap".to_string()))?;

        let mut document = NcxDocument::new(child_text(doc_title, "text"));
        document.version = ncx.attr_opt("version");
        document.lang = ncx.attr_opt("xml:lang");

        if let Some(head) = ncx.first_child("head") {
            for meta in head.descendants_named("meta") {
                let content = meta.attr_or_empty("content");
                match meta.attr("name").unwrap_or_default() {
                    "dtb:uid" => document.uid = content,
                    "dtb:depth" => document.depth = content,
                    "dtb:totalPageCount" => document.total_page_count = content,
                    "dtb:maxPageNumber" => document.max_page_number = content,
                    "dtb:generator" => document.generator = content,
                    _ => {}
                }
            }
        }

        document.authors = ncx
            .children_named("docAuthor")
            .map(|author| child_text(author, "text"))
            .collect();
        document.nav_map = NavMap::from_element(nav_map, max_depth)?;
        document.page_list = ncx.first_child("pageList").map(PageList::from_element);
        document.nav_lists = ncx.children_named("navList").map(NavList::from_element).collect();

        log::debug!(
            "NCX解析完成: {} 个导航点, 深度 {}",
            document.nav_map.iter().count(),
            document.nav_map.depth()
        );

        Ok(document)
    }

    /// 序列化为 `<ncx>` 元素，head中只写出非空的meta
    pub fn to_element(&self) -> Element {
        let mut ncx = Element::new("ncx").with_attr("xmlns", NCX_NAMESPACE);
        if let Some(version) = &self.version {
            ncx.set_attr("version", version);
        }
        if let Some(lang) = &self.lang {
            ncx.set_attr_nonempty("xml:lang", lang);
        }

        let mut head = Element::new("head");
        for (name, content) in [
            ("dtb:uid", &self.uid),
            ("dtb:depth", &self.depth),
            ("dtb:totalPageCount", &self.total_page_count),
            ("dtb:maxPageNumber", &self.max_page_number),
            ("dtb:generator", &self.generator),
        ] {
            if !content.is_empty() {
                head.push_child(
                    Element::new("meta")
                        .with_attr("name", name)
                        .with_attr("content", content.as_str()),
                );
            }
        }
        ncx.push_child(head);

        let mut doc_title = Element::new("docTitle");
        doc_title.push_child(text_element("text", &self.title));
        ncx.push_child(doc_title);

        for author in &self.authors {
            let mut doc_author = Element::new("docAuthor");
            doc_author.push_child(text_element("text", author));
            ncx.push_child(doc_author);
        }

        ncx.push_child(self.nav_map.to_element());
        if let Some(page_list) = &self.page_list {
            ncx.push_child(page_list.to_element());
        }
        for nav_list in &self.nav_lists {
            ncx.push_child(nav_list.to_element());
        }

        ncx
    }

    /// 序列化为NCX文件字节
    pub fn to_xml_bytes(&self, indent: usize) -> Result<Vec<u8>> {
        self.to_element().to_xml_bytes(indent)
    }

    /// 用导航树的实际层数更新dtb:depth
    pub fn update_depth(&mut self) {
        self.depth = self.nav_map.depth().to_string();
    }
}

/// 解析NCX文件字节，使用默认的最大嵌套层数
pub fn parse_navigation(bytes: &[u8]) -> Result<NcxDocument> {
    parse_navigation_with_depth(bytes, DEFAULT_MAX_NAV_DEPTH)
}

/// 解析NCX文件字节
///
/// 元素树的嵌套层数同样受 `max_depth` 约束，过深的文档在建树前即被拒绝。
pub fn parse_navigation_with_depth(bytes: &[u8], max_depth: usize) -> Result<NcxDocument> {
    let root = parse_document_with_depth(bytes, max_depth.saturating_add(ELEMENT_DEPTH_MARGIN))?;
    NcxDocument::from_element(&root, max_depth)
}
