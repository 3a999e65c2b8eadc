//! XML元素树模块
//!
//! 基于quick-xml的轻量DOM：把字节解析为元素树，或者把元素树写回字节。
//! OPF和NCX模型只通过这里与XML打交道。

use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::DEFAULT_MAX_NAV_DEPTH;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::{Cursor, Write};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 导航层数之外，元素树还需要的层数（ncx、navMap、navLabel、text等）
pub(crate) const ELEMENT_DEPTH_MARGIN: usize = 8;

/// 元素树默认允许的最大嵌套层数
pub const DEFAULT_MAX_ELEMENT_DEPTH: usize = DEFAULT_MAX_NAV_DEPTH + ELEMENT_DEPTH_MARGIN;

/// 元素的子节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// XML元素
///
/// `name` 和属性名都保留原始的限定名（如 `dc:title`、`opf:role`），
/// 查询时按本地名匹配。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// 去掉命名空间前缀
fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// 设置属性，已存在同名属性时覆盖
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// 仅在值非空时设置属性
    pub fn set_attr_nonempty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.set_attr(key, value);
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// 追加文本，与前一个文本节点合并；空文本被忽略
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Node::Text(last)) => last.push_str(text),
            _ => self.children.push(Node::Text(text.to_string())),
        }
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// 读取属性值
    ///
    /// 先按限定名精确匹配，再按本地名匹配，
    /// 因此 `attr("role")` 和 `attr("opf:role")` 都能读到 `opf:role="aut"`。
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                let local = local_part(name);
                self.attributes
                    .iter()
                    .filter(|(key, _)| !key.starts_with("xmlns"))
                    .find(|(key, _)| local_part(key) == local)
            })
            .map(|(_, value)| value.as_str())
    }

    /// 读取属性值，缺失时返回空字符串
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_string()
    }

    /// 读取属性值，缺失或为空时返回None
    pub fn attr_opt(&self, name: &str) -> Option<String> {
        self.attr(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// 直接子文本节点拼接后的内容
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                text.push_str(t);
            }
        }
        text
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a, 'b>(
        &'a self,
        local: &'b str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'b> {
        self.child_elements()
            .filter(move |element| element.local_name() == local)
    }

    pub fn first_child(&self, local: &str) -> Option<&Element> {
        self.children_named(local).next()
    }

    /// 按文档顺序（深度优先）查找所有同名后代元素，不含自身
    pub fn descendants_named(&self, local: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();

        while let Some(element) = stack.pop() {
            if element.local_name() == local {
                found.push(element);
            }
            let mark = stack.len();
            stack.extend(element.child_elements());
            stack[mark..].reverse();
        }

        found
    }

    /// 把元素及其子树写入writer
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;

        Ok(())
    }

    /// 序列化为带XML声明的字节
    ///
    /// # 参数
    /// * `indent` - 缩进空格数，0表示不换行
    pub fn to_xml_bytes(&self, indent: usize) -> Result<Vec<u8>> {
        let mut writer = if indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;

        Ok(writer.into_inner().into_inner())
    }
}

/// 解析XML字节为元素树，返回根元素
///
/// 使用默认的最大嵌套层数，见 [`parse_document_with_depth`]。
pub fn parse_document(bytes: &[u8]) -> Result<Element> {
    parse_document_with_depth(bytes, DEFAULT_MAX_ELEMENT_DEPTH)
}

/// 解析XML字节为元素树，返回根元素
///
/// 空白文本会被裁剪，实体会被反转义，CDATA按普通文本处理。
///
/// # 参数
/// * `bytes` - XML原始字节
/// * `max_depth` - 元素允许的最大嵌套层数，根元素为第1层
///
/// # 返回值
/// * `Result<Element>` - 根元素；格式错误时返回 `MalformedXml`，
///   嵌套超过 `max_depth`、没有根元素或有多个根元素时返回 `MalformedDocument`
pub fn parse_document_with_depth(bytes: &[u8], max_depth: usize) -> Result<Element> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                if stack.len() >= max_depth {
                    return Err(EpubError::MalformedDocument(format!(
                        "XML元素嵌套超过{}层",
                        max_depth
                    )));
                }
                let element = start_element(e)?;
                if stack.is_empty() && root.is_some() {
                    return Err(EpubError::MalformedDocument(format!(
                        "XML文档有多个根元素: {}",
                        element.name
                    )));
                }
                stack.push(element);
            }
            Event::End(_) => {
                // 结束标签与开始标签的配对已由quick-xml校验
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(element),
                        None => root = Some(element),
                    }
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text);
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(open.name)).into());
    }

    root.ok_or_else(|| EpubError::MalformedDocument("XML文档没有根元素".to_string()))
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::MalformedXml(quick_xml::Error::InvalidAttr(err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// 读取第一个名为 `tag` 的后代元素的文本，不存在时返回空字符串
///
/// NCX中大量出现 `navLabel > text` 这种结构，这里统一处理。
pub fn child_text(element: &Element, tag: &str) -> String {
    element
        .descendants_named(tag)
        .first()
        .map(|found| found.text())
        .unwrap_or_default()
}

/// 构造 `<tag>text</tag>` 元素
pub fn text_element(tag: &str, text: &str) -> Element {
    let mut element = Element::new(tag);
    element.push_text(text);
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes_and_text() {
        let xml = br#"<?xml version="1.0"?>
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:creator opf:role="aut" opf:file-as="Doe, Jane">Jane &amp; Co</dc:creator>
    <dc:title><![CDATA[A <b> title]]></dc:title>
</metadata>"#;

        let root = parse_document(xml).unwrap();
        assert_eq!(root.local_name(), "metadata");

        let creator = root.first_child("creator").unwrap();
        assert_eq!(creator.name, "dc:creator");
        assert_eq!(creator.text(), "Jane & Co");
        assert_eq!(creator.attr("role"), Some("aut"));
        assert_eq!(creator.attr("opf:file-as"), Some("Doe, Jane"));
        assert_eq!(creator.attr("scheme"), None);

        let title = root.first_child("title").unwrap();
        assert_eq!(title.text(), "A <b> title");
    }

    #[test]
    fn test_bom_is_skipped() {
        let mut xml = UTF8_BOM.to_vec();
        xml.extend_from_slice(b"<root/>");
        let root = parse_document(&xml).unwrap();
        assert_eq!(root.name, "root");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_unclosed_element_is_malformed() {
        let result = parse_document(b"<root><child>text</child>");
        assert!(matches!(result, Err(EpubError::MalformedXml(_))));
    }

    #[test]
    fn test_mismatched_end_tag_is_malformed() {
        let result = parse_document(b"<root><a></b></root>");
        assert!(matches!(result, Err(EpubError::MalformedXml(_))));
    }

    #[test]
    fn test_no_root_element() {
        let result = parse_document(b"<?xml version=\"1.0\"?>");
        assert!(matches!(result, Err(EpubError::MalformedDocument(_))));
    }

    #[test]
    fn test_multiple_roots_are_rejected() {
        let result = parse_document(b"<a/><b/>");
        assert!(matches!(result, Err(EpubError::MalformedDocument(message)) if message.contains('b')));
    }

    #[test]
    fn test_element_depth_limit() {
        let xml = "<a>".repeat(4) + &"</a>".repeat(4);
        assert!(parse_document_with_depth(xml.as_bytes(), 4).is_ok());
        assert!(matches!(
            parse_document_with_depth(xml.as_bytes(), 3),
            Err(EpubError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_very_deep_document_is_rejected() {
        let depth = 100_000;
        let xml = "<x>".repeat(depth) + &"</x>".repeat(depth);
        assert!(matches!(
            parse_document(xml.as_bytes()),
            Err(EpubError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_first_child_outlives_name() {
        let root = parse_document(b"<a><b n=\"1\"/></a>").unwrap();
        let found = {
            let name = String::from("b");
            root.first_child(&name)
        };
        assert_eq!(found.and_then(|b| b.attr("n")), Some("1"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = parse_document(b"<a><x n=\"1\"><x n=\"2\"/></x><y><x n=\"3\"/></y></a>").unwrap();
        let found: Vec<&str> = root
            .descendants_named("x")
            .into_iter()
            .filter_map(|e| e.attr("n"))
            .collect();
        assert_eq!(found, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_child_text_helpers() {
        let mut label = Element::new("navLabel");
        label.push_child(text_element("text", "Chapter 1"));
        assert_eq!(child_text(&label, "text"), "Chapter 1");

        let empty = Element::new("navLabel");
        assert_eq!(child_text(&empty, "text"), "");
        assert!(text_element("text", "").children.is_empty());
    }

    #[test]
    fn test_write_then_parse_keeps_tree() {
        let mut root = Element::new("ncx").with_attr("version", "2005-1");
        let mut label = Element::new("navLabel");
        label.set_attr_nonempty("xml:lang", "fr");
        label.set_attr_nonempty("dir", "");
        label.push_child(text_element("text", "Été & <hiver>"));
        root.push_child(label);
        root.push_child(Element::new("content").with_attr("src", "a.html#x"));

        for indent in [0, 2] {
            let bytes = root.to_xml_bytes(indent).unwrap();
            let reparsed = parse_document(&bytes).unwrap();
            assert_eq!(reparsed, root);
        }
    }
}
