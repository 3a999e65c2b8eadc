//! 指南模块
//!
//! `<guide>` 中的辅助引用（封面、扉页、目录等）。

use crate::epub::xml::Element;

/// 指南引用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideReference {
    pub href: String,
    /// 引用类型，如cover、title-page、toc
    pub kind: String,
    pub title: String,
}

impl GuideReference {
    pub fn new(href: impl Into<String>, kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            kind: kind.into(),
            title: title.into(),
        }
    }

    pub fn from_element(element: &Element) -> Self {
        Self {
            href: element.attr_or_empty("href"),
            kind: element.attr_or_empty("type"),
            title: element.attr_or_empty("title"),
        }
    }

    /// 序列化为 `<reference/>` 元素
    pub fn to_element(&self) -> Element {
        Element::new("reference")
            .with_attr("type", self.kind.as_str())
            .with_attr("title", self.title.as_str())
            .with_attr("href", self.href.as_str())
    }
}

/// 解析 `<guide>`，`<reference>` 和 `<ref>` 两种写法都接受
pub fn parse_guide(element: &Element) -> Vec<GuideReference> {
    let mut references = Vec::new();
    let mut stack: Vec<&Element> = element.child_elements().collect();
    stack.reverse();

    // 按文档顺序遍历，同时匹配两种标签
    while let Some(node) = stack.pop() {
        if matches!(node.local_name(), "reference" | "ref") {
            references.push(GuideReference::from_element(node));
        }
        let mark = stack.len();
        stack.extend(node.child_elements());
        stack[mark..].reverse();
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::xml::parse_document;

    #[test]
    fn test_parse_guide_in_order() {
        let guide = parse_document(
            br#"<guide>
    <reference type="cover" title="Cover" href="cover.xhtml"/>
    <ref type="toc" title="Contents" href="toc.xhtml"/>
</guide>"#,
        )
        .unwrap();

        let references = parse_guide(&guide);
        assert_eq!(
            references,
            vec![
                GuideReference::new("cover.xhtml", "cover", "Cover"),
                GuideReference::new("toc.xhtml", "toc", "Contents"),
            ]
        );
        assert_eq!(GuideReference::from_element(&references[1].to_element()), references[1]);
    }
}
