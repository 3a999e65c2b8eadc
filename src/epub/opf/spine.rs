//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use crate::epub::xml::Element;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    /// 引用的清单项ID
    pub idref: String,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineEntry {
    /// 创建新的脊柱项
    pub fn new(idref: impl Into<String>) -> Self {
        Self::with_linear(idref, true)
    }

    /// 创建指定线性属性的脊柱项
    pub fn with_linear(idref: impl Into<String>, linear: bool) -> Self {
        Self {
            idref: idref.into(),
            linear,
        }
    }

    /// 从 `<itemref>` 元素解析
    ///
    /// 只有 `linear` 的值不区分大小写等于 `no` 时才是非线性的。
    pub fn from_element(element: &Element) -> Self {
        Self {
            idref: element.attr_or_empty("idref"),
            linear: !element
                .attr("linear")
                .is_some_and(|value| value.eq_ignore_ascii_case("no")),
        }
    }

    /// 序列化为 `<itemref/>` 元素
    pub fn to_element(&self) -> Element {
        let mut itemref = Element::new("itemref").with_attr("idref", self.idref.as_str());
        if !self.linear {
            itemref.set_attr("linear", "no");
        }
        itemref
    }

    /// 检查是否为线性阅读
    pub fn is_linear(&self) -> bool {
        self.linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::xml::parse_document;

    fn linear_of(xml: &str) -> bool {
        SpineEntry::from_element(&parse_document(xml.as_bytes()).unwrap()).linear
    }

    #[test]
    fn test_linear_defaults_to_true() {
        assert!(linear_of(r#"<itemref idref="a"/>"#));
        assert!(linear_of(r#"<itemref idref="a" linear=""/>"#));
        assert!(linear_of(r#"<itemref idref="a" linear="yes"/>"#));
        assert!(linear_of(r#"<itemref idref="a" linear="false"/>"#));
        assert!(linear_of(r#"<itemref idref="a" linear="nope"/>"#));
    }

    #[test]
    fn test_no_is_case_insensitive() {
        assert!(!linear_of(r#"<itemref idref="a" linear="no"/>"#));
        assert!(!linear_of(r#"<itemref idref="a" linear="NO"/>"#));
        assert!(!linear_of(r#"<itemref idref="a" linear="No"/>"#));
    }

    #[test]
    fn test_to_element() {
        let element = SpineEntry::with_linear("notes", false).to_element();
        assert_eq!(element.attr("linear"), Some("no"));
        assert_eq!(SpineEntry::new("ch1").to_element().attr("linear"), None);
    }
}
