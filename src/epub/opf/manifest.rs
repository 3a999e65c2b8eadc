//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

use crate::epub::config::MIMETYPE_NCX;
use crate::epub::xml::Element;

/// 清单项信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID，在清单内唯一
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: Option<String>,
    /// 回退清单项ID
    pub fallback: Option<String>,
    pub required_namespace: Option<String>,
    pub required_modules: Option<String>,
    /// 回退样式表的清单项ID
    pub fallback_style: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        Self {
            id: id.into(),
            href: href.into(),
            media_type: if media_type.is_empty() { None } else { Some(media_type) },
            ..Self::default()
        }
    }

    /// 从 `<item>` 元素解析，缺失的属性为空
    pub fn from_element(element: &Element) -> Self {
        Self {
            id: element.attr_or_empty("id"),
            href: element.attr_or_empty("href"),
            media_type: element.attr_opt("media-type"),
            fallback: element.attr_opt("fallback"),
            required_namespace: element.attr_opt("required-namespace"),
            required_modules: element.attr_opt("required-modules"),
            fallback_style: element.attr_opt("fallback-style"),
        }
    }

    /// 序列化为 `<item/>` 元素
    pub fn to_element(&self) -> Element {
        let mut item = Element::new("item")
            .with_attr("id", self.id.as_str())
            .with_attr("href", self.href.as_str());

        let optional = [
            ("media-type", &self.media_type),
            ("fallback", &self.fallback),
            ("required-namespace", &self.required_namespace),
            ("required-modules", &self.required_modules),
            ("fallback-style", &self.fallback_style),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                item.set_attr_nonempty(key, value);
            }
        }

        item
    }

    fn media_type_is(&self, expected: &str) -> bool {
        self.media_type.as_deref() == Some(expected)
    }

    /// 检查是否为NCX文件
    pub fn is_ncx(&self) -> bool {
        self.media_type_is(MIMETYPE_NCX)
    }

    /// 检查是否为图片文件
    pub fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|media_type| media_type.starts_with("image/"))
    }

    /// 检查是否为CSS文件
    pub fn is_css(&self) -> bool {
        self.media_type_is("text/css")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type_is("application/xhtml+xml")
    }
}
