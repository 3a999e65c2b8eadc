//! OPF解析器模块
//!
//! 把 `<package>` 元素组装为 [`PackageDocument`]，并提供反向的序列化。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{
    guide::{GuideReference, parse_guide},
    manifest::ManifestItem,
    metadata::{Identifier, Metadata, OPF_NAMESPACE},
    spine::SpineEntry,
};
use crate::epub::xml::{Element, parse_document};
use std::collections::HashMap;

/// OPF包文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDocument {
    /// EPUB版本
    pub version: String,
    /// package的unique-identifier属性
    pub unique_identifier_id: String,
    /// unique-identifier指向的标识符
    pub uid: Identifier,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项(文件列表)，按文档顺序
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineEntry>,
    /// 脊柱的toc属性（NCX清单项ID）
    pub spine_toc: Option<String>,
    /// 指南引用
    pub guide: Vec<GuideReference>,
}

impl PackageDocument {
    /// 以给定的唯一标识符创建空的包文档
    ///
    /// 标识符会加入元数据；没有id时使用 `BookId`。
    pub fn new(mut uid: Identifier) -> Self {
        if uid.id.is_empty() {
            uid.id = "BookId".to_string();
        }

        let mut metadata = Metadata::new();
        metadata.identifiers.push(uid.clone());

        Self {
            version: "2.0".to_string(),
            unique_identifier_id: uid.id.clone(),
            uid,
            metadata,
            manifest: Vec::new(),
            spine: Vec::new(),
            spine_toc: None,
            guide: Vec::new(),
        }
    }

    /// 从 `<package>` 根元素组装包文档
    ///
    /// # 返回值
    /// * `Result<PackageDocument>` - 缺少metadata/manifest/spine时返回 `MalformedDocument`，
    ///   unique-identifier无法解析时返回 `MissingIdentifier`
    pub fn from_element(package: &Element) -> Result<PackageDocument> {
        // 按小写标签名分组，同名元素后者覆盖前者
        let mut sections: HashMap<String, &Element> = HashMap::new();
        for child in package.child_elements() {
            sections.insert(child.local_name().to_lowercase(), child);
        }

        let section = |name: &str| {
            sections.get(name).copied().ok_or_else(|| {
                EpubError::MalformedDocument(format!("OPF缺少<{}>元素", name))
            })
        };
        let metadata_element = section("metadata")?;
        let manifest_element = section("manifest")?;
        let spine_element = section("spine")?;

        let metadata = Metadata::from_element(metadata_element);

        let unique_identifier_id = package.attr_or_empty("unique-identifier");
        let uid = metadata
            .identifiers
            .iter()
            .find(|identifier| !unique_identifier_id.is_empty() && identifier.id == unique_identifier_id)
            .cloned()
            .ok_or_else(|| EpubError::MissingIdentifier(unique_identifier_id.clone()))?;

        let mut document = PackageDocument {
            version: package.attr_or_empty("version"),
            unique_identifier_id,
            uid,
            metadata,
            manifest: Vec::new(),
            spine: Vec::new(),
            spine_toc: spine_element.attr_opt("toc"),
            guide: Vec::new(),
        };

        for element in manifest_element.descendants_named("item") {
            document.add_item(ManifestItem::from_element(element))?;
        }

        document.spine = spine_element
            .descendants_named("itemref")
            .into_iter()
            .map(SpineEntry::from_element)
            .collect();

        if let Some(guide_element) = sections.get("guide") {
            document.guide = parse_guide(guide_element);
        }

        if let Some(toc) = &document.spine_toc {
            if document.get_item(toc).is_none() {
                log::warn!("spine的toc属性 {} 没有对应的清单项", toc);
            }
        }

        log::debug!(
            "OPF解析完成: {} 个清单项, {} 个脊柱项, {} 个指南引用",
            document.manifest.len(),
            document.spine.len(),
            document.guide.len()
        );

        Ok(document)
    }

    /// 序列化为 `<package>` 元素
    pub fn to_element(&self) -> Element {
        let mut package = Element::new("package").with_attr("xmlns", OPF_NAMESPACE);
        package.set_attr_nonempty("version", &self.version);
        package.set_attr("unique-identifier", self.unique_identifier_id.as_str());

        package.push_child(self.metadata.to_element());

        let mut manifest = Element::new("manifest");
        for item in &self.manifest {
            manifest.push_child(item.to_element());
        }
        package.push_child(manifest);

        let mut spine = Element::new("spine");
        if let Some(toc) = &self.spine_toc {
            spine.set_attr_nonempty("toc", toc);
        }
        for entry in &self.spine {
            spine.push_child(entry.to_element());
        }
        package.push_child(spine);

        if !self.guide.is_empty() {
            let mut guide = Element::new("guide");
            for reference in &self.guide {
                guide.push_child(reference.to_element());
            }
            package.push_child(guide);
        }

        package
    }

    /// 序列化为OPF文件字节
    pub fn to_xml_bytes(&self, indent: usize) -> Result<Vec<u8>> {
        self.to_element().to_xml_bytes(indent)
    }

    /// 添加清单项
    ///
    /// # 返回值
    /// * `Result<()>` - id已存在时返回 `MalformedDocument`
    pub fn add_item(&mut self, item: ManifestItem) -> Result<()> {
        if self.get_item(&item.id).is_some() {
            return Err(EpubError::MalformedDocument(format!(
                "清单项id重复: {}",
                item.id
            )));
        }
        self.manifest.push(item);
        Ok(())
    }

    pub fn add_spine_itemref(&mut self, idref: impl Into<String>, linear: bool) {
        self.spine.push(SpineEntry::with_linear(idref, linear));
    }

    pub fn add_guide_ref(
        &mut self,
        href: impl Into<String>,
        kind: impl Into<String>,
        title: impl Into<String>,
    ) {
        self.guide.push(GuideReference::new(href, kind, title));
    }

    /// 根据ID获取清单项
    pub fn get_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 根据href获取清单项
    ///
    /// # 返回值
    /// * `Ok(None)` - 没有匹配项
    /// * `Ok(Some(item))` - 唯一匹配
    /// * `Err(AmbiguousHref)` - 多个清单项共用这个href
    pub fn get_item_by_href(&self, href: &str) -> Result<Option<&ManifestItem>> {
        let mut matches = self.manifest.iter().filter(|item| item.href == href);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(EpubError::AmbiguousHref(href.to_string()));
        }
        Ok(first)
    }

    /// 获取spine的toc属性指向的NCX清单项
    pub fn toc_item(&self) -> Option<&ManifestItem> {
        self.spine_toc.as_deref().and_then(|toc| self.get_item(toc))
    }

    /// 按阅读顺序获取脊柱引用的清单项，跳过找不到的idref
    pub fn spine_items(&self) -> Vec<(&SpineEntry, &ManifestItem)> {
        self.spine
            .iter()
            .filter_map(|entry| self.get_item(&entry.idref).map(|item| (entry, item)))
            .collect()
    }

    /// 只包含线性阅读部分的清单项
    pub fn linear_items(&self) -> Vec<&ManifestItem> {
        self.spine_items()
            .into_iter()
            .filter(|(entry, _)| entry.is_linear())
            .map(|(_, item)| item)
            .collect()
    }
}

/// 解析OPF文件字节
pub fn parse_package(bytes: &[u8]) -> Result<PackageDocument> {
    PackageDocument::from_element(&parse_document(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
        <dc:title>Testing Epub</dc:title>
        <dc:creator opf:role="aut">Jane Doe</dc:creator>
        <dc:identifier id="BookId" opf:scheme="ISBN">1234</dc:identifier>
        <dc:language>en</dc:language>
        <meta name="cover" content="cover"/>
    </metadata>
    <manifest>
        <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
        <item id="Section0001.xhtml" href="Text/Section0001.xhtml" media-type="application/xhtml+xml"/>
        <item id="Section0002.xhtml" href="Text/Section0002.xhtml" media-type="application/xhtml+xml"/>
        <item id="notes" href="Text/notes.xhtml" media-type="application/xhtml+xml"/>
        <item id="cover" href="Images/cover.jpg" media-type="image/jpeg"/>
    </manifest>
    <spine toc="ncx">
        <itemref idref="Section0001.xhtml"/>
        <itemref idref="Section0002.xhtml"/>
        <itemref idref="notes" linear="no"/>
        <itemref idref="dangling"/>
    </spine>
    <guide>
        <reference type="cover" title="Cover" href="Images/cover.jpg"/>
    </guide>
</package>"#;

    #[test]
    fn test_parse_package() {
        let package = parse_package(OPF_XML.as_bytes()).unwrap();

        assert_eq!(package.version, "2.0");
        assert_eq!(
            package.uid,
            Identifier {
                value: "1234".into(),
                id: "BookId".into(),
                scheme: "ISBN".into(),
            }
        );

        let ids: Vec<&str> = package.manifest.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["ncx", "Section0001.xhtml", "Section0002.xhtml", "notes", "cover"]);

        assert_eq!(package.spine.len(), 4);
        assert!(!package.spine[2].linear);
        assert_eq!(package.guide.len(), 1);
        assert_eq!(package.toc_item().unwrap().href, "toc.ncx");
    }

    #[test]
    fn test_get_item() {
        let package = parse_package(OPF_XML.as_bytes()).unwrap();

        let item = package.get_item("Section0002.xhtml").unwrap();
        assert_eq!(item.href, "Text/Section0002.xhtml");
        assert!(package.get_item("BadId").is_none());
    }

    #[test]
    fn test_get_item_by_href() {
        let mut package = parse_package(OPF_XML.as_bytes()).unwrap();

        let item = package.get_item_by_href("Text/Section0002.xhtml").unwrap().unwrap();
        assert_eq!(item.id, "Section0002.xhtml");
        assert!(package.get_item_by_href("BadHref").unwrap().is_none());

        // 只改id，得到两个href相同的清单项
        let mut copy = item.clone();
        copy.id = "CopyOfSection0002.xhtml".to_string();
        package.add_item(copy).unwrap();

        let result = package.get_item_by_href("Text/Section0002.xhtml");
        assert!(matches!(result, Err(EpubError::AmbiguousHref(_))));
    }

    #[test]
    fn test_duplicate_manifest_id() {
        let xml = OPF_XML.replace(r#"id="notes""#, r#"id="cover""#);
        let result = parse_package(xml.as_bytes());
        assert!(matches!(result, Err(EpubError::MalformedDocument(_))));
    }

    #[test]
    fn test_missing_identifier() {
        let xml = OPF_XML.replace(r#"id="BookId" "#, "");
        let result = parse_package(xml.as_bytes());
        assert!(matches!(result, Err(EpubError::MissingIdentifier(id)) if id == "BookId"));

        let xml = OPF_XML.replace(r#" unique-identifier="BookId""#, "");
        let result = parse_package(xml.as_bytes());
        assert!(matches!(result, Err(EpubError::MissingIdentifier(_))));
    }

    #[test]
    fn test_missing_required_sections() {
        for section in ["metadata", "manifest", "spine"] {
            let start = OPF_XML.find(&format!("<{}", section)).unwrap();
            let end_tag = format!("</{}>", section);
            let end = OPF_XML.find(&end_tag).unwrap() + end_tag.len();
            let xml = format!("{}{}", &OPF_XML[..start], &OPF_XML[end..]);

            let result = parse_package(xml.as_bytes());
            assert!(
                matches!(result, Err(EpubError::MalformedDocument(_))),
                "删除<{}>后应当失败",
                section
            );
        }
    }

    #[test]
    fn test_guide_is_optional_and_toc_unresolved() {
        let start = OPF_XML.find("<guide>").unwrap();
        let end = OPF_XML.find("</guide>").unwrap() + "</guide>".len();
        let xml = format!("{}{}", &OPF_XML[..start], &OPF_XML[end..]).replace(r#"toc="ncx""#, r#"toc="nothing""#);

        let package = parse_package(xml.as_bytes()).unwrap();
        assert!(package.guide.is_empty());
        assert_eq!(package.spine_toc.as_deref(), Some("nothing"));
        assert!(package.toc_item().is_none());
    }

    #[test]
    fn test_deeply_nested_metadata_is_rejected() {
        let depth = 100_000;
        let nested = "<x>".repeat(depth) + &"</x>".repeat(depth);
        let xml = OPF_XML.replacen("</metadata>", &format!("{}</metadata>", nested), 1);
        assert!(matches!(
            parse_package(xml.as_bytes()),
            Err(EpubError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_spine_items_skip_dangling() {
        let package = parse_package(OPF_XML.as_bytes()).unwrap();

        assert_eq!(package.spine_items().len(), 3);
        let linear: Vec<&str> = package.linear_items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(linear, vec!["Section0001.xhtml", "Section0002.xhtml"]);
    }

    #[test]
    fn test_round_trip() {
        let package = parse_package(OPF_XML.as_bytes()).unwrap();
        let bytes = package.to_xml_bytes(2).unwrap();
        let reparsed = parse_package(&bytes).unwrap();
        assert_eq!(reparsed, package);
    }

    #[test]
    fn test_build_from_scratch() {
        let mut package = PackageDocument::new(Identifier {
            value: "urn:uuid:1".into(),
            id: String::new(),
            scheme: "UUID".into(),
        });
        package.metadata.add_title("Built", "");
        package.add_item(ManifestItem::new("ncx", "toc.ncx", "application/x-dtbncx+xml")).unwrap();
        package.add_item(ManifestItem::new("c1", "c1.xhtml", "application/xhtml+xml")).unwrap();
        assert!(package.add_item(ManifestItem::new("c1", "other.xhtml", "")).is_err());
        package.add_spine_itemref("c1", true);
        package.spine_toc = Some("ncx".into());
        package.add_guide_ref("c1.xhtml", "text", "Start");

        let reparsed = parse_package(&package.to_xml_bytes(0).unwrap()).unwrap();
        assert_eq!(reparsed.uid.id, "BookId");
        assert_eq!(reparsed, package);
    }
}
