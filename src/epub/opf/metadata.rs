//! 元数据处理模块
//!
//! 提供OPF `<metadata>` 的结构定义、解析和序列化。

use crate::epub::xml::{Element, text_element};

/// Dublin Core命名空间
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
/// OPF命名空间
pub const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";

/// 标题及其语言
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    pub text: String,
    /// xml:lang，未指定时为空
    pub lang: String,
}

/// 创建者或贡献者信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Creator {
    /// 姓名
    pub name: String,
    /// MARC角色代码(如aut、edt、ill)
    pub role: String,
    /// 排序用名称
    pub file_as: String,
}

impl Creator {
    /// 创建作者，角色默认为 `aut`
    pub fn author(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: "aut".to_string(),
            file_as: String::new(),
        }
    }

    /// 创建贡献者，角色默认为 `oth`
    pub fn contributor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: "oth".to_string(),
            file_as: String::new(),
        }
    }
}

/// 日期及其事件类型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Date {
    pub date: String,
    /// opf:event，如publication、modification
    pub event: String,
}

/// 标识符信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    /// 标识符值
    pub value: String,
    /// 元素id，package的unique-identifier引用它
    pub id: String,
    /// 标识符类型(如ISBN、UUID等)
    pub scheme: String,
}

/// `<meta name="" content=""/>` 键值对
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub name: String,
    pub content: String,
}

/// OPF文件中的元数据信息
///
/// 可重复的元素按文档顺序保存；单值元素出现多次时保留最后一个。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub titles: Vec<Title>,
    pub creators: Vec<Creator>,
    pub subjects: Vec<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub contributors: Vec<Creator>,
    pub dates: Vec<Date>,
    pub dc_type: Option<String>,
    pub format: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub source: Option<String>,
    pub languages: Vec<String>,
    pub relation: Option<String>,
    pub coverage: Option<String>,
    pub rights: Option<String>,
    pub metas: Vec<Meta>,
}

/// 单值字段：空文本视为未设置
fn singleton(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

impl Metadata {
    /// 创建新的元数据实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 `<metadata>` 元素解析
    ///
    /// 缺少文本时得到空字符串，缺少属性时得到空字符串，不会失败。
    pub fn from_element(element: &Element) -> Self {
        let mut metadata = Metadata::new();

        for node in element.descendants_named("title") {
            metadata.titles.push(Title {
                text: node.text(),
                lang: node.attr_or_empty("xml:lang"),
            });
        }

        for node in element.descendants_named("creator") {
            metadata.creators.push(Self::creator_from(node));
        }

        for node in element.descendants_named("subject") {
            metadata.subjects.push(node.text());
        }

        for node in element.descendants_named("contributor") {
            metadata.contributors.push(Self::creator_from(node));
        }

        for node in element.descendants_named("date") {
            metadata.dates.push(Date {
                date: node.text(),
                event: node.attr_or_empty("opf:event"),
            });
        }

        for node in element.descendants_named("identifier") {
            metadata.identifiers.push(Identifier {
                value: node.text(),
                id: node.attr_or_empty("id"),
                scheme: node.attr_or_empty("opf:scheme"),
            });
        }

        for node in element.descendants_named("language") {
            metadata.languages.push(node.text());
        }

        for node in element.descendants_named("meta") {
            metadata.metas.push(Meta {
                name: node.attr_or_empty("name"),
                content: node.attr_or_empty("content"),
            });
        }

        // 单值元素：后出现的覆盖先出现的
        let last_text = |tag: &str| {
            element
                .descendants_named(tag)
                .last()
                .and_then(|node| singleton(node.text()))
        };
        metadata.description = last_text("description");
        metadata.publisher = last_text("publisher");
        metadata.dc_type = last_text("type");
        metadata.format = last_text("format");
        metadata.source = last_text("source");
        metadata.relation = last_text("relation");
        metadata.coverage = last_text("coverage");
        metadata.rights = last_text("rights");

        metadata
    }

    fn creator_from(node: &Element) -> Creator {
        Creator {
            name: node.text(),
            role: node.attr_or_empty("opf:role"),
            file_as: node.attr_or_empty("opf:file-as"),
        }
    }

    /// 序列化为 `<metadata>` 元素
    ///
    /// 元素按固定顺序输出；空的单值字段和空属性不输出。
    pub fn to_element(&self) -> Element {
        let mut metadata = Element::new("metadata")
            .with_attr("xmlns:dc", DC_NAMESPACE)
            .with_attr("xmlns:opf", OPF_NAMESPACE);

        for title in &self.titles {
            let mut node = text_element("dc:title", &title.text);
            node.set_attr_nonempty("xml:lang", &title.lang);
            metadata.push_child(node);
        }

        for creator in &self.creators {
            metadata.push_child(Self::creator_element("dc:creator", creator));
        }

        for subject in &self.subjects {
            metadata.push_child(text_element("dc:subject", subject));
        }

        Self::push_singleton(&mut metadata, "dc:description", &self.description);
        Self::push_singleton(&mut metadata, "dc:publisher", &self.publisher);

        for contributor in &self.contributors {
            metadata.push_child(Self::creator_element("dc:contributor", contributor));
        }

        for date in &self.dates {
            let mut node = text_element("dc:date", &date.date);
            node.set_attr_nonempty("opf:event", &date.event);
            metadata.push_child(node);
        }

        Self::push_singleton(&mut metadata, "dc:type", &self.dc_type);
        Self::push_singleton(&mut metadata, "dc:format", &self.format);

        for identifier in &self.identifiers {
            let mut node = text_element("dc:identifier", &identifier.value);
            node.set_attr_nonempty("id", &identifier.id);
            node.set_attr_nonempty("opf:scheme", &identifier.scheme);
            metadata.push_child(node);
        }

        Self::push_singleton(&mut metadata, "dc:source", &self.source);

        for language in &self.languages {
            metadata.push_child(text_element("dc:language", language));
        }

        Self::push_singleton(&mut metadata, "dc:relation", &self.relation);
        Self::push_singleton(&mut metadata, "dc:coverage", &self.coverage);
        Self::push_singleton(&mut metadata, "dc:rights", &self.rights);

        for meta in &self.metas {
            metadata.push_child(
                Element::new("meta")
                    .with_attr("name", meta.name.as_str())
                    .with_attr("content", meta.content.as_str()),
            );
        }

        metadata
    }

    fn creator_element(tag: &str, creator: &Creator) -> Element {
        let mut node = text_element(tag, &creator.name);
        node.set_attr_nonempty("opf:role", &creator.role);
        node.set_attr_nonempty("opf:file-as", &creator.file_as);
        node
    }

    fn push_singleton(metadata: &mut Element, tag: &str, value: &Option<String>) {
        if let Some(text) = value.as_deref().filter(|text| !text.is_empty()) {
            metadata.push_child(text_element(tag, text));
        }
    }

    pub fn add_title(&mut self, text: impl Into<String>, lang: impl Into<String>) {
        self.titles.push(Title {
            text: text.into(),
            lang: lang.into(),
        });
    }

    pub fn add_creator(&mut self, creator: Creator) {
        self.creators.push(creator);
    }

    pub fn add_subject(&mut self, subject: impl Into<String>) {
        self.subjects.push(subject.into());
    }

    pub fn add_contributor(&mut self, contributor: Creator) {
        self.contributors.push(contributor);
    }

    pub fn add_date(&mut self, date: impl Into<String>, event: impl Into<String>) {
        self.dates.push(Date {
            date: date.into(),
            event: event.into(),
        });
    }

    pub fn add_identifier(
        &mut self,
        value: impl Into<String>,
        id: impl Into<String>,
        scheme: impl Into<String>,
    ) {
        self.identifiers.push(Identifier {
            value: value.into(),
            id: id.into(),
            scheme: scheme.into(),
        });
    }

    pub fn add_language(&mut self, language: impl Into<String>) {
        self.languages.push(language.into());
    }

    pub fn add_meta(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.metas.push(Meta {
            name: name.into(),
            content: content.into(),
        });
    }

    /// 根据元素id查找标识符
    pub fn identifier_by_id(&self, id: &str) -> Option<&Identifier> {
        self.identifiers.iter().find(|identifier| identifier.id == id)
    }

    /// 获取第一个scheme为ISBN（不区分大小写）的标识符值
    pub fn isbn(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|identifier| identifier.scheme.eq_ignore_ascii_case("isbn"))
            .map(|identifier| identifier.value.as_str())
    }

    /// 获取第一个标题文本
    pub fn title(&self) -> Option<&str> {
        self.titles.first().map(|title| title.text.as_str())
    }

    /// 根据name查找meta的content
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metas
            .iter()
            .find(|meta| meta.name == name)
            .map(|meta| meta.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::xml::parse_document;

    const METADATA_XML: &str = r#"<metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title xml:lang="en">Testing Epub</dc:title>
    <dc:title>Second Title</dc:title>
    <dc:creator opf:role="aut" opf:file-as="Doe, Jane">Jane Doe</dc:creator>
    <dc:creator>Anonymous</dc:creator>
    <dc:contributor opf:role="ill">Bob</dc:contributor>
    <dc:subject>Fiction</dc:subject>
    <dc:subject>Testing</dc:subject>
    <dc:publisher>First Publisher</dc:publisher>
    <dc:publisher>Second Publisher</dc:publisher>
    <dc:date opf:event="publication">2010-05-01</dc:date>
    <dc:identifier id="BookId" opf:scheme="ISBN">1234</dc:identifier>
    <dc:identifier opf:scheme="UUID">urn:uuid:42</dc:identifier>
    <dc:language>en</dc:language>
    <dc:rights></dc:rights>
    <meta name="cover" content="cover-image"/>
</metadata>"#;

    fn parse(xml: &str) -> Metadata {
        Metadata::from_element(&parse_document(xml.as_bytes()).unwrap())
    }

    #[test]
    fn test_repeatable_elements_keep_order() {
        let metadata = parse(METADATA_XML);

        assert_eq!(
            metadata.titles,
            vec![
                Title { text: "Testing Epub".into(), lang: "en".into() },
                Title { text: "Second Title".into(), lang: String::new() },
            ]
        );
        assert_eq!(metadata.subjects, vec!["Fiction", "Testing"]);
        assert_eq!(metadata.languages, vec!["en"]);
        assert_eq!(metadata.metas, vec![Meta { name: "cover".into(), content: "cover-image".into() }]);
    }

    #[test]
    fn test_missing_attributes_default_to_empty() {
        let metadata = parse(METADATA_XML);

        assert_eq!(metadata.creators[0].role, "aut");
        assert_eq!(metadata.creators[0].file_as, "Doe, Jane");
        assert_eq!(metadata.creators[1].role, "");
        assert_eq!(metadata.creators[1].file_as, "");
        assert_eq!(metadata.contributors[0].role, "ill");
        assert_eq!(metadata.identifiers[1].id, "");
        assert_eq!(metadata.dates[0].event, "publication");
    }

    #[test]
    fn test_singletons_are_last_wins() {
        let metadata = parse(METADATA_XML);

        assert_eq!(metadata.publisher.as_deref(), Some("Second Publisher"));
        assert_eq!(metadata.rights, None);
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn test_empty_text_yields_empty_string() {
        let metadata = parse("<metadata><dc:title/><dc:subject></dc:subject></metadata>");
        assert_eq!(metadata.titles[0].text, "");
        assert_eq!(metadata.subjects, vec![""]);
    }

    #[test]
    fn test_isbn_lookup() {
        let metadata = parse(METADATA_XML);
        assert_eq!(metadata.isbn(), Some("1234"));
        assert_eq!(metadata.identifier_by_id("BookId").unwrap().scheme, "ISBN");
        assert!(metadata.identifier_by_id("missing").is_none());
    }

    #[test]
    fn test_constructor_defaults() {
        let mut metadata = Metadata::new();
        metadata.add_creator(Creator::author("A"));
        metadata.add_contributor(Creator::contributor("B"));
        assert_eq!(metadata.creators[0].role, "aut");
        assert_eq!(metadata.contributors[0].role, "oth");
    }

    #[test]
    fn test_canonical_order_and_round_trip() {
        let metadata = parse(METADATA_XML);
        let element = metadata.to_element();

        let tags: Vec<&str> = element.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "dc:title", "dc:title", "dc:creator", "dc:creator", "dc:subject", "dc:subject",
                "dc:publisher", "dc:contributor", "dc:date", "dc:identifier", "dc:identifier",
                "dc:language", "meta",
            ]
        );

        // 空属性不输出
        let anonymous = element.children_named("creator").nth(1).unwrap();
        assert!(anonymous.attributes.is_empty());

        let bytes = element.to_xml_bytes(2).unwrap();
        let reparsed = Metadata::from_element(&parse_document(&bytes).unwrap());
        assert_eq!(reparsed, metadata);
    }
}
