use crate::epub::error::{EpubError, Result};
use crate::epub::xml::parse_document;

/// OPF包文件的媒体类型
pub const MIMETYPE_OPF: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `bytes` - container.xml的原始字节
    ///
    /// # 返回值
    /// * `Result<Container>` - 所有rootfile条目，按文档顺序
    pub fn parse(bytes: &[u8]) -> Result<Container> {
        let root = parse_document(bytes)?;

        let rootfiles = root
            .descendants_named("rootfile")
            .into_iter()
            .map(|e| RootFile {
                full_path: e.attr_or_empty("full-path"),
                media_type: e.attr_or_empty("media-type"),
            })
            .collect();

        Ok(Container { rootfiles })
    }

    /// 获取第一个媒体类型匹配的rootfile路径
    ///
    /// # 返回值
    /// * `Result<&str>` - 没有匹配项时返回 `RootfileNotFound`
    pub fn opf_path(&self, media_type: &str) -> Result<&str> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.media_type == media_type)
            .map(|rootfile| rootfile.full_path.as_str())
            .ok_or_else(|| EpubError::RootfileNotFound(media_type.to_string()))
    }
}

/// 从container.xml中解析OPF文件路径
pub fn parse_container(bytes: &[u8]) -> Result<String> {
    Container::parse(bytes)?
        .opf_path(MIMETYPE_OPF)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container_xml = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/toc.ncx" media-type="application/x-dtbncx+xml"/>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse(container_xml).unwrap();
        assert_eq!(container.rootfiles.len(), 2);
        assert_eq!(container.rootfiles[0].full_path, "OEBPS/toc.ncx");
        assert_eq!(container.opf_path(MIMETYPE_OPF).unwrap(), "OEBPS/content.opf");
        assert_eq!(parse_container(container_xml).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_first_matching_rootfile_wins() {
        let container_xml = br#"<container><rootfiles>
<rootfile full-path="a.opf" media-type="application/oebps-package+xml"/>
<rootfile full-path="b.opf" media-type="application/oebps-package+xml"/>
</rootfiles></container>"#;

        assert_eq!(parse_container(container_xml).unwrap(), "a.opf");
    }

    #[test]
    fn test_rootfile_not_found() {
        let container_xml = br#"<container><rootfiles>
<rootfile full-path="toc.ncx" media-type="application/x-dtbncx+xml"/>
</rootfiles></container>"#;

        let result = parse_container(container_xml);
        assert!(matches!(result, Err(EpubError::RootfileNotFound(_))));
    }

    #[test]
    fn test_malformed_container() {
        let result = parse_container(b"<container><rootfiles></container>");
        assert!(matches!(result, Err(EpubError::MalformedXml(_))));
    }
}
