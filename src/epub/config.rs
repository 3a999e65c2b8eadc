//! 解析配置模块
//!
//! 提供解析和序列化时使用的配置，支持从YAML文件加载。

use crate::epub::container::MIMETYPE_OPF;
use crate::epub::error::{EpubError, Result};
use crate::epub::ncx::DEFAULT_MAX_NAV_DEPTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "opfkit.yaml";

/// NCX文件的媒体类型
pub const MIMETYPE_NCX: &str = "application/x-dtbncx+xml";

/// 解析与序列化配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpubConfig {
    /// container.xml在压缩包中的路径
    pub container_path: String,
    /// rootfile需要匹配的媒体类型
    pub opf_media_type: String,
    /// NCX清单项的媒体类型
    pub ncx_media_type: String,
    /// spine的toc属性无法解析时，是否改用第一个NCX媒体类型的清单项
    pub ncx_fallback: bool,
    /// navPoint允许的最大嵌套层数
    pub max_nav_depth: usize,
    /// NCX解析失败时是否让整本书打开失败
    pub strict_navigation: bool,
    /// 是否校验mimetype条目
    pub check_mimetype: bool,
    /// 序列化XML时的缩进空格数，0表示不缩进
    pub indent: usize,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            container_path: "META-INF/container.xml".to_string(),
            opf_media_type: MIMETYPE_OPF.to_string(),
            ncx_media_type: MIMETYPE_NCX.to_string(),
            ncx_fallback: false,
            max_nav_depth: DEFAULT_MAX_NAV_DEPTH,
            strict_navigation: true,
            check_mimetype: true,
            indent: 2,
        }
    }
}

impl EpubConfig {
    /// 从YAML字符串加载配置，未给出的字段使用默认值
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```rust,no_run
    /// use opfkit::EpubConfig;
    /// let config = EpubConfig::from_file("opfkit.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    /// 序列化为YAML字符串
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yml::to_string(self)
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))
    }

    /// 把默认配置写入指定文件
    pub fn write_default_file<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = Self::default().to_yaml_string()?;

        let content_with_header = format!(
            "# opfkit 配置文件\n# max_nav_depth: navPoint允许的最大嵌套层数\n# strict_navigation: 为false时NCX解析失败只记录警告\n# ncx_fallback: 为true时spine的toc无法解析也按媒体类型查找NCX\n\n{}",
            yaml_content
        );

        fs::write(path, content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))
    }

    /// 尝试从默认配置文件加载，失败时使用默认配置
    pub fn load_or_default() -> Self {
        match Self::from_file(DEFAULT_CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("使用默认配置: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EpubConfig::from_yaml_str("max_nav_depth: 8\nstrict_navigation: false\n").unwrap();
        assert_eq!(config.max_nav_depth, 8);
        assert!(!config.strict_navigation);
        assert!(!config.ncx_fallback);
        assert_eq!(config.opf_media_type, MIMETYPE_OPF);
        assert_eq!(config.container_path, "META-INF/container.xml");
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = EpubConfig {
            indent: 0,
            ..EpubConfig::default()
        };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(EpubConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = EpubConfig::from_yaml_str("max_nav_depth: [1, 2");
        assert!(matches!(result, Err(EpubError::ConfigError(_))));
    }

    #[test]
    fn test_write_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opfkit.yaml");
        EpubConfig::write_default_file(&path).unwrap();

        let loaded = EpubConfig::from_file(&path).unwrap();
        assert_eq!(loaded, EpubConfig::default());
    }
}
