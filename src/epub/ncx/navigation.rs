//! NCX导航元素数据结构定义
//!
//! 定义NCX文件中的导航树：navMap、navPoint（可任意嵌套）、pageList/pageTarget、
//! navList/navTarget，以及它们与元素树之间的相互转换。

use crate::epub::error::{EpubError, Result};
use crate::epub::xml::{Element, child_text, text_element};

/// navPoint默认允许的最大嵌套层数
pub const DEFAULT_MAX_NAV_DEPTH: usize = 256;

/// 导航标签（navLabel）或导航说明（navInfo）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavLabel {
    /// 标签文本
    pub text: String,
    /// xml:lang
    pub lang: Option<String>,
    /// 文字方向(ltr/rtl)
    pub dir: Option<String>,
}

impl NavLabel {
    /// 创建新的导航标签
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: None,
            dir: None,
        }
    }

    pub fn from_element(element: &Element) -> Self {
        Self {
            text: child_text(element, "text"),
            lang: element.attr_opt("xml:lang"),
            dir: element.attr_opt("dir"),
        }
    }

    /// 序列化为 `<tag><text>..</text></tag>`
    pub fn to_element(&self, tag: &str) -> Element {
        let mut label = Element::new(tag);
        if let Some(lang) = &self.lang {
            label.set_attr_nonempty("xml:lang", lang);
        }
        if let Some(dir) = &self.dir {
            label.set_attr_nonempty("dir", dir);
        }
        label.push_child(text_element("text", &self.text));
        label
    }
}

fn parse_play_order(element: &Element) -> Option<u32> {
    let raw = element.attr_opt("playOrder")?;
    match raw.trim().parse() {
        Ok(play_order) => Some(play_order),
        Err(_) => {
            log::warn!("无法解析的playOrder: {}", raw);
            None
        }
    }
}

fn set_optional(element: &mut Element, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        element.set_attr_nonempty(key, value);
    }
}

fn set_play_order(element: &mut Element, play_order: Option<u32>) {
    if let Some(play_order) = play_order {
        element.set_attr("playOrder", play_order.to_string());
    }
}

fn push_labels(element: &mut Element, tag: &str, labels: &[NavLabel]) {
    for label in labels {
        element.push_child(label.to_element(tag));
    }
}

fn content_element(src: &str) -> Element {
    Element::new("content").with_attr("src", src)
}

/// 导航点
///
/// 导航点可以包含任意层子导航点，父节点独占子节点。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavPoint {
    /// 唯一标识符
    pub id: Option<String>,
    /// CSS类名
    pub class: Option<String>,
    /// 播放顺序
    pub play_order: Option<u32>,
    /// 导航标签，按文档顺序
    pub labels: Vec<NavLabel>,
    /// 内容引用
    pub src: String,
    /// 子导航点
    pub nav_points: Vec<NavPoint>,
}

impl NavPoint {
    /// 创建新的导航点
    pub fn new(label: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            labels: vec![NavLabel::new(label)],
            src: src.into(),
            ..Self::default()
        }
    }

    /// 从 `<navPoint>` 元素递归解析
    ///
    /// # 参数
    /// * `depth` - 当前节点所在层数，顶层为1
    /// * `max_depth` - 允许的最大层数，超过时返回 `MalformedDocument`
    pub fn from_element(element: &Element, depth: usize, max_depth: usize) -> Result<Self> {
        if depth > max_depth {
            return Err(EpubError::MalformedDocument(format!(
                "navPoint嵌套超过{}层",
                max_depth
            )));
        }

        let mut nav_point = NavPoint {
            id: element.attr_opt("id"),
            class: element.attr_opt("class"),
            play_order: parse_play_order(element),
            ..NavPoint::default()
        };

        // 只看直接子元素
        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => nav_point.labels.push(NavLabel::from_element(node)),
                "content" => nav_point.src = node.attr_or_empty("src"),
                "navPoint" => nav_point
                    .nav_points
                    .push(NavPoint::from_element(node, depth + 1, max_depth)?),
                _ => {}
            }
        }

        Ok(nav_point)
    }

    /// 递归序列化为 `<navPoint>` 元素，保持子节点顺序
    pub fn to_element(&self) -> Element {
        let mut nav_point = Element::new("navPoint");
        set_optional(&mut nav_point, "id", &self.id);
        set_optional(&mut nav_point, "class", &self.class);
        set_play_order(&mut nav_point, self.play_order);

        push_labels(&mut nav_point, "navLabel", &self.labels);
        nav_point.push_child(content_element(&self.src));

        for child in &self.nav_points {
            nav_point.push_child(child.to_element());
        }

        nav_point
    }

    /// 添加子导航点
    pub fn add_point(&mut self, child: NavPoint) {
        self.nav_points.push(child);
    }

    /// 第一个标签的文本
    pub fn label(&self) -> Option<&str> {
        self.labels.first().map(|label| label.text.as_str())
    }

    /// 以此节点为根的子树层数
    pub fn depth(&self) -> usize {
        1 + self
            .nav_points
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }
}

/// 按先序遍历导航点的迭代器
pub struct NavPoints<'a> {
    stack: Vec<&'a NavPoint>,
}

impl<'a> NavPoints<'a> {
    fn new(roots: &'a [NavPoint]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for NavPoints<'a> {
    type Item = &'a NavPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let nav_point = self.stack.pop()?;
        self.stack.extend(nav_point.nav_points.iter().rev());
        Some(nav_point)
    }
}

/// 导航地图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMap {
    pub id: Option<String>,
    pub labels: Vec<NavLabel>,
    pub infos: Vec<NavLabel>,
    /// 顶层导航点
    pub nav_points: Vec<NavPoint>,
}

impl NavMap {
    /// 创建新的导航地图
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_element(element: &Element, max_depth: usize) -> Result<Self> {
        let mut nav_map = NavMap {
            id: element.attr_opt("id"),
            ..NavMap::default()
        };

        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => nav_map.labels.push(NavLabel::from_element(node)),
                "navInfo" => nav_map.infos.push(NavLabel::from_element(node)),
                "navPoint" => nav_map
                    .nav_points
                    .push(NavPoint::from_element(node, 1, max_depth)?),
                _ => {}
            }
        }

        Ok(nav_map)
    }

    pub fn to_element(&self) -> Element {
        let mut nav_map = Element::new("navMap");
        set_optional(&mut nav_map, "id", &self.id);
        push_labels(&mut nav_map, "navLabel", &self.labels);
        push_labels(&mut nav_map, "navInfo", &self.infos);

        for nav_point in &self.nav_points {
            nav_map.push_child(nav_point.to_element());
        }

        nav_map
    }

    /// 添加导航点
    pub fn add_point(&mut self, nav_point: NavPoint) {
        self.nav_points.push(nav_point);
    }

    /// 按先序遍历所有导航点（包括子导航点）
    pub fn iter(&self) -> NavPoints<'_> {
        NavPoints::new(&self.nav_points)
    }

    /// 导航树层数，空地图为0
    pub fn depth(&self) -> usize {
        self.nav_points
            .iter()
            .map(|point| point.depth())
            .max()
            .unwrap_or(0)
    }

    /// 根据ID查找导航点
    pub fn find_by_id(&self, id: &str) -> Option<&NavPoint> {
        self.iter().find(|point| point.id.as_deref() == Some(id))
    }

    /// 根据内容路径查找第一个导航点
    pub fn find_by_src(&self, src: &str) -> Option<&NavPoint> {
        self.iter().find(|point| point.src == src)
    }
}

/// 页面目标
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTarget {
    pub id: Option<String>,
    /// 页码值
    pub value: Option<String>,
    /// 页面类型（normal, front, special）
    pub kind: Option<String>,
    pub class: Option<String>,
    pub play_order: Option<u32>,
    pub labels: Vec<NavLabel>,
    pub src: String,
}

impl PageTarget {
    pub fn from_element(element: &Element) -> Self {
        let mut page_target = PageTarget {
            id: element.attr_opt("id"),
            value: element.attr_opt("value"),
            kind: element.attr_opt("type"),
            class: element.attr_opt("class"),
            play_order: parse_play_order(element),
            ..PageTarget::default()
        };

        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => page_target.labels.push(NavLabel::from_element(node)),
                "content" => page_target.src = node.attr_or_empty("src"),
                _ => {}
            }
        }

        page_target
    }

    pub fn to_element(&self) -> Element {
        let mut page_target = Element::new("pageTarget");
        set_optional(&mut page_target, "id", &self.id);
        set_optional(&mut page_target, "value", &self.value);
        set_optional(&mut page_target, "type", &self.kind);
        set_optional(&mut page_target, "class", &self.class);
        set_play_order(&mut page_target, self.play_order);
        push_labels(&mut page_target, "navLabel", &self.labels);
        page_target.push_child(content_element(&self.src));
        page_target
    }
}

/// 页面列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageList {
    pub id: Option<String>,
    pub class: Option<String>,
    pub labels: Vec<NavLabel>,
    pub infos: Vec<NavLabel>,
    pub page_targets: Vec<PageTarget>,
}

impl PageList {
    pub fn from_element(element: &Element) -> Self {
        let mut page_list = PageList {
            id: element.attr_opt("id"),
            class: element.attr_opt("class"),
            ..PageList::default()
        };

        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => page_list.labels.push(NavLabel::from_element(node)),
                "navInfo" => page_list.infos.push(NavLabel::from_element(node)),
                "pageTarget" => page_list.page_targets.push(PageTarget::from_element(node)),
                _ => {}
            }
        }

        page_list
    }

    pub fn to_element(&self) -> Element {
        let mut page_list = Element::new("pageList");
        set_optional(&mut page_list, "id", &self.id);
        set_optional(&mut page_list, "class", &self.class);
        push_labels(&mut page_list, "navLabel", &self.labels);
        push_labels(&mut page_list, "navInfo", &self.infos);

        for page_target in &self.page_targets {
            page_list.push_child(page_target.to_element());
        }

        page_list
    }

    /// 根据页码值查找页面目标
    pub fn find_by_value(&self, value: &str) -> Option<&PageTarget> {
        self.page_targets
            .iter()
            .find(|target| target.value.as_deref() == Some(value))
    }
}

/// 导航目标（插图、表格等的列表项）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavTarget {
    pub id: Option<String>,
    pub value: Option<String>,
    pub class: Option<String>,
    pub play_order: Option<u32>,
    pub labels: Vec<NavLabel>,
    pub src: String,
}

impl NavTarget {
    pub fn from_element(element: &Element) -> Self {
        let mut nav_target = NavTarget {
            id: element.attr_opt("id"),
            value: element.attr_opt("value"),
            class: element.attr_opt("class"),
            play_order: parse_play_order(element),
            ..NavTarget::default()
        };

        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => nav_target.labels.push(NavLabel::from_element(node)),
                "content" => nav_target.src = node.attr_or_empty("src"),
                _ => {}
            }
        }

        nav_target
    }

    pub fn to_element(&self) -> Element {
        let mut nav_target = Element::new("navTarget");
        set_optional(&mut nav_target, "id", &self.id);
        set_optional(&mut nav_target, "value", &self.value);
        set_optional(&mut nav_target, "class", &self.class);
        set_play_order(&mut nav_target, self.play_order);
        push_labels(&mut nav_target, "navLabel", &self.labels);
        nav_target.push_child(content_element(&self.src));
        nav_target
    }
}

/// 导航列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavList {
    pub id: Option<String>,
    pub class: Option<String>,
    pub labels: Vec<NavLabel>,
    pub infos: Vec<NavLabel>,
    pub nav_targets: Vec<NavTarget>,
}

impl NavList {
    pub fn from_element(element: &Element) -> Self {
        let mut nav_list = NavList {
            id: element.attr_opt("id"),
            class: element.attr_opt("class"),
            ..NavList::default()
        };

        for node in element.child_elements() {
            match node.local_name() {
                "navLabel" => nav_list.labels.push(NavLabel::from_element(node)),
                "navInfo" => nav_list.infos.push(NavLabel::from_element(node)),
                "navTarget" => nav_list.nav_targets.push(NavTarget::from_element(node)),
                _ => {}
            }
        }

        nav_list
    }

    pub fn to_element(&self) -> Element {
        let mut nav_list = Element::new("navList");
        set_optional(&mut nav_list, "id", &self.id);
        set_optional(&mut nav_list, "class", &self.class);
        push_labels(&mut nav_list, "navLabel", &self.labels);
        push_labels(&mut nav_list, "navInfo", &self.infos);

        for nav_target in &self.nav_targets {
            nav_list.push_child(nav_target.to_element());
        }

        nav_list
    }
}
