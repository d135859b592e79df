//! 日历树的数据模型
use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::Result;

/// 属性值
///
/// 同一个键在一个节点内只会处于三种形态之一：首次出现为单值，
/// 再次出现提升为多值；`BEGIN`/`END` 包裹的块总是子节点序列。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IcalValue {
    /// 单个文本值
    Text(String),
    /// 同名属性重复出现时的多个文本值
    Texts(Vec<String>),
    /// 子块序列，即使只出现一次
    Blocks(Vec<IcalNode>),
}

impl IcalValue {
    /// 文本值，多值时取第一个
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Texts(texts) => texts.first().map(String::as_str),
            Self::Blocks(_) => None,
        }
    }

    /// 子块序列
    pub fn as_blocks(&self) -> Option<&[IcalNode]> {
        match self {
            Self::Blocks(blocks) => Some(blocks),
            _ => None,
        }
    }
}

impl From<&str> for IcalValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IcalValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for IcalValue {
    fn from(values: Vec<String>) -> Self {
        Self::Texts(values)
    }
}

impl From<Vec<IcalNode>> for IcalValue {
    fn from(blocks: Vec<IcalNode>) -> Self {
        Self::Blocks(blocks)
    }
}

/// 日历树节点
///
/// 键区分大小写，按首次插入的顺序保存；编码时按这个顺序输出。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcalNode {
    entries: Vec<(String, IcalValue)>,
}

impl IcalNode {
    /// 创建空节点
    pub fn new() -> Self {
        Self::default()
    }

    /// 按键读取
    pub fn get(&self, key: &str) -> Option<&IcalValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// 按键读取可变引用
    pub fn get_mut(&mut self, key: &str) -> Option<&mut IcalValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// 插入或替换键值
    ///
    /// 已存在的键保持原位置，返回旧值；新键追加到末尾。
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<IcalValue>,
    ) -> Option<IcalValue> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// 是否存在该键
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 按插入顺序遍历键
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// 按插入顺序遍历键值
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IcalValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// 键的数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何键
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 读取文本属性，多值时取第一个
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(IcalValue::as_text)
    }

    /// 读取子块序列，不存在或形态不符时返回空切片
    pub fn blocks(&self, key: &str) -> &[IcalNode] {
        self.get(key).and_then(IcalValue::as_blocks).unwrap_or(&[])
    }

    /// 从JSON字符串加载节点树
    pub fn from_json(json_data: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_data)?)
    }

    /// 导出为JSON字符串
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// 获取某个名称的子块序列，不存在时创建空序列
    ///
    /// 键已被文本值占用时返回 `None`。
    pub(crate) fn blocks_entry(&mut self, name: &str) -> Option<&mut Vec<IcalNode>> {
        if !self.contains_key(name) {
            self.entries
                .push((name.to_string(), IcalValue::Blocks(Vec::new())));
        }
        match self.get_mut(name) {
            Some(IcalValue::Blocks(blocks)) => Some(blocks),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a IcalNode {
    type Item = (&'a str, &'a IcalValue);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a IcalValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<K: Into<String>, V: Into<IcalValue>> FromIterator<(K, V)> for IcalNode {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut node = Self::new();
        for (key, value) in iter {
            node.insert(key, value);
        }
        node
    }
}

impl Serialize for IcalNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct IcalNodeVisitor;

impl<'de> Visitor<'de> for IcalNodeVisitor {
    type Value = IcalNode;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of iCalendar properties")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut node = IcalNode::new();
        while let Some((key, value)) = access.next_entry::<String, IcalValue>()? {
            node.insert(key, value);
        }
        Ok(node)
    }
}

impl<'de> Deserialize<'de> for IcalNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(IcalNodeVisitor)
    }
}
