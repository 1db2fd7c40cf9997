//! # Descriptor 模块
//!
//! 应用描述符与全局元素盒（box）。
//!
//! 描述符在启动时从静态配置创建一次，之后只读；
//! 元素盒在读取描述符时填充一次，条目在应用生命周期内按名字查找，从不删除。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// 应用描述符
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// 应用需要的共享元素（名字 -> 对象）
    #[serde(default)]
    pub elements: Option<Map<String, Value>>,

    /// 皮肤名，覆盖配置中的 `skin`
    #[serde(default)]
    pub style: Option<String>,

    /// 音效映射（事件名 -> 音效名），覆盖配置中的同名条目
    #[serde(default)]
    pub sound_effects: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// 全局元素盒
#[derive(Debug, Clone, Default)]
pub struct ElementBox {
    elements: HashMap<String, Value>,
}

impl ElementBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册元素，同名元素被新值覆盖
    pub fn register(&mut self, elements: &Map<String, Value>) {
        for (name, value) in elements {
            self.elements.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.elements.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 所有元素名（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
