//! # Style 模块
//!
//! 全局样式表：只解析 `selector { key: value; }` 规则与 `/* */` 注释。
//!
//! 样式加载失败对应用是致命的，调用方负责把 `StyleError` 转成启动错误。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 样式错误
#[derive(Error, Debug)]
pub enum StyleError {
    /// 读取样式文件失败
    #[error("读取样式文件失败: {path} - {message}")]
    Io { path: PathBuf, message: String },

    /// 语法错误
    #[error("样式语法错误（第 {line} 行）: {message}")]
    Syntax { line: usize, message: String },
}

/// 一条样式规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: BTreeMap<String, String>,
}

/// 样式表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| StyleError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let sheet = Self::parse(&text)?;
        debug!(path = %path.display(), rules = sheet.rules.len(), "样式表加载完成");
        Ok(sheet)
    }

    /// 解析样式文本
    pub fn parse(text: &str) -> Result<Self, StyleError> {
        let text = strip_comments(text)?;
        let mut rules = Vec::new();
        let mut rest = text.as_str();
        let mut consumed = 0;

        loop {
            let Some(open) = rest.find('{') else {
                if let Some(offset) = rest.find(|c: char| !c.is_whitespace()) {
                    return Err(syntax(&text, consumed + offset, "规则缺少 `{`"));
                }
                break;
            };
            let selector = rest[..open].trim();
            if selector.is_empty() {
                return Err(syntax(&text, consumed + open, "选择器为空"));
            }
            if let Some(stray) = selector.find('}') {
                return Err(syntax(&text, consumed + stray, "多余的 `}`"));
            }

            let body_start = open + 1;
            let Some(close) = rest[body_start..].find('}') else {
                return Err(syntax(&text, consumed + open, "规则缺少 `}`"));
            };
            let body = &rest[body_start..body_start + close];
            if let Some(nested) = body.find('{') {
                return Err(syntax(&text, consumed + body_start + nested, "不支持嵌套规则"));
            }

            let declarations =
                parse_declarations(body).map_err(|(at, message)| syntax(&text, consumed + body_start + at, message))?;
            rules.push(StyleRule {
                selector: selector.to_string(),
                declarations,
            });

            let next = body_start + close + 1;
            consumed += next;
            rest = &rest[next..];
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 查找属性值，多条规则匹配时后出现的生效
    pub fn lookup(&self, selector: &str, key: &str) -> Option<&str> {
        self.rules
            .iter()
            .rev()
            .filter(|rule| rule.selector == selector)
            .find_map(|rule| rule.declarations.get(key))
            .map(String::as_str)
    }
}

fn syntax(text: &str, offset: usize, message: &str) -> StyleError {
    let line = text[..offset.min(text.len())].matches('\n').count() + 1;
    StyleError::Syntax {
        line,
        message: message.to_string(),
    }
}

/// 去掉注释，保留换行以便报告行号
fn strip_comments(text: &str) -> Result<String, StyleError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start + 2..].find("*/") else {
            let offset = text.len() - rest.len() + start;
            return Err(syntax(text, offset, "注释未闭合"));
        };
        let comment = &rest[start..start + 2 + end + 2];
        out.extend(comment.chars().filter(|c| *c == '\n'));
        rest = &rest[start + 2 + end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn parse_declarations(body: &str) -> Result<BTreeMap<String, String>, (usize, &'static str)> {
    let mut declarations = BTreeMap::new();
    let mut offset = 0;
    for part in body.split(';') {
        let start = offset;
        offset += part.len() + 1;
        if part.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once(':') else {
            return Err((start, "声明缺少 `:`"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err((start, "属性名为空"));
        }
        declarations.insert(key.to_string(), value.trim().to_string());
    }
    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules() {
        let sheet = StyleSheet::parse(
            r#"
            /* 全局 */
            PisakMoviePhotoTile {
                background-color: #000000;
                font: Sans 24px; /* 行尾注释 */
            }
            .exit-button { color: white }
            "#,
        )
        .unwrap();

        assert_eq!(sheet.rules().len(), 2);
        assert_eq!(
            sheet.lookup("PisakMoviePhotoTile", "font"),
            Some("Sans 24px")
        );
        assert_eq!(sheet.lookup(".exit-button", "color"), Some("white"));
        assert_eq!(sheet.lookup(".exit-button", "font"), None);
    }

    #[test]
    fn test_later_rule_wins() {
        let sheet = StyleSheet::parse("a { color: red; } a { color: blue; }").unwrap();
        assert_eq!(sheet.lookup("a", "color"), Some("blue"));
    }

    #[test]
    fn test_empty_sheet() {
        let sheet = StyleSheet::parse("  /* 只有注释 */\n").unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = StyleSheet::parse("a { color: red; }\n\nb { color red; }").unwrap_err();
        assert!(matches!(err, StyleError::Syntax { line: 3, .. }));

        assert!(StyleSheet::parse("a { color: red;").is_err());
        assert!(StyleSheet::parse("{ color: red; }").is_err());
        assert!(StyleSheet::parse("a { b { } }").is_err());
        assert!(StyleSheet::parse("/* 未闭合").is_err());
        assert!(StyleSheet::parse("a { } trailing").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = StyleSheet::load(dir.path().join("none.css")).unwrap_err();
        assert!(matches!(err, StyleError::Io { .. }));
    }
}
