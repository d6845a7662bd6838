//! Prompt 模板：`{name}` 占位符解析与渲染
//!
//! 语法：`{name}` 为占位符（name 仅含 ASCII 字母、数字、下划线）；`{{` / `}}` 为字面量花括号；
//! 其它花括号用法均视为格式错误。解析在构造时完成，渲染时不会再失败于语法问题。

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// 模板键：三种审阅类型 + 方法说明
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptKey {
    /// Who / What / Where / When / Why
    FiveW,
    /// Operational Effectiveness
    Oe,
    /// Design Effectiveness
    De,
    Methods,
}

impl PromptKey {
    pub const ALL: [PromptKey; 4] = [Self::FiveW, Self::Oe, Self::De, Self::Methods];

    /// 可用于 BatchReviewControls 的审阅类型
    pub const REVIEW_TYPES: [PromptKey; 3] = [Self::FiveW, Self::Oe, Self::De];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveW => "5W",
            Self::Oe => "OE",
            Self::De => "DE",
            Self::Methods => "METHODS",
        }
    }

    pub fn is_review(&self) -> bool {
        !matches!(self, Self::Methods)
    }

    /// 该键的模板必须包含、且只能包含的占位符
    pub fn placeholders(&self) -> &'static [&'static str] {
        if self.is_review() {
            &[CONTROL_VAR]
        } else {
            &[]
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知模板键
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown prompt key '{0}' (expected one of 5W, OE, DE, METHODS)")]
pub struct UnknownPromptKey(pub String);

impl FromStr for PromptKey {
    type Err = UnknownPromptKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "5W" => Ok(Self::FiveW),
            "OE" => Ok(Self::Oe),
            "DE" => Ok(Self::De),
            "METHODS" => Ok(Self::Methods),
            other => Err(UnknownPromptKey(other.to_string())),
        }
    }
}

/// 审阅模板中的控制项占位符名
pub const CONTROL_VAR: &str = "control";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unmatched '{{' at byte {0}")]
    UnmatchedOpenBrace(usize),

    #[error("unmatched '}}' at byte {0} (use '}}}}' for a literal brace)")]
    UnmatchedCloseBrace(usize),

    #[error("invalid placeholder '{{{name}}}' at byte {pos}")]
    InvalidPlaceholder { name: String, pos: usize },

    #[error("placeholder '{{{name}}}' is not recognised for prompt '{key}'")]
    UnrecognizedPlaceholder { name: String, key: PromptKey },

    #[error("prompt '{key}' must contain the '{{{name}}}' placeholder")]
    MissingPlaceholder { name: String, key: PromptKey },

    #[error("no value supplied for placeholder '{{{0}}}'")]
    MissingValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// 已解析的模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// 只做语法解析，不校验占位符名
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnmatchedOpenBrace(pos));
                    }
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(TemplateError::InvalidPlaceholder { name, pos });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name));
                }
                '}' => return Err(TemplateError::UnmatchedCloseBrace(pos)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// 解析并校验占位符集合与 key 的要求一致
    pub fn for_key(key: PromptKey, source: &str) -> Result<Self, TemplateError> {
        let template = Self::parse(source)?;
        let expected = key.placeholders();
        if let Some(name) = template
            .variables()
            .into_iter()
            .find(|v| !expected.contains(v))
        {
            return Err(TemplateError::UnrecognizedPlaceholder {
                name: name.to_string(),
                key,
            });
        }
        let present = template.variables();
        if let Some(name) = expected.iter().find(|e| !present.contains(*e)) {
            return Err(TemplateError::MissingPlaceholder {
                name: name.to_string(),
                key,
            });
        }
        Ok(template)
    }

    /// 不解析占位符，整段视为字面量
    pub(crate) fn literal(source: &str) -> Self {
        Self {
            source: source.to_string(),
            segments: vec![Segment::Literal(source.to_string())],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 占位符名（去重，按首次出现顺序）
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();
        for seg in &self.segments {
            if let Segment::Variable(name) = seg {
                if !vars.contains(&name.as_str()) {
                    vars.push(name);
                }
            }
        }
        vars
    }

    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .iter()
                        .find(|(k, _)| *k == name.as_str())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| TemplateError::MissingValue(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let t = PromptTemplate::parse("Review:\n\n{control}\n").unwrap();
        assert_eq!(t.variables(), vec!["control"]);
        assert_eq!(
            t.render(&[("control", "{\"id\": 1}")]).unwrap(),
            "Review:\n\n{\"id\": 1}\n"
        );
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let t = PromptTemplate::parse("JSON like {{\"a\": 1}} then {control}").unwrap();
        assert_eq!(t.variables(), vec!["control"]);
        assert_eq!(t.render(&[("control", "X")]).unwrap(), "JSON like {\"a\": 1} then X");
    }

    #[test]
    fn test_malformed_templates() {
        assert_eq!(
            PromptTemplate::parse("oops {control"),
            Err(TemplateError::UnmatchedOpenBrace(5))
        );
        assert_eq!(
            PromptTemplate::parse("oops } here"),
            Err(TemplateError::UnmatchedCloseBrace(5))
        );
        assert!(matches!(
            PromptTemplate::parse("bad {} here"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
        assert!(matches!(
            PromptTemplate::parse("bad {control!r} here"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
    }

    #[test]
    fn test_for_key_enforces_placeholders() {
        assert!(PromptTemplate::for_key(PromptKey::FiveW, "NEW {control}").is_ok());
        assert!(matches!(
            PromptTemplate::for_key(PromptKey::FiveW, "no placeholder"),
            Err(TemplateError::MissingPlaceholder { .. })
        ));
        assert!(matches!(
            PromptTemplate::for_key(PromptKey::Oe, "{control} and {risk}"),
            Err(TemplateError::UnrecognizedPlaceholder { .. })
        ));
        assert!(PromptTemplate::for_key(PromptKey::Methods, "Explain things").is_ok());
        assert!(matches!(
            PromptTemplate::for_key(PromptKey::Methods, "Explain {control}"),
            Err(TemplateError::UnrecognizedPlaceholder { .. })
        ));
    }

    #[test]
    fn test_render_missing_value() {
        let t = PromptTemplate::parse("{control}").unwrap();
        assert_eq!(
            t.render(&[]),
            Err(TemplateError::MissingValue("control".to_string()))
        );
    }

    #[test]
    fn test_prompt_key_round_trip() {
        for key in PromptKey::ALL {
            assert_eq!(key.as_str().parse::<PromptKey>().unwrap(), key);
        }
        assert!("FOO".parse::<PromptKey>().is_err());
        assert!(!PromptKey::Methods.is_review());
    }
}
