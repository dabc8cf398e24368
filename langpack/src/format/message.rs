//! ICU-style message formatting.
//!
//! Supported syntax:
//!
//! - `{name}` inserts a parameter
//! - `{n, number}` inserts a numeric parameter (an optional style is ignored)
//! - `{n, plural, =0 {none} one {# item} other {# items}}`, where `#` prints
//!   the plural value
//! - `{x, select, male {he} female {she} other {they}}`
//! - Apostrophe quoting: `''` is a literal apostrophe, `'{'` starts quoted
//!   literal text, any other apostrophe is literal
//!
//! Plural `offset:` is not supported.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::format::plural::{plural_category, PluralCategory};

/// A message parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Num(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Num(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Num(n as f64)
    }
}

/// Named message parameters.
pub type Params = BTreeMap<String, Value>;

/// Errors from parsing or formatting a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A `{` was never closed.
    #[error("unclosed argument starting at offset {position}")]
    UnclosedArgument { position: usize },

    /// Malformed message text.
    #[error("invalid message syntax at offset {position}: {reason}")]
    InvalidSyntax { position: usize, reason: String },

    /// The argument type is not `number`, `plural` or `select`.
    #[error("unknown argument type '{kind}' for argument {name}")]
    UnknownArgumentType { name: String, kind: String },

    /// A plural or select argument lacks the required `other` case.
    #[error("{kind} argument {name} has no 'other' case")]
    MissingOther { name: String, kind: String },

    /// The message references a parameter that was not supplied.
    #[error("missing parameter {name}")]
    MissingParam { name: String },

    /// A number or plural argument received a non-numeric value.
    #[error("parameter {name} is not a number")]
    NotANumber { name: String },
}

#[derive(Debug, Clone, PartialEq)]
enum PluralSelector {
    Exact(f64),
    Category(PluralCategory),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Arg(String),
    Number(String),
    Pound,
    Plural {
        name: String,
        cases: Vec<(PluralSelector, Vec<Node>)>,
    },
    Select {
        name: String,
        cases: Vec<(String, Vec<Node>)>,
    },
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    nodes: Vec<Node>,
}

impl Message {
    /// Parse a template.
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut parser = Parser {
            chars: template.chars().collect(),
            pos: 0,
        };
        let nodes = parser.nodes(0, false)?;
        Ok(Self { nodes })
    }

    /// Format with `params` using `locale` plural rules.
    pub fn format(&self, locale: &str, params: &Params) -> Result<String, FormatError> {
        let mut out = String::new();
        write_nodes(&self.nodes, locale, params, None, &mut out)?;
        Ok(out)
    }
}

/// Parse and format a template in one step.
///
/// # Example
///
/// ```
/// use langpack::format::{format_message, Params, Value};
///
/// let mut params = Params::new();
/// params.insert("count".to_string(), Value::from(3));
///
/// let text = format_message("{count, plural, one {# file} other {# files}}", "en", &params);
/// assert_eq!(text.unwrap(), "3 files");
/// ```
pub fn format_message(
    template: &str,
    locale: &str,
    params: &Params,
) -> Result<String, FormatError> {
    Message::parse(template)?.format(locale, params)
}

/// Print a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn token(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | ',') {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn syntax(&self, reason: impl Into<String>) -> FormatError {
        FormatError::InvalidSyntax {
            position: self.pos,
            reason: reason.into(),
        }
    }

    /// Parse message text until an unmatched `}` (nested) or the end.
    fn nodes(&mut self, depth: usize, in_plural: bool) -> Result<Vec<Node>, FormatError> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '\'' => self.quoted(&mut text, in_plural),
                '{' => {
                    flush_text(&mut text, &mut nodes);
                    let start = self.pos;
                    self.pos += 1;
                    nodes.push(self.argument(start, depth, in_plural)?);
                }
                '}' if depth > 0 => break,
                '}' => return Err(self.syntax("unmatched '}'")),
                '#' if in_plural => {
                    flush_text(&mut text, &mut nodes);
                    nodes.push(Node::Pound);
                    self.pos += 1;
                }
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        flush_text(&mut text, &mut nodes);
        Ok(nodes)
    }

    /// Consume an apostrophe sequence starting at the current position.
    fn quoted(&mut self, text: &mut String, in_plural: bool) {
        match self.peek_at(1) {
            Some('\'') => {
                text.push('\'');
                self.pos += 2;
            }
            Some('{') | Some('}') => self.quoted_literal(text),
            Some('#') if in_plural => self.quoted_literal(text),
            _ => {
                text.push('\'');
                self.pos += 1;
            }
        }
    }

    /// Copy text up to the closing apostrophe (or the end) verbatim.
    fn quoted_literal(&mut self, text: &mut String) {
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\'' {
                if self.peek_at(1) == Some('\'') {
                    text.push('\'');
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            text.push(c);
            self.pos += 1;
        }
    }

    /// Parse an argument after its opening `{`.
    fn argument(
        &mut self,
        start: usize,
        depth: usize,
        in_plural: bool,
    ) -> Result<Node, FormatError> {
        let unclosed = FormatError::UnclosedArgument { position: start };

        self.skip_whitespace();
        let name = self.token();
        if name.is_empty() {
            return Err(match self.peek() {
                None => unclosed,
                Some(_) => self.syntax("expected argument name"),
            });
        }
        self.skip_whitespace();

        match self.peek() {
            None => return Err(unclosed),
            Some('}') => {
                self.pos += 1;
                return Ok(Node::Arg(name));
            }
            Some(',') => self.pos += 1,
            Some(_) => return Err(self.syntax("expected ',' or '}' after argument name")),
        }

        self.skip_whitespace();
        let kind = self.token();
        self.skip_whitespace();

        match kind.as_str() {
            "number" => {
                match self.peek() {
                    None => return Err(unclosed),
                    Some('}') => {}
                    Some(',') => {
                        while self.peek().is_some_and(|c| c != '}') {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(unclosed);
                        }
                    }
                    Some(_) => return Err(self.syntax("expected ',' or '}' after number")),
                }
                self.pos += 1;
                Ok(Node::Number(name))
            }
            "plural" => {
                self.expect_comma(start)?;
                let cases = self.cases(start, depth, true)?;
                let cases = cases
                    .into_iter()
                    .map(|(selector, body, position)| {
                        plural_selector(&selector)
                            .map(|s| (s, body))
                            .ok_or_else(|| FormatError::InvalidSyntax {
                                position,
                                reason: format!("invalid plural selector '{}'", selector),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if !cases
                    .iter()
                    .any(|(s, _)| *s == PluralSelector::Category(PluralCategory::Other))
                {
                    return Err(FormatError::MissingOther {
                        name,
                        kind: "plural".to_string(),
                    });
                }
                Ok(Node::Plural { name, cases })
            }
            "select" => {
                self.expect_comma(start)?;
                let cases: Vec<(String, Vec<Node>)> = self
                    .cases(start, depth, in_plural)?
                    .into_iter()
                    .map(|(selector, body, _)| (selector, body))
                    .collect();
                if !cases.iter().any(|(s, _)| s == "other") {
                    return Err(FormatError::MissingOther {
                        name,
                        kind: "select".to_string(),
                    });
                }
                Ok(Node::Select { name, cases })
            }
            _ if kind.is_empty() && self.peek().is_none() => Err(unclosed),
            _ => Err(FormatError::UnknownArgumentType { name, kind }),
        }
    }

    fn expect_comma(&mut self, start: usize) -> Result<(), FormatError> {
        match self.peek() {
            Some(',') => {
                self.pos += 1;
                Ok(())
            }
            None => Err(FormatError::UnclosedArgument { position: start }),
            Some(_) => Err(self.syntax("expected ','")),
        }
    }

    /// Parse `selector {body}` pairs up to the argument's closing `}`.
    fn cases(
        &mut self,
        start: usize,
        depth: usize,
        in_plural: bool,
    ) -> Result<Vec<(String, Vec<Node>, usize)>, FormatError> {
        let mut cases = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(FormatError::UnclosedArgument { position: start }),
                Some('}') => {
                    self.pos += 1;
                    return Ok(cases);
                }
                Some(_) => {}
            }

            let position = self.pos;
            let selector = self.token();
            if selector.is_empty() {
                return Err(self.syntax("expected case selector"));
            }
            if selector.starts_with("offset:") {
                return Err(FormatError::InvalidSyntax {
                    position,
                    reason: "plural offset is not supported".to_string(),
                });
            }

            self.skip_whitespace();
            match self.peek() {
                Some('{') => self.pos += 1,
                None => return Err(FormatError::UnclosedArgument { position: start }),
                Some(_) => return Err(self.syntax("expected '{' after case selector")),
            }

            let body = self.nodes(depth + 1, in_plural)?;
            if self.peek() != Some('}') {
                return Err(FormatError::UnclosedArgument { position: start });
            }
            self.pos += 1;
            cases.push((selector, body, position));
        }
    }
}

fn flush_text(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

fn plural_selector(selector: &str) -> Option<PluralSelector> {
    match selector.strip_prefix('=') {
        Some(exact) => exact.parse::<f64>().ok().map(PluralSelector::Exact),
        None => PluralCategory::from_keyword(selector).map(PluralSelector::Category),
    }
}

// =============================================================================
// Formatter
// =============================================================================

fn param<'a>(params: &'a Params, name: &str) -> Result<&'a Value, FormatError> {
    params.get(name).ok_or_else(|| FormatError::MissingParam {
        name: name.to_string(),
    })
}

fn number_param(params: &Params, name: &str) -> Result<f64, FormatError> {
    match param(params, name)? {
        Value::Num(n) => Ok(*n),
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| FormatError::NotANumber {
            name: name.to_string(),
        }),
    }
}

fn write_nodes(
    nodes: &[Node],
    locale: &str,
    params: &Params,
    pound: Option<f64>,
    out: &mut String,
) -> Result<(), FormatError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Arg(name) => out.push_str(&param(params, name)?.to_string()),
            Node::Number(name) => out.push_str(&format_number(number_param(params, name)?)),
            Node::Pound => match pound {
                Some(n) => out.push_str(&format_number(n)),
                None => out.push('#'),
            },
            Node::Plural { name, cases } => {
                let n = number_param(params, name)?;
                let category = plural_category(locale, n);
                let body = cases
                    .iter()
                    .find(|(s, _)| *s == PluralSelector::Exact(n))
                    .or_else(|| {
                        cases
                            .iter()
                            .find(|(s, _)| *s == PluralSelector::Category(category))
                    })
                    .or_else(|| {
                        cases
                            .iter()
                            .find(|(s, _)| *s == PluralSelector::Category(PluralCategory::Other))
                    });
                if let Some((_, body)) = body {
                    write_nodes(body, locale, params, Some(n), out)?;
                }
            }
            Node::Select { name, cases } => {
                let key = param(params, name)?.to_string();
                let body = cases
                    .iter()
                    .find(|(s, _)| *s == key)
                    .or_else(|| cases.iter().find(|(s, _)| s == "other"));
                if let Some((_, body)) = body {
                    write_nodes(body, locale, params, pound, out)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn render(
        template: &str,
        locale: &str,
        pairs: &[(&str, Value)],
    ) -> Result<String, FormatError> {
        format_message(template, locale, &params(pairs))
    }

    #[test]
    fn test_plain_text_and_arguments() {
        assert_eq!(render("Hello", "en", &[]).unwrap(), "Hello");
        assert_eq!(
            render("Hello, { name }!", "en", &[("name", "Ada".into())]).unwrap(),
            "Hello, Ada!"
        );
        assert_eq!(render("{n}", "en", &[("n", 2.0.into())]).unwrap(), "2");
    }

    #[test]
    fn test_number_argument() {
        assert_eq!(render("{n, number}", "en", &[("n", 1.5.into())]).unwrap(), "1.5");
        assert_eq!(
            render("{n, number, integer}", "en", &[("n", "42".into())]).unwrap(),
            "42"
        );
        assert_eq!(
            render("{n, number}", "en", &[("n", "abc".into())]),
            Err(FormatError::NotANumber {
                name: "n".to_string()
            })
        );
    }

    #[test]
    fn test_plural_english() {
        let template = "{count, plural, =0 {No items} one {# item} other {# items}}";
        assert_eq!(render(template, "en", &[("count", 0.into())]).unwrap(), "No items");
        assert_eq!(render(template, "en", &[("count", 1.into())]).unwrap(), "1 item");
        assert_eq!(render(template, "en", &[("count", 12.into())]).unwrap(), "12 items");
    }

    #[test]
    fn test_plural_uses_locale_rules() {
        let template = "{n, plural, one {# файл} few {# файла} many {# файлов} other {# файла}}";
        assert_eq!(render(template, "ru", &[("n", 21.into())]).unwrap(), "21 файл");
        assert_eq!(render(template, "ru", &[("n", 3.into())]).unwrap(), "3 файла");
        assert_eq!(render(template, "ru", &[("n", 11.into())]).unwrap(), "11 файлов");

        let template = "{n, plural, one {un} other {plusieurs}}";
        assert_eq!(render(template, "fr-CA", &[("n", 0.into())]).unwrap(), "un");
    }

    #[test]
    fn test_select_and_nesting() {
        let template = concat!(
            "{gender, select, ",
            "female {{n, plural, one {She has # cat} other {She has # cats}}} ",
            "other {They have {n} cats}}"
        );
        assert_eq!(
            render(template, "en", &[("gender", "female".into()), ("n", 2.into())]).unwrap(),
            "She has 2 cats"
        );
        assert_eq!(
            render(template, "en", &[("gender", "x".into()), ("n", 1.into())]).unwrap(),
            "They have 1 cats"
        );
    }

    #[test]
    fn test_pound_outside_plural_is_literal() {
        assert_eq!(render("Issue #{id}", "en", &[("id", 7.into())]).unwrap(), "Issue #7");
    }

    #[test]
    fn test_apostrophe_quoting() {
        assert_eq!(
            render("It''s {name}", "en", &[("name", "Bob".into())]).unwrap(),
            "It's Bob"
        );
        assert_eq!(render("'{name}' is literal", "en", &[]).unwrap(), "{name} is literal");
        assert_eq!(render("don't", "en", &[]).unwrap(), "don't");
        assert_eq!(
            render("{n, plural, other {'#' is #}}", "en", &[("n", 5.into())]).unwrap(),
            "# is 5"
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            Message::parse("Hello {name"),
            Err(FormatError::UnclosedArgument { position: 6 })
        );
        assert!(matches!(
            Message::parse("{n, date}"),
            Err(FormatError::UnknownArgumentType { .. })
        ));
        assert!(matches!(
            Message::parse("{n, plural, one {x}}"),
            Err(FormatError::MissingOther { .. })
        ));
        assert!(matches!(
            Message::parse("{n, plural, offset:1 other {x}}"),
            Err(FormatError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            Message::parse("{n, plural, several {x} other {y}}"),
            Err(FormatError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            Message::parse("a } b"),
            Err(FormatError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_missing_param() {
        assert_eq!(
            render("Hi {name}", "en", &[]),
            Err(FormatError::MissingParam {
                name: "name".to_string()
            })
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.25), "0.25");
    }
}
