//! Structured, line-oriented model of the configuration text terraform
//! generates for a single resource.
//!
//! Only the subset of HCL that `terraform add` produces is understood:
//! blocks with string labels, attributes whose expressions may span lines
//! through brackets or heredocs, comments and blank lines. Expressions are
//! kept as raw text, so anything not touched is written back unchanged
//! except for `=` alignment.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_-]*)((?:\s+"(?:[^"\\]|\\.)*")*)\s*\{\s*(\})?$"#)
        .expect("Invalid block header regex")
});

static LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("Invalid label regex"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(.*)$"#).expect("Invalid attribute regex")
});

static HEREDOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<<-?([A-Za-z_][A-Za-z0-9_]*)$"#).expect("Invalid heredoc regex")
});

const INDENT: &str = "  ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HclError {
    #[error("line {line}: unexpected {text:?}")]
    Unexpected { line: usize, text: String },

    #[error("line {line}: block {kind:?} is never closed")]
    UnclosedBlock { line: usize, kind: String },

    #[error("line {line}: value of {name:?} is never closed")]
    UnclosedExpression { line: usize, name: String },
}

/// Raw expression text. The first line is what follows `=`; continuation
/// lines are stored relative to the attribute's own indentation, except for
/// heredocs, whose lines are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    lines: Vec<String>,
    verbatim: bool,
}

impl Expression {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            verbatim: false,
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            verbatim: false,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_multiline(&self) -> bool {
        self.lines.len() > 1
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_null(&self) -> bool {
        !self.is_multiline() && self.lines.first().is_some_and(|l| l.trim() == "null")
    }

    /// `""`, `[]` or `{}` written on one line.
    pub fn is_empty_value(&self) -> bool {
        !self.is_multiline()
            && self
                .lines
                .first()
                .is_some_and(|l| matches!(l.trim(), "\"\"" | "[]" | "{}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Body,
}

impl Block {
    pub fn new(kind: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            labels,
            body: Body::default(),
        }
    }

    /// First label of a `resource` block.
    pub fn resource_type(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Second label of a `resource` block.
    pub fn resource_name(&self) -> Option<&str> {
        self.labels.get(1).map(String::as_str)
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        out.push_str(&pad);
        out.push_str(&self.kind);
        for label in &self.labels {
            out.push_str(&format!(" \"{}\"", label));
        }
        if self.body.items.is_empty() {
            out.push_str(" {}\n");
            return;
        }
        out.push_str(" {\n");
        self.body.render_into(out, depth + 1);
        out.push_str(&pad);
        out.push_str("}\n");
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Attribute(Attribute),
    Block(Block),
    Comment(String),
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    items: Vec<BodyItem>,
}

impl Body {
    pub fn items(&self) -> &[BodyItem] {
        &self.items
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match item {
            BodyItem::Attribute(attr) => Some(attr),
            _ => None,
        })
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().find(|a| a.name == name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            BodyItem::Block(block) => Some(block),
            _ => None,
        })
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.items.iter_mut().filter_map(|item| match item {
            BodyItem::Block(block) => Some(block),
            _ => None,
        })
    }

    /// Replace the value of an existing attribute, or append the attribute
    /// at the end of the body. Nothing else is touched.
    pub fn set_attribute(&mut self, name: &str, expr: Expression) {
        for item in self.items.iter_mut() {
            if let BodyItem::Attribute(attr) = item {
                if attr.name == name {
                    attr.expr = expr;
                    return;
                }
            }
        }
        self.items.push(BodyItem::Attribute(Attribute {
            name: name.to_string(),
            expr,
        }));
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, BodyItem::Attribute(a) if a.name == name));
        before != self.items.len()
    }

    pub fn remove_blocks(&mut self, kind: &str) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, BodyItem::Block(b) if b.kind == kind));
        before - self.items.len()
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&BodyItem) -> bool,
    {
        self.items.retain(f);
    }

    pub fn push(&mut self, item: BodyItem) {
        self.items.push(item);
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        let widths = self.alignment_widths();

        for (item, width) in self.items.iter().zip(widths) {
            match item {
                BodyItem::Attribute(attr) => {
                    let (first, rest) = attr
                        .expr
                        .lines
                        .split_first()
                        .map(|(first, rest)| (first.as_str(), rest))
                        .unwrap_or(("", &[]));
                    out.push_str(&format!(
                        "{}{:<width$} = {}\n",
                        pad,
                        attr.name,
                        first,
                        width = width
                    ));
                    for line in rest {
                        if attr.expr.verbatim {
                            out.push_str(line);
                        } else if !line.is_empty() {
                            out.push_str(&pad);
                            out.push_str(line);
                        }
                        out.push('\n');
                    }
                }
                BodyItem::Block(block) => block.render_into(out, depth),
                BodyItem::Comment(text) => {
                    out.push_str(&pad);
                    out.push_str(text);
                    out.push('\n');
                }
                BodyItem::Blank => out.push('\n'),
            }
        }
    }

    // Runs of consecutive single-line attributes share the width of their
    // longest name. A multi-line attribute ends the run and is not padded.
    fn alignment_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.items.len()];
        let mut run_start = 0;
        let mut run_width = 0;

        let close = |widths: &mut Vec<usize>, from: usize, to: usize, width: usize| {
            for w in widths.iter_mut().take(to).skip(from) {
                *w = width;
            }
        };

        for (i, item) in self.items.iter().enumerate() {
            match item {
                BodyItem::Attribute(attr) if attr.expr.is_multiline() => {
                    close(&mut widths, run_start, i, run_width);
                    widths[i] = attr.name.len();
                    run_start = i + 1;
                    run_width = 0;
                }
                BodyItem::Attribute(attr) => run_width = run_width.max(attr.name.len()),
                _ => {
                    close(&mut widths, run_start, i, run_width);
                    run_start = i + 1;
                    run_width = 0;
                }
            }
        }
        close(&mut widths, run_start, self.items.len(), run_width);
        widths
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    body: Body,
}

impl ConfigFile {
    pub fn parse(src: &str) -> Result<Self, HclError> {
        let lines: Vec<&str> = src.lines().collect();
        let mut pos = 0;
        let body = parse_body(&lines, &mut pos, None)?;
        Ok(Self { body })
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn first_block(&self) -> Option<&Block> {
        self.body.blocks().next()
    }

    pub fn first_block_mut(&mut self) -> Option<&mut Block> {
        self.body.blocks_mut().next()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.body.render_into(&mut out, 0);
        out
    }
}

fn parse_body(
    lines: &[&str],
    pos: &mut usize,
    closing: Option<(usize, &str)>,
) -> Result<Body, HclError> {
    let mut body = Body::default();

    while *pos < lines.len() {
        let line_no = *pos + 1;
        let raw = lines[*pos].trim_end_matches('\r');
        let line = raw.trim();
        *pos += 1;

        if line.is_empty() {
            body.items.push(BodyItem::Blank);
            continue;
        }
        if line.starts_with('#') || line.starts_with("//") {
            body.items.push(BodyItem::Comment(line.to_string()));
            continue;
        }
        if line == "}" {
            if closing.is_some() {
                return Ok(body);
            }
            return Err(HclError::Unexpected {
                line: line_no,
                text: line.to_string(),
            });
        }

        if let Some(caps) = BLOCK_HEADER.captures(line) {
            let kind = caps[1].to_string();
            let labels = caps
                .get(2)
                .map(|m| {
                    LABEL
                        .captures_iter(m.as_str())
                        .map(|c| c[1].to_string())
                        .collect()
                })
                .unwrap_or_default();
            let inner = if caps.get(3).is_some() {
                Body::default()
            } else {
                parse_body(lines, pos, Some((line_no, &kind)))?
            };
            body.items.push(BodyItem::Block(Block {
                kind,
                labels,
                body: inner,
            }));
            continue;
        }

        if let Some(caps) = ATTRIBUTE.captures(line) {
            let name = caps[1].to_string();
            let indent = &raw[..raw.len() - raw.trim_start().len()];
            let expr = parse_expression(caps[2].trim_end(), lines, pos, indent, &name, line_no)?;
            body.items.push(BodyItem::Attribute(Attribute { name, expr }));
            continue;
        }

        return Err(HclError::Unexpected {
            line: line_no,
            text: line.to_string(),
        });
    }

    match closing {
        Some((line, kind)) => Err(HclError::UnclosedBlock {
            line,
            kind: kind.to_string(),
        }),
        None => Ok(body),
    }
}

fn parse_expression(
    first: &str,
    lines: &[&str],
    pos: &mut usize,
    indent: &str,
    name: &str,
    line_no: usize,
) -> Result<Expression, HclError> {
    let unclosed = || HclError::UnclosedExpression {
        line: line_no,
        name: name.to_string(),
    };
    let mut out = vec![first.to_string()];

    if let Some(caps) = HEREDOC.captures(first) {
        let marker = caps[1].to_string();
        while *pos < lines.len() {
            let line = lines[*pos].trim_end_matches('\r');
            *pos += 1;
            out.push(line.to_string());
            if line.trim() == marker {
                return Ok(Expression {
                    lines: out,
                    verbatim: true,
                });
            }
        }
        return Err(unclosed());
    }

    let mut depth = bracket_delta(first);
    while depth > 0 {
        let line = lines.get(*pos).ok_or_else(unclosed)?.trim_end_matches('\r');
        *pos += 1;
        depth += bracket_delta(line);
        let relative = line
            .strip_prefix(indent)
            .unwrap_or_else(|| line.trim_start());
        out.push(relative.to_string());
    }
    Ok(Expression::from_lines(out))
}

// Net bracket nesting change of one line, ignoring string contents and
// trailing comments.
fn bracket_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            '#' => break,
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = r#"resource "azurerm_virtual_network" "res-1" {
  address_space       = ["10.0.0.0/16"]
  id                  = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1"
  location            = "westeurope"
  name                = "vnet1"
  resource_group_name = "rg"
  tags = {
    env = "dev{"
  }
  subnet {
    address_prefix = "10.0.1.0/24"
    name           = "sub1"
  }
  description = <<-EOT
    multi
    line
  EOT
  timeouts {}
}"#;

    #[test]
    fn test_parse_structure() {
        let file = ConfigFile::parse(GENERATED).unwrap();
        let block = file.first_block().unwrap();
        assert_eq!(block.kind, "resource");
        assert_eq!(block.resource_type(), Some("azurerm_virtual_network"));
        assert_eq!(block.resource_name(), Some("res-1"));

        let names: Vec<&str> = block.body.attributes().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "address_space",
                "id",
                "location",
                "name",
                "resource_group_name",
                "tags",
                "description",
            ]
        );
        let tags = block.body.get_attribute("tags").unwrap();
        assert_eq!(tags.expr.lines(), ["{", "  env = \"dev{\"", "}"]);
        let kinds: Vec<&str> = block.body.blocks().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, ["subnet", "timeouts"]);
    }

    #[test]
    fn test_render_unchanged_round_trip() {
        let file = ConfigFile::parse(GENERATED).unwrap();
        assert_eq!(file.render(), format!("{}\n", GENERATED));
    }

    #[test]
    fn test_round_trip_keeps_single_trailing_newline() {
        let src = "resource \"x_y\" \"a\" {\n  id   = \"abc\"\n  name = \"a\"\n}\n";
        let file = ConfigFile::parse(src).unwrap();
        assert_eq!(file.render(), src);
        assert!(!file.body().items().contains(&BodyItem::Blank));

        let crlf =
            ConfigFile::parse("resource \"x_y\" \"a\" {\r\n  name = \"a\"\r\n}\r\n").unwrap();
        assert_eq!(crlf.render(), "resource \"x_y\" \"a\" {\n  name = \"a\"\n}\n");
    }

    #[test]
    fn test_empty_expression_does_not_panic() {
        let expr = Expression::from_lines(Vec::new());
        assert!(!expr.is_null());
        assert!(!expr.is_empty_value());

        let mut file = ConfigFile::parse("resource \"x_y\" \"a\" {\n}\n").unwrap();
        file.first_block_mut().unwrap().body.set_attribute("name", expr);
        assert_eq!(file.render(), "resource \"x_y\" \"a\" {\n  name = \n}\n");
    }

    #[test]
    fn test_remove_and_set_realigns() {
        let mut file = ConfigFile::parse(GENERATED).unwrap();
        let body = &mut file.first_block_mut().unwrap().body;
        assert!(body.remove_attribute("resource_group_name"));
        assert!(body.remove_attribute("id"));
        assert!(!body.remove_attribute("id"));
        assert_eq!(body.remove_blocks("timeouts"), 1);
        body.set_attribute("location", Expression::new("\"northeurope\""));
        body.set_attribute("depends_on", Expression::new("[\n  azurerm_resource_group.res-0,\n]"));

        let out = file.render();
        assert!(
            out.contains("  address_space = [\"10.0.0.0/16\"]\n  location      = \"northeurope\"\n")
        );
        assert!(out.ends_with("  depends_on = [\n    azurerm_resource_group.res-0,\n  ]\n}\n"));
        assert!(!out.contains("timeouts"));
    }

    #[test]
    fn test_unclosed_block_is_an_error() {
        let err = ConfigFile::parse("resource \"a\" \"b\" {\n  x = 1\n").unwrap_err();
        assert_eq!(
            err,
            HclError::UnclosedBlock {
                line: 1,
                kind: "resource".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            ConfigFile::parse("Error: something went wrong"),
            Err(HclError::Unexpected { line: 1, .. })
        ));
        assert!(matches!(
            ConfigFile::parse("resource \"a\" \"b\" {\n  tags = {\n    a = 1"),
            Err(HclError::UnclosedExpression { .. })
        ));
    }

    #[test]
    fn test_expression_predicates() {
        assert!(Expression::new("null").is_null());
        assert!(Expression::new("{}").is_empty_value());
        assert!(Expression::new("\"\"").is_empty_value());
        assert!(!Expression::new("[\n]").is_empty_value());
    }
}
