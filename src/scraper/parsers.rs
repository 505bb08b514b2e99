use crate::error::{ParseError, SpecError};
use crate::models::RawDocument;
use scraper::{ElementRef, Html, Node as DomNode, Selector};

use super::cleaner::normalise_text;

/// Share of control or replacement characters above which a body is treated
/// as binary rather than badly-formed HTML.
const MAX_CONTROL_RATIO: f64 = 0.10;

// ── Document ──────────────────────────────────────────────────────────────────

/// A parsed page. Nodes borrow from it and never outlive it.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Best-effort parse; only empty, binary or markup-free bodies are rejected.
    pub fn parse(raw: RawDocument) -> Result<Self, ParseError> {
        if let Err(reason) = check_parseable(raw.body()) {
            return Err(ParseError::Unparseable {
                url: raw.url().to_string(),
                reason,
            });
        }

        Ok(Self {
            html: Html::parse_document(raw.body()),
        })
    }

    pub fn root(&self) -> Node<'_> {
        Node(self.html.root_element())
    }
}

fn check_parseable(body: &str) -> Result<(), String> {
    if body.trim().is_empty() {
        return Err("empty document".to_string());
    }
    if body.contains('\0') {
        return Err("binary content (NUL bytes)".to_string());
    }

    let total = body.chars().count();
    let suspicious = body
        .chars()
        .filter(|c| {
            *c == '\u{fffd}' || (c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{c}'))
        })
        .count();
    if suspicious as f64 / total as f64 > MAX_CONTROL_RATIO {
        return Err("binary content (control characters)".to_string());
    }

    if !body.contains('<') {
        return Err("no markup found".to_string());
    }
    Ok(())
}

// ── Nodes ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// All descendants matching `selector`, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<Node<'a>> {
        self.0.select(selector).map(Node).collect()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Node<'a>> {
        self.0.select(selector).next().map(Node)
    }

    /// Text of all descendants with whitespace collapsed. Inline markup does
    /// not split words; `<br>` does.
    pub fn text(&self) -> String {
        normalise_text(&self.lines().join(" "))
    }

    /// The n-th non-blank `<br>`-separated line of text.
    pub fn text_line(&self, n: usize) -> Option<String> {
        self.lines()
            .iter()
            .map(|line| normalise_text(line))
            .filter(|line| !line.is_empty())
            .nth(n)
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![String::new()];
        for node in self.0.descendants() {
            match node.value() {
                DomNode::Text(text) => {
                    if let Some(last) = lines.last_mut() {
                        last.push_str(text);
                    }
                }
                DomNode::Element(el) if el.name().eq_ignore_ascii_case("br") => lines.push(String::new()),
                _ => {}
            }
        }
        lines
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0
            .value()
            .classes()
            .any(|c| c.eq_ignore_ascii_case(class))
    }
}

// ── Selectors ─────────────────────────────────────────────────────────────────

pub fn compile_selector(context: &str, selector: &str) -> Result<Selector, SpecError> {
    Selector::parse(selector).map_err(|e| SpecError::InvalidSelector {
        context: context.to_string(),
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
