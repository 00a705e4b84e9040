//! Heading-based content extraction.
//!
//! Turns a Markdown-ish document body into [`StructuredContent`]: the
//! level-one heading becomes `title`, every deeper heading becomes a
//! snake_case section key holding the text that follows it, and FAQ
//! sections are split into question/answer pairs.

use crate::models::StructuredContent;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Section keys whose bodies are parsed as `Q:`/`A:` pairs.
const FAQ_KEYS: [&str; 2] = ["frequently_asked_questions", "faq"];

fn heading_re() -> &'static Regex {
    static HEADING_RE: OnceLock<Regex> = OnceLock::new();
    HEADING_RE.get_or_init(|| {
        Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid heading regex")
    })
}

fn qa_re() -> &'static Regex {
    static QA_RE: OnceLock<Regex> = OnceLock::new();
    QA_RE.get_or_init(|| Regex::new(r"^(?i)(Q|A)\s*:\s*(.*)$").expect("valid faq regex"))
}

/// Extracts structured sections from raw document text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingExtractor;

impl HeadingExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, raw: &str) -> StructuredContent {
        let mut content = StructuredContent::new();
        let mut current: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();

        for line in raw.lines() {
            let Some(caps) = heading_re().captures(line.trim_end()) else {
                if current.is_some() {
                    body.push(line);
                }
                continue;
            };

            if let Some(key) = current.take() {
                insert_section(&mut content, key, &body);
            }
            body.clear();

            let level = caps[1].len();
            let text = caps[2].trim();
            if level == 1 {
                content.insert("title".to_string(), Value::String(text.to_string()));
            } else {
                current = Some(section_key(text));
            }
        }

        if let Some(key) = current {
            insert_section(&mut content, key, &body);
        }

        content
    }
}

fn insert_section(content: &mut StructuredContent, key: String, body: &[&str]) {
    let text = body.join("\n").trim().to_string();

    let value = if FAQ_KEYS.contains(&key.as_str()) {
        let pairs = parse_faq(&text);
        if pairs.is_empty() {
            Value::String(text)
        } else {
            Value::Array(pairs)
        }
    } else {
        Value::String(text)
    };

    content.insert(key, value);
}

fn parse_faq(text: &str) -> Vec<Value> {
    let mut pairs = Vec::new();
    let mut question: Option<String> = None;

    for line in text.lines() {
        let Some(caps) = qa_re().captures(line.trim()) else {
            continue;
        };
        let text = caps[2].trim().to_string();

        if caps[1].eq_ignore_ascii_case("q") {
            question = Some(text);
        } else if let Some(q) = question.take() {
            pairs.push(json!({"question": q, "answer": text}));
        }
    }

    pairs
}

/// `Problem Statement` -> `problem_statement`.
pub fn section_key(heading: &str) -> String {
    let mut key = String::with_capacity(heading.len());
    let mut pending_sep = false;

    for c in heading.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if key.is_empty() {
        "section".to_string()
    } else {
        key
    }
}
