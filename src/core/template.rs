//! Command templates with `{name}` placeholders
//!
//! `{{` and `}}` render as literal braces. Any other brace that is not part of
//! a `{name}` placeholder makes the template malformed.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("template token pattern is valid")
});

/// Why a template could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unresolved placeholder '{{{0}}}'")]
    Unresolved(String),

    #[error("empty placeholder at offset {0}")]
    EmptyPlaceholder(usize),

    #[error("single '{brace}' at offset {offset}")]
    UnmatchedBrace { brace: char, offset: usize },
}

/// Render `template`, replacing each `{name}` with `values[name]`
pub fn render(template: &str, values: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in TOKEN.captures_iter(template) {
        let Some(token) = caps.get(0) else { continue };
        rendered.push_str(&template[last..token.start()]);
        last = token.end();

        match token.as_str() {
            "{{" => rendered.push('{'),
            "}}" => rendered.push('}'),
            "{" => {
                return Err(TemplateError::UnmatchedBrace { brace: '{', offset: token.start() })
            }
            "}" => {
                return Err(TemplateError::UnmatchedBrace { brace: '}', offset: token.start() })
            }
            _ => {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder(token.start()));
                }
                match values.get(name) {
                    Some(value) => rendered.push_str(value),
                    None => return Err(TemplateError::Unresolved(name.to_string())),
                }
            }
        }
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}
