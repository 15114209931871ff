use std::borrow::Cow;
use std::fmt::Write as _;

use serde_json::Value;
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::hands::Page;
use crate::types::{MAX_CONTEXT_ELEMENTS, MAX_ELEMENT_TEXT_CHARS, PageContext, PageElement, truncate_chars};

/// JavaScript evaluated in the page to list visible interactive elements.
/// Read-only: the DOM is not modified.
///
/// Buttons come first, then inputs, then links, each in document order.
/// An element counts as visible when its `offsetParent` is non-null. Text
/// is cut by code point, never inside a surrogate pair. The result is a
/// JSON string so it survives the trip back by value.
const CONTEXT_JS: &str = r#"
(() => {
  const clip = (s) => {
    const t = Array.from(s || '').slice(0, 100).join('');
    return typeof t.toWellFormed === 'function' ? t.toWellFormed() : t;
  };
  const interactive = [];
  for (const selector of ['button', 'input', 'a']) {
    for (const el of document.querySelectorAll(selector)) {
      if (el.offsetParent === null) continue;
      interactive.push({
        tag: el.tagName.toLowerCase(),
        type: typeof el.type === 'string' ? el.type : '',
        text: clip(el.innerText),
        placeholder: el.placeholder || '',
        id: el.id || '',
        name: typeof el.name === 'string' ? el.name : '',
        href: typeof el.href === 'string' ? el.href : ''
      });
      if (interactive.length >= 50) return JSON.stringify(interactive);
    }
  }
  return JSON.stringify(interactive);
})()
"#;

/// Snapshot the page's visible buttons, inputs and links.
///
/// The page is expected to be loaded already; no waiting happens here. A
/// page that cannot be read is an error rather than an empty snapshot.
pub async fn get_page_context<P: Page + ?Sized>(page: &P) -> Result<PageContext> {
    let title = page.title().await?;
    let url = page.url().await?;
    let raw = page.evaluate(CONTEXT_JS).await?;
    let elements = parse_snapshot(raw)?;

    debug!("[Context] {} elements on {}", elements.len(), url);
    Ok(PageContext {
        title,
        url,
        elements,
    })
}

/// Decode the script result and re-apply the snapshot bounds, so nothing
/// larger than the caps leaves this module whatever the page returned.
pub(crate) fn parse_snapshot(raw: Value) -> Result<Vec<PageElement>> {
    let mut elements: Vec<PageElement> = match raw {
        Value::String(json) => serde_json::from_str(&repair_lone_surrogates(&json))?,
        Value::Array(_) => serde_json::from_value(raw)?,
        Value::Null => {
            return Err(AgentError::Browser(anyhow::anyhow!(
                "page returned no element snapshot"
            )));
        }
        other => {
            return Err(AgentError::Browser(anyhow::anyhow!(
                "unexpected element snapshot: {}",
                other
            )));
        }
    };

    elements.truncate(MAX_CONTEXT_ELEMENTS);
    for el in &mut elements {
        if el.text.chars().count() > MAX_ELEMENT_TEXT_CHARS {
            el.text = truncate_chars(&el.text, MAX_ELEMENT_TEXT_CHARS).to_string();
        }
    }
    Ok(elements)
}

/// Replace `\uXXXX` escapes of unpaired UTF-16 surrogates with U+FFFD.
///
/// `JSON.stringify` emits such escapes for strings holding half a surrogate
/// pair; serde_json rejects them and would lose the whole snapshot.
fn repair_lone_surrogates(json: &str) -> Cow<'_, str> {
    if !json.contains("\\u") {
        return Cow::Borrowed(json);
    }

    let bytes = json.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) != Some(&b'u') {
            // Some other escape, including an escaped backslash.
            i += 2;
            continue;
        }
        match unicode_escape_at(json, i) {
            Some(0xD800..=0xDBFF)
                if matches!(unicode_escape_at(json, i + 6), Some(0xDC00..=0xDFFF)) =>
            {
                i += 12;
            }
            Some(0xD800..=0xDFFF) => {
                out.push_str(&json[copied..i]);
                out.push_str("\\ufffd");
                i += 6;
                copied = i;
            }
            _ => i += 2,
        }
    }

    if copied == 0 {
        return Cow::Borrowed(json);
    }
    out.push_str(&json[copied..]);
    Cow::Owned(out)
}

/// The code unit of a `\uXXXX` escape starting at byte `at`.
fn unicode_escape_at(json: &str, at: usize) -> Option<u16> {
    if json.get(at..at + 2)? != "\\u" {
        return None;
    }
    let hex = json.get(at + 2..at + 6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

/// Human-readable summary of what the planner will see.
pub fn describe_context(context: &PageContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title: {}", context.title);
    let _ = writeln!(out, "URL: {}", context.url);
    let _ = writeln!(out, "Interactive Elements: {}", context.elements.len());

    for (i, el) in context.elements.iter().take(5).enumerate() {
        let _ = writeln!(out, "\n  Element {}:", i + 1);
        let _ = writeln!(out, "    Tag: {}", el.tag);
        if !el.id.is_empty() {
            let _ = writeln!(out, "    ID: {}", el.id);
        }
        if !el.text.is_empty() {
            let _ = writeln!(out, "    Text: {}...", truncate_chars(&el.text, 50));
        }
    }
    out
}
