use serde_json::{Map, Value};

/// Parse attempts before giving up on a reply.
const MAX_CANDIDATES: usize = 64;

/// Finds the first balanced `{ ... }` span in `text` that parses as a JSON
/// object. Braces inside string literals are ignored. Models often wrap the
/// object in prose or code fences, so a span that fails to parse moves on to
/// the next one by start position.
///
/// Spans are collected in one pass over the text, so replies full of stray
/// braces stay linear.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut spans = balanced_spans(text.as_bytes());
    spans.sort_unstable_by_key(|&(open, _)| open);

    spans
        .into_iter()
        .take(MAX_CANDIDATES)
        .find_map(|(open, close)| match serde_json::from_str(&text[open..=close]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Every `(open, close)` pair of matching braces. String state is only
/// tracked inside braces, so quotes in surrounding prose are harmless.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }

    spans
}
