/// Best-effort extraction of a JSON object from model output. Strips
/// Markdown code fences first, then falls back to the outermost brace pair.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_blocks() {
        let body = "{\"score\": 7.5}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));

        let plain_fence = format!("```\n{body}\n```");
        assert_eq!(extract_json(&plain_fence), Some(body.to_string()));
    }

    #[test]
    fn falls_back_to_outer_braces() {
        let s = "Segue a análise: {\"score\": 3.0} espero que ajude";
        assert_eq!(extract_json(s), Some("{\"score\": 3.0}".to_string()));
    }

    #[test]
    fn rejects_text_without_object() {
        assert_eq!(extract_json("sem json aqui"), None);
        assert_eq!(extract_json("} invertido {"), None);
    }
}
