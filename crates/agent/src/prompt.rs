//! Prompt building and model output parsing.

use serde_json::Value;
use themeloom_core::ModelUnavailable;

/// What the theme prompt knows about the request.
#[derive(Debug, Clone)]
pub struct ThemePromptContext<'a> {
    pub season: &'a str,
    pub focus: &'a str,
    pub platform: &'a str,
    pub tone: &'a str,
    pub index: usize,
    pub count: usize,
    /// Tags the rule path would use for this item, offered as inspiration.
    pub hint_tags: &'a [String],
    pub avoid_tags: &'a [String],
}

/// Build the instruction for a single theme.
pub fn theme_prompt(ctx: &ThemePromptContext<'_>) -> String {
    let mut prompt = String::from(
        "You are a creative assistant for generating anime illustration themes. \
         Generate one distinct and interesting theme that fits the anime art style.\n\n",
    );

    prompt.push_str(&format!(
        "Season: {}\nFocus: {}\nPlatform: {}\nTone: {}\n",
        ctx.season, ctx.focus, ctx.platform, ctx.tone
    ));
    prompt.push_str(&format!(
        "This is theme {} of {}; make it differ from the others in composition and mood.\n",
        ctx.index + 1,
        ctx.count
    ));
    if !ctx.hint_tags.is_empty() {
        prompt.push_str(&format!("Useful tags: {}\n", ctx.hint_tags.join(", ")));
    }
    if !ctx.avoid_tags.is_empty() {
        prompt.push_str(&format!("Never use: {}\n", ctx.avoid_tags.join(", ")));
    }

    prompt.push_str(
        "\nReply with a single JSON object and nothing else:\n\
         {\"title\": string, \"short_concept\": string, \
         \"keywords\": [danbooru-style tags], \"mood\": [mood tags]}",
    );
    prompt
}

/// A theme as the model described it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTheme {
    pub title: String,
    pub short_concept: String,
    pub keywords: Vec<String>,
    pub mood: Vec<String>,
}

/// Parse a theme from model output.
///
/// Accepts a JSON object or an array whose first element is one, optionally
/// wrapped in a Markdown code fence. `keywords` and `mood` may be lists or
/// comma-separated strings.
pub fn parse_theme(raw: &str) -> Result<ParsedTheme, ModelUnavailable> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .or_else(|_| serde_json::from_str(extract_json(body)))
        .map_err(|e| ModelUnavailable::malformed(format!("theme output is not JSON: {e}")))?;

    let object = match value {
        Value::Array(items) => items.into_iter().next(),
        other => Some(other),
    }
    .filter(Value::is_object)
    .ok_or_else(|| ModelUnavailable::malformed("theme output has no JSON object"))?;

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ModelUnavailable::malformed("theme output has no title"))?
        .to_string();

    let short_concept = object
        .get("short_concept")
        .or_else(|| object.get("concept"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(ParsedTheme {
        title,
        short_concept,
        keywords: string_list(object.get("keywords").or_else(|| object.get("tags"))),
        mood: string_list(object.get("mood")),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    };
    raw.into_iter()
        .flat_map(|s| {
            strip_special_tokens(s)
                .split(',')
                .map(|tag| unescape_tag(tag.trim()))
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Tag models emit section markers like `<|general|>` between tag groups.
fn strip_special_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<|") {
        let Some(len) = rest[start + 2..].find("|>") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push(',');
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

/// Booru-style tags escape brackets as `\(` so prompt weighting ignores them.
fn unescape_tag(tag: &str) -> String {
    tag.replace("\\(", "(")
        .replace("\\)", ")")
        .replace("\\[", "[")
        .replace("\\]", "]")
}

/// Build the rewrite instruction for a caption draft.
pub fn caption_prompt(draft: &str, platform: &str, language: &str, tone: &str) -> String {
    format!(
        "Rewrite the following social media caption for {platform}. \
         Write it in the language with code '{language}' using a {tone} tone. \
         Keep the title, the facts and the hashtags line. \
         Reply with the caption text only.\n\n{draft}"
    )
}

/// Clean a caption returned by a model.
pub fn clean_caption(raw: &str) -> Result<String, ModelUnavailable> {
    let text = strip_code_fence(raw)
        .trim()
        .trim_matches('"')
        .trim()
        .to_string();
    if text.is_empty() {
        return Err(ModelUnavailable::malformed("caption output is empty"));
    }
    Ok(text)
}

/// Strip a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// The outermost `{...}` or `[...]` span, for output with chatter around it.
fn extract_json(text: &str) -> &str {
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => text,
    }
}
