//! Info extractor: issue body text to [`SubmissionRecord`].
//!
//! Two body grammars are understood:
//!
//! - [`Grammar::Form`]: the human-facing issue form, where each value sits on
//!   the first non-blank line after a bolded prompt such as `**你的插件名称：**`.
//! - [`Grammar::Block`]: a machine-written hidden comment holding one
//!   `- key: value` line per field. It survives human edits elsewhere in the
//!   body, so resync prefers it.
//!
//! Extraction is all-or-nothing: a record is returned only when every field
//! its kind requires was found.

use regex::Regex;

use crate::domain::{
    AdapterRecord, BotRecord, ExtractionError, Kind, PluginRecord, SubmissionRecord,
};

/// Opening line of the hidden block.
pub const BLOCK_HEADER: &str = "<!-- DO NOT EDIT ! -->";

/// Body grammar tried by [`extract_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Form,
    Block,
}

/// A field of a submission: its block key and its form prompt.
#[derive(Debug, Clone, Copy)]
struct Field {
    key: &'static str,
    prompt: &'static str,
}

const IMPORT_PROMPT: &str = "**插件 import 使用的名称**";
const INSTALL_PROMPT: &str = "**插件 install 使用的名称**";
const REPO_PROMPT: &str = "**插件项目仓库/主页链接**";

/// Fields in form order for `kind`.
fn fields(kind: Kind) -> Vec<Field> {
    match kind {
        Kind::Plugin => vec![
            Field { key: "name", prompt: "**你的插件名称：**" },
            Field { key: "desc", prompt: "**简短描述插件功能：**" },
            Field { key: "id", prompt: IMPORT_PROMPT },
            Field { key: "link", prompt: INSTALL_PROMPT },
            Field { key: "repo", prompt: REPO_PROMPT },
        ],
        Kind::Adapter => vec![
            Field { key: "name", prompt: "**你的协议名称：**" },
            Field { key: "desc", prompt: "**简短描述协议：**" },
            Field { key: "id", prompt: IMPORT_PROMPT },
            Field { key: "link", prompt: INSTALL_PROMPT },
            Field { key: "repo", prompt: REPO_PROMPT },
        ],
        Kind::Bot => vec![
            Field { key: "name", prompt: "**机器人名称：**" },
            Field { key: "desc", prompt: "**机器人功能：**" },
            Field { key: "repo", prompt: "**机器人项目仓库/主页链接：**" },
        ],
    }
}

/// Extract with human edits taking precedence: form first, then block.
pub fn extract(kind: Kind, body: &str, author: &str) -> Result<SubmissionRecord, ExtractionError> {
    extract_with(kind, body, author, &[Grammar::Form, Grammar::Block])
}

/// Extract for resync: the hidden block first, then the form.
pub fn extract_for_resync(
    kind: Kind,
    body: &str,
    author: &str,
) -> Result<SubmissionRecord, ExtractionError> {
    extract_with(kind, body, author, &[Grammar::Block, Grammar::Form])
}

/// Try each grammar in `order` and return the first complete record.
///
/// On failure the error names the missing fields of the attempt that came
/// closest to a complete record.
pub fn extract_with(
    kind: Kind,
    body: &str,
    author: &str,
    order: &[Grammar],
) -> Result<SubmissionRecord, ExtractionError> {
    let mut best: Option<Vec<&'static str>> = None;

    for grammar in order {
        match lookup_all(kind, body, *grammar) {
            Ok(values) => return Ok(build(kind, values, author)),
            Err(missing) => {
                if best.as_ref().map_or(true, |b| missing.len() < b.len()) {
                    best = Some(missing);
                }
            }
        }
    }

    Err(ExtractionError {
        kind,
        missing: best.unwrap_or_else(|| fields(kind).iter().map(|f| f.key).collect()),
    })
}

/// Values found for every field of `kind`, keyed like the block grammar.
struct Values(Vec<(&'static str, String)>);

impl Values {
    fn take(&mut self, key: &str) -> String {
        self.0
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| std::mem::take(v))
            .unwrap_or_default()
    }
}

fn lookup_all(kind: Kind, body: &str, grammar: Grammar) -> Result<Values, Vec<&'static str>> {
    let region = match grammar {
        Grammar::Form => body,
        Grammar::Block => block_region(body).unwrap_or(body),
    };

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for field in fields(kind) {
        let value = match grammar {
            Grammar::Form => form_value(region, field.prompt),
            Grammar::Block => block_value(region, field.key),
        };
        match value {
            Some(v) => found.push((field.key, v)),
            None => missing.push(field.key),
        }
    }

    if missing.is_empty() {
        Ok(Values(found))
    } else {
        Err(missing)
    }
}

fn build(kind: Kind, mut values: Values, author: &str) -> SubmissionRecord {
    let author = author.to_string();
    match kind {
        Kind::Plugin => SubmissionRecord::Plugin(PluginRecord {
            import_id: values.take("id"),
            package_link: values.take("link"),
            display_name: values.take("name"),
            description: values.take("desc"),
            author,
            repo: values.take("repo"),
        }),
        Kind::Adapter => SubmissionRecord::Adapter(AdapterRecord {
            import_id: values.take("id"),
            package_link: values.take("link"),
            display_name: values.take("name"),
            description: values.take("desc"),
            author,
            repo: values.take("repo"),
        }),
        Kind::Bot => SubmissionRecord::Bot(BotRecord {
            display_name: values.take("name"),
            description: values.take("desc"),
            author,
            repo: values.take("repo"),
        }),
    }
}

/// First non-blank line after `prompt`, cut at the first `*`.
fn form_value(body: &str, prompt: &str) -> Option<String> {
    let pattern = format!(r"{}\s*([^*\r\n]+)", regex::escape(prompt));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(body)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Value of a `- key: value` line.
fn block_value(region: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?m)^[ \t]*- {}:[ \t]*(.+?)[ \t]*\r?$", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let value = unescape_block_value(re.captures(region)?.get(1)?.as_str().trim());
    (!value.is_empty()).then_some(value)
}

/// Keep comment delimiters out of hidden-block values so the block always
/// ends at its own `-->`.
fn escape_block_value(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace("<!--", "&lt;!--")
        .replace("-->", "--&gt;")
}

fn unescape_block_value(value: &str) -> String {
    value
        .replace("--&gt;", "-->")
        .replace("&lt;!--", "<!--")
        .replace("&amp;", "&")
}

fn block_pattern() -> Option<Regex> {
    Regex::new(&format!(
        r"(?s){}\s*<!--(.*?)-->",
        regex::escape(BLOCK_HEADER)
    ))
    .ok()
}

/// Interior of the hidden block, when the body carries one.
fn block_region(body: &str) -> Option<&str> {
    let re = block_pattern()?;
    Some(re.captures(body)?.get(1)?.as_str())
}

/// Render `record` in the issue-form layout.
pub fn render_form(record: &SubmissionRecord) -> String {
    fields(record.kind())
        .iter()
        .map(|f| format!("{}\n{}\n", f.prompt, field_of(record, f.key)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render `record` as the hidden block.
pub fn render_block(record: &SubmissionRecord) -> String {
    let mut out = format!("{BLOCK_HEADER}\n<!--\n");
    for field in fields(record.kind()) {
        let value = escape_block_value(field_of(record, field.key));
        out.push_str(&format!("- {}: {value}\n", field.key));
    }
    out.push_str("-->");
    out
}

/// Insert or refresh the hidden block in `body`.
///
/// Returns `None` when the body already carries exactly this block.
pub fn upsert_block(body: &str, record: &SubmissionRecord) -> Option<String> {
    let rendered = render_block(record);

    if let Some(m) = block_pattern().and_then(|re| re.find(body)) {
        if m.as_str() == rendered {
            return None;
        }
        let mut updated = String::with_capacity(body.len() + rendered.len());
        updated.push_str(&body[..m.start()]);
        updated.push_str(&rendered);
        updated.push_str(&body[m.end()..]);
        return Some(updated);
    }

    let head = body.trim_end();
    if head.is_empty() {
        Some(rendered)
    } else {
        Some(format!("{head}\n\n{rendered}"))
    }
}

fn field_of<'a>(record: &'a SubmissionRecord, key: &str) -> &'a str {
    match key {
        "id" => record.import_id().unwrap_or_default(),
        "link" => record.package_link().unwrap_or_default(),
        "name" => record.display_name(),
        "desc" => record.description(),
        "repo" => record.repo(),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_value_stops_at_next_prompt() {
        let body = "**你的插件名称：**\n**简短描述插件功能：**\n复读";
        assert_eq!(form_value(body, "**你的插件名称：**"), None);
        assert_eq!(
            form_value(body, "**简短描述插件功能：**").as_deref(),
            Some("复读")
        );
    }

    #[test]
    fn form_value_skips_blank_lines_and_crlf() {
        let body = "**机器人名称：**\r\n\r\n  coolqbot  \r\n**机器人功能：**\r\nwow";
        assert_eq!(
            form_value(body, "**机器人名称：**").as_deref(),
            Some("coolqbot")
        );
    }

    #[test]
    fn block_value_tolerates_indent_and_crlf() {
        let region = "\n  - name: example \r\n- repo: a/b\r\n";
        assert_eq!(block_value(region, "name").as_deref(), Some("example"));
        assert_eq!(block_value(region, "repo").as_deref(), Some("a/b"));
        assert_eq!(block_value(region, "desc"), None);
    }

    #[test]
    fn block_escaping_is_reversible() {
        for raw in ["a --> b", "<!-- x", "<!-->", "&lt;!--", "--&gt;", "A & B", "--->"] {
            let escaped = escape_block_value(raw);
            assert!(!escaped.contains("-->") && !escaped.contains("<!--"), "{escaped}");
            assert_eq!(unescape_block_value(&escaped), raw);
        }
    }

    #[test]
    fn missing_fields_are_reported_by_key() {
        let body = "**机器人名称：**\ncoolqbot\n";
        let err = extract(Kind::Bot, body, "test").unwrap_err();
        assert_eq!(err.kind, Kind::Bot);
        assert_eq!(err.missing, vec!["desc", "repo"]);
    }

    #[test]
    fn empty_grammar_list_reports_every_field() {
        let err = extract_with(Kind::Plugin, "", "test", &[]).unwrap_err();
        assert_eq!(err.missing, vec!["name", "desc", "id", "link", "repo"]);
    }
}
