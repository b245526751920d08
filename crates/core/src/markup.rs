//! Translation between the two checklist markup dialects.
//!
//! The Jira side formats item names with a Markdown-like "checklist markup"
//! (headings `## `, bold `**`, italic `*`, links `[alias](url)`, 4-space code
//! lines). The wiki side uses its own dialect (headings `!2 `, bold `__`,
//! italic `''`, links `[alias|url]`, `{{{code}}}` spans). Both directions are
//! total, best-effort functions: unrecognized or malformed text passes
//! through unchanged and translation never fails.
//!
//! Each construct is matched by a small explicit scanner function. Scanning
//! is left-to-right and non-overlapping; at a given position the construct
//! functions are tried in a fixed precedence order (link, heading, italic,
//! bold, code) and the first match wins. The inner text of bold/italic spans
//! is translated recursively, so emphasis composes with links and code.
//!
//! Bulleted list markers (`* `, `** `) are shared by both dialects and are
//! deliberately not translated: the emphasis scanners require a non-blank
//! first inner character, which rules bullets out.

/// Characters allowed directly after a closing emphasis delimiter.
const EMPHASIS_TAIL: &str = ".:;,_!?)}]\"%/~+-";

/// File extensions that mark a wiki link target as an image.
const IMAGE_SUFFIXES: [&str; 5] = [".jpg", "jpeg", ".gif", ".png", ".bmp"];

/// First occurrence of `needle` starting at or after byte index `from`.
/// Walks char boundaries, so a multi-byte first character cannot break the
/// minimum-one-char-inner requirement the callers encode in `from`.
fn find_from(text: &str, needle: &str, from: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .filter(|&i| i >= from)
        .find(|&i| text[i..].starts_with(needle))
}

// ---------------------------------------------------------------------------
// Checklist markup -> wiki markup
// ---------------------------------------------------------------------------

/// Translate checklist markup into wiki markup.
///
/// Blank input is returned unchanged. Text that matches none of the known
/// constructs passes through verbatim.
pub fn checklist_to_wiki(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut pos = 0;

    while pos < text.len() {
        let line_start = pos == 0 || text.as_bytes()[pos - 1] == b'\n';
        let after_space = pos == 0
            || text[..pos]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);

        let matched = checklist_link(text, pos)
            .or_else(|| line_start.then(|| checklist_heading(text, pos)).flatten())
            .or_else(|| after_space.then(|| checklist_italic(text, pos)).flatten())
            .or_else(|| after_space.then(|| checklist_bold(text, pos)).flatten())
            .or_else(|| line_start.then(|| checklist_code(text, pos)).flatten());

        match matched {
            Some((replacement, next)) => {
                out.push_str(&replacement);
                pos = next;
            }
            None => {
                let ch = text[pos..].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    out
}

/// `[alias](url)` or `![alias](url)` -> `[alias|url]`, or `[url]` when the
/// alias is blank. The leading `!` (image marker) is informational only and
/// is dropped; the reverse direction re-infers it from the url extension.
fn checklist_link(text: &str, pos: usize) -> Option<(String, usize)> {
    let rest = &text[pos..];
    let bang = usize::from(rest.starts_with('!'));
    let body = rest[bang..].strip_prefix('[')?;

    // The alias may itself contain `]`, so candidate closers are tried in
    // order until one is followed by an optional gap and a `(url)` part.
    let mut search = 1;
    while let Some(close) = find_from(body, "]", search) {
        let alias = &body[..close];
        let tail = &body[close + 1..];
        let gap = tail.len() - tail.trim_start().len();

        if let Some(target) = tail[gap..].strip_prefix('(') {
            if let Some(end) = find_from(target, ")", 1) {
                let link = &target[..end];
                let replacement = if alias.trim().is_empty() {
                    format!("[{link}]")
                } else {
                    format!("[{alias}|{link}]")
                };
                let consumed = bang + 1 + close + 1 + gap + 1 + link.len() + 1;
                return Some((replacement, pos + consumed));
            }
        }

        search = close + 1;
    }

    None
}

/// A run of `#` at line start followed by spaces/tabs -> `!N `.
fn checklist_heading(text: &str, pos: usize) -> Option<(String, usize)> {
    let rest = &text[pos..];
    let level = rest.len() - rest.trim_start_matches('#').len();
    if level == 0 {
        return None;
    }

    let after = &rest[level..];
    let gap = after.len() - after.trim_start_matches([' ', '\t']).len();
    if gap == 0 {
        return None;
    }

    Some((format!("!{level} "), pos + level + gap))
}

/// `*text*` -> `''text''`. The inner text must not start with whitespace or
/// `*` and cannot contain `*`; the closing delimiter must be followed by a
/// boundary so mid-word asterisks are left alone.
fn checklist_italic(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix('*')?;
    let first = body.chars().next()?;
    if first.is_whitespace() || first == '*' {
        return None;
    }

    let close = body.find('*')?;
    let end = pos + 1 + close + 1;
    if !emphasis_boundary(text, end) {
        return None;
    }

    Some((format!("''{}''", checklist_to_wiki(&body[..close])), end))
}

/// `**text**` -> `__text__`, same boundary rules as italic.
fn checklist_bold(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix("**")?;
    let first = body.chars().next()?;
    if first.is_whitespace() || first == '*' {
        return None;
    }

    let close = body.find('*')?;
    if !body[close..].starts_with("**") {
        return None;
    }

    let end = pos + 2 + close + 2;
    if !emphasis_boundary(text, end) {
        return None;
    }

    Some((format!("__{}__", checklist_to_wiki(&body[..close])), end))
}

/// A line starting with exactly 4 spaces -> `{{{rest of line}}}`.
fn checklist_code(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix("    ")?;
    let line_end = body.find(['\r', '\n']).unwrap_or(body.len());
    if line_end == 0 {
        return None;
    }

    let mut replacement = String::from("{{{");
    replacement.push_str(&body[..line_end]);
    replacement.push_str("}}}");
    Some((replacement, pos + 4 + line_end))
}

fn emphasis_boundary(text: &str, pos: usize) -> bool {
    match text[pos..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || EMPHASIS_TAIL.contains(c),
    }
}

// ---------------------------------------------------------------------------
// Wiki markup -> checklist markup
// ---------------------------------------------------------------------------

/// Translate wiki markup into checklist markup.
///
/// Blank input is returned unchanged. Text that matches none of the known
/// constructs passes through verbatim.
pub fn wiki_to_checklist(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut pos = 0;

    while pos < text.len() {
        let line_start = pos == 0 || text.as_bytes()[pos - 1] == b'\n';

        let matched = wiki_link(text, pos)
            .or_else(|| line_start.then(|| wiki_heading(text, pos)).flatten())
            .or_else(|| wiki_span(text, pos, "''", "*"))
            .or_else(|| wiki_span(text, pos, "__", "**"))
            .or_else(|| line_start.then(|| wiki_code(text, pos)).flatten());

        match matched {
            Some((replacement, next)) => {
                out.push_str(&replacement);
                pos = next;
            }
            None => {
                let ch = text[pos..].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    out
}

/// `[alias|url]` or `[url]` -> `[alias](url)`, with a leading `!` when the
/// url names an image. A blank alias is replaced by the url itself.
fn wiki_link(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix('[')?;
    let close = find_from(body, "]", 1)?;
    let inner = &body[..close];

    let (alias, link) = match inner.find('|') {
        Some(bar) if bar + 1 < inner.len() => (&inner[..bar], &inner[bar + 1..]),
        _ => ("", inner),
    };

    let image = IMAGE_SUFFIXES.iter().any(|suffix| link.ends_with(suffix));
    let shown = if alias.trim().is_empty() { link } else { alias };
    let marker = if image { "!" } else { "" };

    Some((format!("{marker}[{shown}]({link})"), pos + 1 + close + 1))
}

/// `!N` (N in 1..=6) at line start -> a run of N `#`. The digit range acts
/// as the clamp: other levels are not headings.
fn wiki_heading(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix('!')?;
    let level = body.chars().next()?.to_digit(10)?;
    if !(1..=6).contains(&level) {
        return None;
    }

    Some(("#".repeat(level as usize), pos + 2))
}

/// `''text''` -> `*text*` and `__text__` -> `**text**`, shortest inner span,
/// which may cross lines. Inner text is translated recursively.
fn wiki_span(text: &str, pos: usize, delim: &str, target: &str) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix(delim)?;
    let close = find_from(body, delim, 1)?;
    let inner = wiki_to_checklist(&body[..close]);

    Some((
        format!("{target}{inner}{target}"),
        pos + delim.len() + close + delim.len(),
    ))
}

/// `{{{text}}}` at line start -> a 4-space-indented line.
fn wiki_code(text: &str, pos: usize) -> Option<(String, usize)> {
    let body = text[pos..].strip_prefix("{{{")?;
    let close = find_from(body, "}}}", 1)?;

    let mut replacement = String::from("    ");
    replacement.push_str(&body[..close]);
    Some((replacement, pos + 3 + close + 3))
}
