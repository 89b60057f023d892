//! Text cleanup for target descriptions and generated bullets.

use serde_json::Value;

/// List markers accepted at the start of a generated bullet line.
const BULLET_MARKERS: [char; 3] = ['-', '•', '*'];

/// Normalizes a pasted job description before it is analysed.
///
/// Drops control and zero-width characters, folds typographic quotes,
/// dashes and bullet glyphs to ASCII, collapses runs of spaces, trims every
/// line and keeps at most one blank line between paragraphs.
pub fn clean_target_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut folded = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => folded.push('\n'),
            '\t' | ' ' => folded.push(' '),
            '\u{2018}' | '\u{2019}' | '`' => folded.push('\''),
            '\u{201c}' | '\u{201d}' | '«' | '»' => folded.push('"'),
            '—' | '–' | '−' => folded.push('-'),
            '•' | '●' | '○' | '◦' | '■' | '□' | '▪' | '▫' | '⬤' | '⚫' | '⚪' | '◆' | '◇' | '★'
            | '☆' | '✓' | '✔' | '✗' | '✘' => folded.push('-'),
            '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2060}' | '\u{feff}' => {}
            c if c.is_control() => {}
            c => folded.push(c),
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for line in folded.split('\n') {
        let line = line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

/// Removes Markdown emphasis and formatting noise from a generated bullet.
pub fn clean_bullet(bullet: &str) -> String {
    let without_markup = bullet.replace("**", "").replace("__", "").replace('*', "");
    let without_markup = without_markup.trim_matches('_');

    let mut collapsed = String::with_capacity(without_markup.len());
    let mut chars = without_markup.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            let mut run = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                run += 1;
            }
            let keep = if run >= 3 { 1 } else { run };
            collapsed.extend(std::iter::repeat_n(c, keep));
        } else {
            collapsed.push(c);
        }
    }

    let joined = collapsed.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if matches!(c, '.' | ',' | ';' | ':') && out.ends_with(' ') {
            out.pop();
        }
        out.push(c);
    }
    out.trim().to_string()
}

/// Splits a free-text reply into bullets, one per marker line.
///
/// Only lines starting with `-`, `•` or `*` count; the marker and any
/// surrounding whitespace or marker characters are trimmed off.
pub fn parse_marked_bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(BULLET_MARKERS))
        .map(|line| {
            line.trim_matches(|c: char| c.is_whitespace() || BULLET_MARKERS.contains(&c))
                .to_string()
        })
        .filter(|bullet| !bullet.is_empty())
        .collect()
}

/// Best-effort JSON extraction from a model reply.
///
/// Tries the raw text, then the text without Markdown code fences, then the
/// outermost `{...}` span.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    let unfenced = text
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "");
    let unfenced = unfenced.trim();
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}
