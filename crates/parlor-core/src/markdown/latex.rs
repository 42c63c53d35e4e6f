//! Math delimiter normalization.
//!
//! Models often write `\[...\]` and `\(...\)`; the parser only understands
//! dollar delimiters. Code spans and fenced blocks are left alone.

/// Rewrite `\[..\]` to `$$..$$` and `\(..\)` to `$..$` outside code.
///
/// Openers without a matching closer are kept verbatim.
#[must_use]
pub fn process_latex_brackets(text: &str) -> String {
    if !text.contains("\\[") && !text.contains("\\(") {
        return text.to_string();
    }
    map_outside_code(text, convert_brackets)
}

/// Escape lone `$` so it is not read as inline math. `$$` is kept.
#[must_use]
pub fn escape_single_dollars(text: &str) -> String {
    if !text.contains('$') {
        return text.to_string();
    }
    map_outside_code(text, escape_dollars)
}

fn convert_brackets(text: &str) -> String {
    const PAIRS: [(&str, &str, &str); 2] = [("\\[", "\\]", "$$"), ("\\(", "\\)", "$")];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let next = PAIRS
            .iter()
            .filter_map(|&(open, close, delim)| rest.find(open).map(|pos| (pos, open, close, delim)))
            .min_by_key(|(pos, ..)| *pos);
        let Some((pos, open, close, delim)) = next else {
            break;
        };

        let body_start = pos + open.len();
        let Some(len) = rest[body_start..].find(close) else {
            out.push_str(&rest[..body_start]);
            rest = &rest[body_start..];
            continue;
        };

        out.push_str(&rest[..pos]);
        out.push_str(delim);
        out.push_str(&rest[body_start..body_start + len]);
        out.push_str(delim);
        rest = &rest[body_start + len + close.len()..];
    }

    out.push_str(rest);
    out
}

fn escape_dollars(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        if c == '$' && prev != Some('$') && prev != Some('\\') && next != Some('$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Apply `f` to everything except fenced code blocks and inline code spans.
fn map_outside_code(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut plain = String::new();
    let mut fence: Option<(char, usize)> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if let Some((ch, len)) = fence {
            out.push_str(line);
            if let Some((close_ch, close_len)) = fence_run(trimmed)
                && close_ch == ch
                && close_len >= len
                && trimmed.trim_end().chars().all(|c| c == ch)
            {
                fence = None;
            }
            continue;
        }

        if let Some(opening) = fence_run(trimmed) {
            out.push_str(&map_inline(&plain, &f));
            plain.clear();
            out.push_str(line);
            fence = Some(opening);
            continue;
        }

        plain.push_str(line);
    }

    out.push_str(&map_inline(&plain, &f));
    out
}

fn fence_run(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = line.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn map_inline(text: &str, f: &impl Fn(&str) -> String) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let run = backtick_run(bytes, i);
        match find_closing_run(bytes, i + run, run) {
            Some(close) => {
                out.push_str(&f(&text[start..i]));
                out.push_str(&text[i..close + run]);
                i = close + run;
                start = i;
            }
            None => i += run,
        }
    }

    out.push_str(&f(&text[start..]));
    out
}

fn backtick_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|&&b| b == b'`').count()
}

fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = backtick_run(bytes, i);
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}
