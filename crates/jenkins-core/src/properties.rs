//! Build parameters written as Java `.properties` text.
//!
//! Supported: `#` / `!` comment lines, `=` / `:` / whitespace separators,
//! backslash line continuation and the `\t \n \r \f \uXXXX` escapes. Any
//! other escaped character stands for itself. A key given twice keeps its
//! first position and its last value.

use jenkins_client::Parameters;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertiesError {
    #[error("malformed \\uXXXX escape on line {line}")]
    MalformedUnicodeEscape { line: usize },
}

pub fn parse(text: &str) -> Result<Parameters, PropertiesError> {
    let mut parameters = Parameters::new();
    for (line, logical) in logical_lines(text) {
        let (key, value) = split_entry(&logical);
        let key = unescape(key).ok_or(PropertiesError::MalformedUnicodeEscape { line })?;
        let value = unescape(value).ok_or(PropertiesError::MalformedUnicodeEscape { line })?;
        parameters.insert(key, value);
    }
    Ok(parameters)
}

/// One `key=value` line that [`parse`] reads back as exactly `key` and
/// `value`.
pub fn format_entry(key: &str, value: &str) -> String {
    let mut line = String::with_capacity(key.len() + value.len() + 1);
    for c in key.chars() {
        match c {
            ' ' | '=' | ':' | '#' | '!' => {
                line.push('\\');
                line.push(c);
            }
            c => push_escaped(&mut line, c),
        }
    }
    line.push('=');
    for (i, c) in value.chars().enumerate() {
        match c {
            ' ' if i == 0 => line.push_str("\\ "),
            c => push_escaped(&mut line, c),
        }
    }
    line
}

fn push_escaped(line: &mut String, c: char) {
    match c {
        '\\' => line.push_str("\\\\"),
        '\t' => line.push_str("\\t"),
        '\n' => line.push_str("\\n"),
        '\r' => line.push_str("\\r"),
        '\u{c}' => line.push_str("\\f"),
        c => line.push(c),
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

/// Lines ending in `\r\n`, `\r` or `\n`.
fn natural_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(pos) => {
                lines.push(&rest[..pos]);
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Joins continued lines and drops comments, keeping the 1-based number of
/// the line each entry starts on.
fn logical_lines(text: &str) -> Vec<(usize, Vec<char>)> {
    let mut entries = Vec::new();
    let mut current: Option<(usize, Vec<char>)> = None;

    for (index, raw) in natural_lines(text).into_iter().enumerate() {
        let line = raw.trim_start_matches(is_blank);
        if current.is_none() && (line.is_empty() || line.starts_with(['#', '!'])) {
            continue;
        }

        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        let continued = trailing % 2 == 1;
        let content = if continued { &line[..line.len() - 1] } else { line };

        let (_, chars) = current.get_or_insert_with(|| (index + 1, Vec::new()));
        chars.extend(content.chars());

        if !continued {
            entries.extend(current.take());
        }
    }
    entries.extend(current);
    entries
}

/// Returns the still-escaped key and value of one logical line.
fn split_entry(line: &[char]) -> (&[char], &[char]) {
    let len = line.len();
    let mut key_end = len;
    let mut has_separator = false;
    let mut i = 0;
    while i < len {
        match line[i] {
            '\\' => i += 2,
            '=' | ':' => {
                key_end = i;
                has_separator = true;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }

    let mut value_start = (key_end + 1).min(len);
    while value_start < len && is_blank(line[value_start]) {
        value_start += 1;
    }
    if !has_separator && value_start < len && matches!(line[value_start], '=' | ':') {
        value_start += 1;
        while value_start < len && is_blank(line[value_start]) {
            value_start += 1;
        }
    }
    (&line[..key_end], &line[value_start..])
}

fn unescape(chars: &[char]) -> Option<String> {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&escaped) = chars.get(i) else {
            break;
        };
        i += 1;
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\u{c}'),
            'u' => {
                let unit = hex_unit(chars.get(i..i + 4)?)?;
                i += 4;
                if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: the low half must follow as another escape.
                    let low = match chars.get(i..i + 6) {
                        Some(['\\', 'u', rest @ ..]) => hex_unit(rest)?,
                        _ => return None,
                    };
                    i += 6;
                    out.push(char::decode_utf16([unit, low]).next()?.ok()?);
                } else {
                    out.push(char::from_u32(u32::from(unit))?);
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn hex_unit(digits: &[char]) -> Option<u16> {
    if digits.len() != 4 {
        return None;
    }
    digits.iter().try_fold(0u16, |acc, c| {
        c.to_digit(16).map(|d| (acc << 4) | d as u16)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(text: &str) -> Vec<(String, String)> {
        parse(text)
            .unwrap()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn blank_text_has_no_parameters() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn all_separator_forms() {
        assert_eq!(
            pairs("a=1\nb: 2\nc 3\nd = 4\ne\t:\t5\nflag\n"),
            vec![
                pair("a", "1"),
                pair("b", "2"),
                pair("c", "3"),
                pair("d", "4"),
                pair("e", "5"),
                pair("flag", ""),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            pairs("# deploy settings\n  ! legacy\nENV=prod\n"),
            vec![pair("ENV", "prod")]
        );
    }

    #[test]
    fn value_keeps_second_separator_and_trailing_space() {
        assert_eq!(pairs("url=a=b \n"), vec![pair("url", "a=b ")]);
    }

    #[test]
    fn continuation_joins_lines_and_strips_indent() {
        assert_eq!(
            pairs("hosts=web1,\\\n      web2,\\\r\n  web3\n"),
            vec![pair("hosts", "web1,web2,web3")]
        );
    }

    #[test]
    fn even_backslashes_do_not_continue() {
        assert_eq!(
            pairs("path=C:\\\\\nnext=1"),
            vec![pair("path", "C:\\"), pair("next", "1")]
        );
    }

    #[test]
    fn escapes_in_keys_and_values() {
        assert_eq!(
            pairs("my\\ key\\=x=tab\\there\\u00e9\\q"),
            vec![pair("my key=x", "tab\there\u{e9}q")]
        );
    }

    #[test]
    fn surrogate_pair_escape() {
        assert_eq!(pairs("emoji=\\uD83D\\uDE80"), vec![pair("emoji", "\u{1F680}")]);
    }

    #[test]
    fn malformed_unicode_escape_reports_line() {
        let err = parse("ok=1\nbad=\\u12G4\n").unwrap_err();
        assert_eq!(err, PropertiesError::MalformedUnicodeEscape { line: 2 });
        assert!(parse("short=\\u12").is_err());
    }

    #[test]
    fn repeated_key_last_value_wins_in_place() {
        assert_eq!(
            pairs("A=1\nB=2\nA=3\n"),
            vec![pair("A", "3"), pair("B", "2")]
        );
    }

    #[test]
    fn formatted_entry_reads_back_verbatim() {
        let key = "odd key=:#!";
        let value = "  padded\\path\tand\nnewline ";
        let line = format_entry(key, value);
        assert!(!line.contains('\n'));
        assert_eq!(pairs(&line), vec![pair(key, value)]);
    }

    #[test]
    fn lone_cr_terminates_lines() {
        assert_eq!(pairs("a=1\rb=2"), vec![pair("a", "1"), pair("b", "2")]);
    }
}
