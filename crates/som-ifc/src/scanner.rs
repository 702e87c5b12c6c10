//! DATA section scanning for ISO-10303-21 files
//!
//! Splits the file into `;`-terminated statements while respecting string
//! literals and `/* */` comments, and yields the entity instances found
//! between `DATA;` and `ENDSEC;`.

use std::borrow::Cow;

use crate::{Error, Result};

const MAGIC: &str = "ISO-10303-21";

/// One entity statement from a DATA section, without its terminating `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement<'a> {
    /// Byte offset of the statement start in the file
    pub offset: usize,
    pub text: Cow<'a, str>,
}

/// Split `content` into raw statements.
fn split_statements(content: &str) -> Result<Vec<Statement<'_>>> {
    let bytes = content.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    // comment ranges inside the current statement, relative to the file
    let mut comments: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                let open = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(Error::Statement {
                                offset: open,
                                message: "unterminated string literal".to_string(),
                            });
                        }
                        Some(b'\'') if bytes.get(i + 1) == Some(&b'\'') => i += 2,
                        Some(b'\'') => break,
                        Some(_) => i += 1,
                    }
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let open = i;
                let close = content[i + 2..]
                    .find("*/")
                    .map(|pos| i + 2 + pos + 2)
                    .ok_or_else(|| Error::Statement {
                        offset: open,
                        message: "unterminated comment".to_string(),
                    })?;
                comments.push((open, close));
                i = close;
            }
            b';' => {
                statements.push(make_statement(content, start, i, &comments));
                comments.clear();
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }

    Ok(statements)
}

fn make_statement<'a>(
    content: &'a str,
    start: usize,
    end: usize,
    comments: &[(usize, usize)],
) -> Statement<'a> {
    let text = if comments.is_empty() {
        Cow::Borrowed(content[start..end].trim())
    } else {
        let mut owned = String::with_capacity(end - start);
        let mut cursor = start;
        for &(open, close) in comments {
            owned.push_str(&content[cursor..open]);
            owned.push(' ');
            cursor = close;
        }
        owned.push_str(&content[cursor..end]);
        Cow::Owned(owned.trim().to_string())
    };

    let leading = content[start..end].len() - content[start..end].trim_start().len();
    Statement {
        offset: start + leading,
        text,
    }
}

/// Scan an IFC file and return the entity statements of its DATA sections.
pub fn data_statements(content: &str) -> Result<Vec<Statement<'_>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if !content.trim_start().starts_with(MAGIC) {
        return Err(Error::InvalidFormat(format!("missing '{MAGIC}' header")));
    }

    let mut in_data = false;
    let mut saw_data = false;
    let mut entities = Vec::new();

    for statement in split_statements(content)? {
        let keyword = statement.text.as_ref();
        if in_data {
            if keyword.eq_ignore_ascii_case("ENDSEC") {
                in_data = false;
            } else if keyword.starts_with('#') {
                entities.push(statement);
            } else if !keyword.is_empty() {
                return Err(Error::Statement {
                    offset: statement.offset,
                    message: format!("unexpected statement in DATA section: '{keyword}'"),
                });
            }
        } else if keyword.eq_ignore_ascii_case("DATA")
            || keyword.to_ascii_uppercase().starts_with("DATA(")
        {
            in_data = true;
            saw_data = true;
        }
    }

    if !saw_data {
        return Err(Error::InvalidFormat("no DATA section".to_string()));
    }
    if in_data {
        return Err(Error::InvalidFormat(
            "DATA section is not terminated by ENDSEC".to_string(),
        ));
    }

    Ok(entities)
}

/// Decode STEP string escapes.
///
/// Handles `''`, `\\`, `\S\c`, `\X\hh`, `\X2\...\X0\` (UTF-16) and
/// `\X4\...\X0\` (UTF-32). Code page switches `\Px\` are dropped. Malformed
/// escapes are kept verbatim.
pub fn decode_step_string(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' && chars.get(i + 1) == Some(&'\'') {
            out.push('\'');
            i += 2;
            continue;
        }
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 4)].iter().collect();
        if rest.starts_with("\\\\") {
            out.push('\\');
            i += 2;
        } else if rest.starts_with("\\X2\\") || rest.starts_with("\\X4\\") {
            let width = if rest.starts_with("\\X2\\") { 4 } else { 8 };
            match decode_wide(&chars[i + 4..], width) {
                Some((decoded, consumed)) => {
                    out.push_str(&decoded);
                    i += 4 + consumed;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            }
        } else if rest.starts_with("\\X\\") {
            match hex_value(&chars[i + 3..], 2) {
                Some(code) => {
                    out.push(char::from(code as u8));
                    i += 5;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            }
        } else if rest.starts_with("\\S\\") && chars.len() > i + 3 {
            let base = chars[i + 3] as u32;
            match char::from_u32(base + 128) {
                Some(decoded) if base < 128 => {
                    out.push(decoded);
                    i += 4;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        } else if rest.starts_with("\\P") && rest.chars().nth(3) == Some('\\') {
            // code page switch, e.g. \PA\
            i += 4;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}

fn hex_value(chars: &[char], width: usize) -> Option<u32> {
    if chars.len() < width {
        return None;
    }
    let digits: String = chars[..width].iter().collect();
    u32::from_str_radix(&digits, 16).ok()
}

/// Decode hex groups up to the closing `\X0\`. Returns the text and the
/// number of chars consumed including the terminator.
fn decode_wide(chars: &[char], width: usize) -> Option<(String, usize)> {
    let mut units = Vec::new();
    let mut pos = 0;
    loop {
        if chars[pos..].starts_with(&['\\', 'X', '0', '\\']) {
            pos += 4;
            break;
        }
        units.push(hex_value(&chars[pos..], width)?);
        pos += width;
    }

    let text = if width == 4 {
        let utf16: Vec<u16> = units.iter().map(|&u| u as u16).collect();
        char::decode_utf16(utf16)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        units
            .iter()
            .map(|&u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };
    Some((text, pos))
}
