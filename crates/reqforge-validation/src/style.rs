//! CSS structure checker

use reqforge_utils::types::{ArtifactKind, Diagnostic};

use crate::cursor::{Cursor, Pos};

fn error(message: impl Into<String>, pos: Pos) -> Diagnostic {
    Diagnostic::at(ArtifactKind::Style, message, pos.line, pos.column)
}

fn closer(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        _ => ']',
    }
}

pub(crate) fn check(content: &str) -> Option<Diagnostic> {
    scan(content).err()
}

fn scan(content: &str) -> Result<(), Diagnostic> {
    let mut cursor = Cursor::new(content);
    let mut stack: Vec<(char, Pos)> = Vec::new();
    // Text since the last `{`, `}` or `;`, comments and strings excluded.
    let mut prelude = String::new();
    let mut prelude_pos = cursor.pos();

    while let Some(ch) = cursor.peek() {
        let pos = cursor.pos();

        if cursor.eat("/*") {
            if !cursor.skip_past("*/") {
                return Err(error("unterminated comment", pos));
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                string(&mut cursor, ch)?;
                prelude.push_str("\"\"");
            }
            '{' => {
                cursor.bump();
                if prelude.trim().is_empty() {
                    return Err(error("empty selector before '{'", pos));
                }
                stack.push(('{', pos));
                prelude.clear();
            }
            '(' | '[' => {
                cursor.bump();
                stack.push((ch, pos));
                prelude.push(ch);
            }
            '}' | ')' | ']' => {
                cursor.bump();
                match stack.pop() {
                    Some((open, _)) if closer(open) == ch => {}
                    Some((open, open_pos)) => {
                        return Err(error(
                            format!(
                                "mismatched '{ch}': expected '{}' to close '{open}' opened at {}:{}",
                                closer(open),
                                open_pos.line,
                                open_pos.column
                            ),
                            pos,
                        ));
                    }
                    None => return Err(error(format!("unexpected '{ch}'"), pos)),
                }
                if ch == '}' {
                    prelude.clear();
                } else {
                    prelude.push(ch);
                }
            }
            ';' => {
                cursor.bump();
                if stack.is_empty() && is_declaration(&prelude) {
                    return Err(error("declaration outside of any block", prelude_pos));
                }
                if !stack.iter().any(|(open, _)| *open != '{') {
                    prelude.clear();
                } else {
                    prelude.push(ch);
                }
            }
            _ => {
                cursor.bump();
                if prelude.trim().is_empty() && !ch.is_whitespace() {
                    prelude_pos = pos;
                }
                prelude.push(ch);
            }
        }
    }

    if let Some((open, pos)) = stack.last() {
        let message = if *open == '{' {
            "unterminated block: '{' is never closed".to_string()
        } else {
            format!("unclosed '{open}'")
        };
        return Err(error(message, *pos));
    }

    let trailing = prelude.trim();
    if !trailing.is_empty() && !trailing.starts_with('@') {
        let message = if is_declaration(trailing) {
            "declaration outside of any block"
        } else {
            "selector without a block"
        };
        return Err(error(message, prelude_pos));
    }
    Ok(())
}

/// `prop: value` at the top level, as opposed to an at-rule or a selector.
fn is_declaration(prelude: &str) -> bool {
    let text = prelude.trim();
    if text.starts_with('@') {
        return false;
    }
    match text.split_once(':') {
        Some((property, _)) => {
            let property = property.trim();
            !property.is_empty()
                && property
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    }
}

fn string(cursor: &mut Cursor, quote: char) -> Result<(), Diagnostic> {
    let pos = cursor.pos();
    cursor.bump();
    loop {
        match cursor.bump() {
            None | Some('\n') => return Err(error("unterminated string", pos)),
            Some('\\') => {
                cursor.bump();
            }
            Some(c) if c == quote => return Ok(()),
            Some(_) => {}
        }
    }
}
