//! JavaScript structure checker
//!
//! A tokenizer that understands enough of the lexical grammar to balance
//! brackets correctly: comments, quoted strings, template literals with
//! nested `${}` substitutions, and regular expression literals.

use reqforge_utils::types::{ArtifactKind, Diagnostic};

use crate::cursor::{Cursor, Pos};

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Paren,
    Bracket,
    Brace,
    /// `${` inside a template literal started at the given position
    Substitution(Pos),
}

impl Open {
    fn symbol(self) -> &'static str {
        match self {
            Self::Paren => "(",
            Self::Bracket => "[",
            Self::Brace => "{",
            Self::Substitution(_) => "${",
        }
    }

    fn closer(self) -> char {
        match self {
            Self::Paren => ')',
            Self::Bracket => ']',
            Self::Brace | Self::Substitution(_) => '}',
        }
    }
}

/// What the previous significant token allows a `/` to mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    /// Start of input, an operator, an opening bracket or a keyword
    ExpectsOperand,
    /// An identifier, literal or closing bracket
    Operand,
}

fn error(message: impl Into<String>, pos: Pos) -> Diagnostic {
    Diagnostic::at(ArtifactKind::Behavior, message, pos.line, pos.column)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

pub(crate) fn check(content: &str) -> Option<Diagnostic> {
    scan(content).err()
}

fn scan(content: &str) -> Result<(), Diagnostic> {
    let mut cursor = Cursor::new(content);
    let mut stack: Vec<(Open, Pos)> = Vec::new();
    let mut prev = Prev::ExpectsOperand;

    while let Some(ch) = cursor.peek() {
        let pos = cursor.pos();

        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }
        if cursor.eat("//") {
            cursor.eat_while(|c| c != '\n');
            continue;
        }
        if cursor.eat("/*") {
            if !cursor.skip_past("*/") {
                return Err(error("unterminated block comment", pos));
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                string(&mut cursor, ch)?;
                prev = Prev::Operand;
            }
            '`' => {
                cursor.bump();
                if template(&mut cursor, pos)? {
                    stack.push((Open::Substitution(pos), cursor.pos()));
                    prev = Prev::ExpectsOperand;
                } else {
                    prev = Prev::Operand;
                }
            }
            '/' if prev == Prev::ExpectsOperand => {
                regex(&mut cursor)?;
                prev = Prev::Operand;
            }
            '(' | '[' | '{' => {
                cursor.bump();
                let open = match ch {
                    '(' => Open::Paren,
                    '[' => Open::Bracket,
                    _ => Open::Brace,
                };
                stack.push((open, pos));
                prev = Prev::ExpectsOperand;
            }
            ')' | ']' | '}' => {
                cursor.bump();
                match stack.pop() {
                    Some((Open::Substitution(template_pos), _)) if ch == '}' => {
                        // Back inside the template literal.
                        if template(&mut cursor, template_pos)? {
                            stack.push((Open::Substitution(template_pos), cursor.pos()));
                            prev = Prev::ExpectsOperand;
                        } else {
                            prev = Prev::Operand;
                        }
                        continue;
                    }
                    Some((open, _)) if open.closer() == ch => {}
                    Some((open, open_pos)) => {
                        return Err(error(
                            format!(
                                "mismatched '{ch}': expected '{}' to close '{}' opened at {}:{}",
                                open.closer(),
                                open.symbol(),
                                open_pos.line,
                                open_pos.column
                            ),
                            pos,
                        ));
                    }
                    None => return Err(error(format!("unexpected '{ch}'"), pos)),
                }
                // A `}` usually ends a block statement, after which an
                // operand (and so a regex) may follow.
                prev = if ch == '}' {
                    Prev::ExpectsOperand
                } else {
                    Prev::Operand
                };
            }
            c if is_ident_start(c) => {
                let word = cursor.eat_while(is_ident_char);
                prev = if REGEX_PREFIX_KEYWORDS.contains(&word.as_str()) {
                    Prev::ExpectsOperand
                } else {
                    Prev::Operand
                };
            }
            c if c.is_ascii_digit() => {
                cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                prev = Prev::Operand;
            }
            '.' if cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                cursor.bump();
                cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
                prev = Prev::Operand;
            }
            _ => {
                cursor.bump();
                // `++`/`--` after an operand are postfix; keep the operand state.
                if (ch == '+' || ch == '-') && prev == Prev::Operand && cursor.peek() == Some(ch)
                {
                    cursor.bump();
                } else {
                    prev = Prev::ExpectsOperand;
                }
            }
        }
    }

    if let Some((open, pos)) = stack.last() {
        return Err(match open {
            Open::Substitution(template_pos) => {
                error("unterminated template literal", *template_pos)
            }
            other => error(format!("unclosed '{}'", other.symbol()), *pos),
        });
    }
    Ok(())
}

fn string(cursor: &mut Cursor, quote: char) -> Result<(), Diagnostic> {
    let pos = cursor.pos();
    cursor.bump();
    loop {
        match cursor.bump() {
            None | Some('\n') => return Err(error("unterminated string literal", pos)),
            Some('\\') => {
                cursor.bump();
            }
            Some(c) if c == quote => return Ok(()),
            Some(_) => {}
        }
    }
}

/// Scan template characters after an opening backtick or a closing `}`.
///
/// Returns `true` when a `${` substitution starts, `false` at the closing
/// backtick.
fn template(cursor: &mut Cursor, start: Pos) -> Result<bool, Diagnostic> {
    loop {
        if cursor.eat("${") {
            return Ok(true);
        }
        match cursor.bump() {
            None => return Err(error("unterminated template literal", start)),
            Some('\\') => {
                cursor.bump();
            }
            Some('`') => return Ok(false),
            Some(_) => {}
        }
    }
}

fn regex(cursor: &mut Cursor) -> Result<(), Diagnostic> {
    let pos = cursor.pos();
    cursor.bump();
    let mut in_class = false;
    loop {
        match cursor.bump() {
            None | Some('\n') => {
                return Err(error("unterminated regular expression literal", pos));
            }
            Some('\\') => {
                cursor.bump();
            }
            Some('[') => in_class = true,
            Some(']') => in_class = false,
            Some('/') if !in_class => break,
            Some(_) => {}
        }
    }
    cursor.eat_while(|c| c.is_ascii_alphabetic());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> String {
        check(content).map(|d| d.message).unwrap_or_default()
    }

    #[test]
    fn test_valid_script() {
        let js = r#"
// toggle the theme
const items = [1, 2, 3].map((n) => n / 2);
let i = 0; i++; i--;
const re = /[/{]+\/x/gi;
const msg = `total: ${items.reduce((a, b) => a + b, 0)} and ${`nested ${i}`}`;
function onClick(e) {
  if (!e) { return /^\s*$/.test(msg); }
  const s = 'it\'s {fine}';
  /* block } comment */
  return { ok: true, path: "a/b" };
}
document.querySelector('#btn').addEventListener('click', onClick);
"#;
        assert_eq!(check(js), None);
    }

    #[test]
    fn test_unclosed_brace_reports_open_position() {
        let diag = check("function f() {\n  if (x) {\n    y();\n}\n").unwrap();
        assert_eq!(diag.message, "unclosed '{'");
        assert_eq!((diag.line, diag.column), (Some(1), Some(14)));
    }

    #[test]
    fn test_mismatched_and_unexpected_closers() {
        assert!(message("call(a, [b);").starts_with("mismatched ')': expected ']'"));
        assert_eq!(message("x = 1;\n}"), "unexpected '}'");
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(message("const s = \"abc;\n"), "unterminated string literal");
        assert_eq!(message("const t = `abc ${x}"), "unterminated template literal");
        assert_eq!(message("const t = `abc ${x"), "unterminated template literal");
        assert_eq!(message("const r = /abc;\n"), "unterminated regular expression literal");
        assert_eq!(message("/* never closed"), "unterminated block comment");
    }

    #[test]
    fn test_division_is_not_regex() {
        assert_eq!(check("const half = total / 2; const q = (a) / (b) / c;"), None);
        assert_eq!(check("const x = arr[0] / arr[1];"), None);
    }
}
