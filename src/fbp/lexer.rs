//! Tokenizer for FBP notation.
//!
//! Newlines and top-level commas both end a statement and are reported as
//! [`TokenKind::Separator`]. Text inside parentheses is captured raw so that
//! component metadata may contain commas.

use crate::fbp::error::FbpParseError;
use std::iter::Peekable;
use std::str::Chars;

/// Token categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  /// Node id, port name, component name or keyword.
  Ident(String),
  /// `->`
  Arrow,
  /// `[n]` after a port name.
  Index(usize),
  /// Raw text between `(` and `)`.
  Component(String),
  /// Text between single quotes, escapes resolved.
  Literal(String),
  /// `=`
  Equals,
  /// `:`
  Colon,
  /// `# @key value`
  Annotation(String, String),
  /// Newline or comma.
  Separator,
}

impl TokenKind {
  /// Short description for error messages.
  pub fn describe(&self) -> String {
    match self {
      TokenKind::Ident(name) => format!("'{name}'"),
      TokenKind::Arrow => "'->'".to_string(),
      TokenKind::Index(index) => format!("'[{index}]'"),
      TokenKind::Component(text) => format!("'({text})'"),
      TokenKind::Literal(text) => format!("packet '{text}'"),
      TokenKind::Equals => "'='".to_string(),
      TokenKind::Colon => "':'".to_string(),
      TokenKind::Annotation(key, _) => format!("annotation '@{key}'"),
      TokenKind::Separator => "end of statement".to_string(),
    }
  }
}

/// A token and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  /// What was read.
  pub kind: TokenKind,
  /// 1-based line.
  pub line: usize,
  /// 1-based column.
  pub column: usize,
}

fn is_ident_char(ch: char) -> bool {
  ch.is_alphanumeric() || matches!(ch, '_' | '-' | '/' | '.' | '*' | '$')
}

struct Lexer<'a> {
  chars: Peekable<Chars<'a>>,
  line: usize,
  column: usize,
  tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
  fn new(source: &'a str) -> Self {
    Self {
      chars: source.chars().peekable(),
      line: 1,
      column: 1,
      tokens: Vec::new(),
    }
  }

  fn bump(&mut self) -> Option<char> {
    let ch = self.chars.next()?;
    if ch == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(ch)
  }

  fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
    self.tokens.push(Token { kind, line, column });
  }

  fn run(mut self) -> Result<Vec<Token>, FbpParseError> {
    while let Some(&ch) = self.chars.peek() {
      let (line, column) = (self.line, self.column);
      match ch {
        '\n' | ',' => {
          self.bump();
          self.push(TokenKind::Separator, line, column);
        }
        c if c.is_whitespace() => {
          self.bump();
        }
        '#' => self.comment(line, column),
        '\'' => {
          let text = self.literal(line, column)?;
          self.push(TokenKind::Literal(text), line, column);
        }
        '(' => {
          let text = self.delimited(')', "component declaration", line, column)?;
          self.push(TokenKind::Component(text.trim().to_string()), line, column);
        }
        '[' => {
          let text = self.delimited(']', "port index", line, column)?;
          let index = text.trim().parse::<usize>().map_err(|_| FbpParseError::Unexpected {
            line,
            column,
            expected: "a port index".to_string(),
            found: format!("'[{text}]'"),
          })?;
          self.push(TokenKind::Index(index), line, column);
        }
        '=' => {
          self.bump();
          self.push(TokenKind::Equals, line, column);
        }
        ':' => {
          self.bump();
          self.push(TokenKind::Colon, line, column);
        }
        '-' if self.arrow_follows() => {
          self.bump();
          self.bump();
          self.push(TokenKind::Arrow, line, column);
        }
        c if is_ident_char(c) => {
          let name = self.ident();
          self.push(TokenKind::Ident(name), line, column);
        }
        found => return Err(FbpParseError::UnexpectedChar { line, column, found }),
      }
    }
    Ok(self.tokens)
  }

  fn arrow_follows(&self) -> bool {
    let mut ahead = self.chars.clone();
    ahead.next() == Some('-') && ahead.next() == Some('>')
  }

  fn ident(&mut self) -> String {
    let mut name = String::new();
    while let Some(&ch) = self.chars.peek() {
      if !is_ident_char(ch) || (ch == '-' && self.arrow_follows()) {
        break;
      }
      name.push(ch);
      self.bump();
    }
    name
  }

  /// Skips a comment; `# @key value` becomes an annotation.
  fn comment(&mut self, line: usize, column: usize) {
    let mut text = String::new();
    while let Some(&ch) = self.chars.peek() {
      if ch == '\n' {
        break;
      }
      text.push(ch);
      self.bump();
    }
    let body = text.trim_start_matches('#').trim();
    if let Some(annotation) = body.strip_prefix('@') {
      let mut parts = annotation.splitn(2, char::is_whitespace);
      if let Some(key) = parts.next().filter(|k| !k.is_empty()) {
        let value = parts.next().unwrap_or_default().trim().to_string();
        self.push(TokenKind::Annotation(key.to_string(), value), line, column);
      }
    }
  }

  fn literal(&mut self, line: usize, column: usize) -> Result<String, FbpParseError> {
    self.bump();
    let mut text = String::new();
    loop {
      match self.bump() {
        None => {
          return Err(FbpParseError::Unterminated {
            line,
            column,
            what: "packet literal",
          })
        }
        Some('\\') => match self.bump() {
          Some(escaped) => text.push(escaped),
          None => {
            return Err(FbpParseError::Unterminated {
              line,
              column,
              what: "packet literal",
            })
          }
        },
        Some('\'') => return Ok(text),
        Some(ch) => text.push(ch),
      }
    }
  }

  fn delimited(
    &mut self,
    close: char,
    what: &'static str,
    line: usize,
    column: usize,
  ) -> Result<String, FbpParseError> {
    self.bump();
    let mut text = String::new();
    loop {
      match self.bump() {
        Some(ch) if ch == close => return Ok(text),
        Some('\n') | None => return Err(FbpParseError::Unterminated { line, column, what }),
        Some(ch) => text.push(ch),
      }
    }
  }
}

/// Splits `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, FbpParseError> {
  Lexer::new(source).run()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
      .unwrap()
      .into_iter()
      .map(|t| t.kind)
      .collect()
  }

  #[test]
  fn test_arrow_splits_hyphenated_names() {
    assert_eq!(
      kinds("my-node OUT->IN other"),
      vec![
        TokenKind::Ident("my-node".into()),
        TokenKind::Ident("OUT".into()),
        TokenKind::Arrow,
        TokenKind::Ident("IN".into()),
        TokenKind::Ident("other".into()),
      ]
    );
  }

  #[test]
  fn test_component_text_keeps_commas() {
    assert_eq!(
      kinds("A(core/Repeat:x=1,y=2), B"),
      vec![
        TokenKind::Ident("A".into()),
        TokenKind::Component("core/Repeat:x=1,y=2".into()),
        TokenKind::Separator,
        TokenKind::Ident("B".into()),
      ]
    );
  }

  #[test]
  fn test_literal_escapes_and_positions() {
    let tokens = tokenize("\n  'it\\'s' -> IN A").unwrap();
    assert_eq!(tokens[1].kind, TokenKind::Literal("it's".into()));
    assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
  }

  #[test]
  fn test_unterminated_literal() {
    assert_eq!(
      tokenize("'open -> IN A"),
      Err(FbpParseError::Unterminated {
        line: 1,
        column: 1,
        what: "packet literal"
      })
    );
  }

  #[test]
  fn test_annotations_and_comments() {
    assert_eq!(
      kinds("# @runtime noflo\n# plain comment\n"),
      vec![
        TokenKind::Annotation("runtime".into(), "noflo".into()),
        TokenKind::Separator,
        TokenKind::Separator,
      ]
    );
  }
}
