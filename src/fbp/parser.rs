//! Recursive-descent parser from FBP tokens to a [`GraphJson`].

use crate::fbp::error::FbpParseError;
use crate::fbp::lexer::{tokenize, Token, TokenKind};
use crate::graph::{
  ConnectionJson, EndpointJson, ExportJson, GraphJson, Metadata, ProcessJson, PublicPortJson,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// A port reference inside a connection.
struct PortRef {
  name: String,
  index: Option<usize>,
}

/// Where a connection's packets come from.
enum Source {
  Port { node: String, port: PortRef },
  Packet(String),
}

/// Parses FBP notation into a graph definition.
///
/// ```rust
/// use flowweave::fbp::parse;
///
/// let definition = parse("'5s' -> INTERVAL Ticker(core/Ticker) OUT -> IN Log(core/Output)").unwrap();
/// assert_eq!(definition.processes.len(), 2);
/// assert_eq!(definition.connections.len(), 2);
/// assert_eq!(definition.connections[1].tgt.port, "in");
/// ```
pub fn parse(source: &str) -> Result<GraphJson, FbpParseError> {
  let tokens = tokenize(source)?;
  let mut parser = Parser::default();
  for statement in tokens.split(|t| t.kind == TokenKind::Separator) {
    if !statement.is_empty() {
      parser.statement(statement)?;
    }
  }
  parser.finish()
}

#[derive(Default)]
struct Parser {
  definition: GraphJson,
  first_use: BTreeMap<String, usize>,
}

/// Cursor over the tokens of one statement.
struct Cursor<'t> {
  tokens: &'t [Token],
  position: usize,
}

impl<'t> Cursor<'t> {
  fn peek(&self) -> Option<&'t Token> {
    self.tokens.get(self.position)
  }

  fn peek_kind(&self) -> Option<&'t TokenKind> {
    self.peek().map(|t| &t.kind)
  }

  fn next(&mut self) -> Option<&'t Token> {
    let token = self.tokens.get(self.position);
    self.position += 1;
    token
  }

  fn at_end(&self) -> bool {
    self.position >= self.tokens.len()
  }

  fn line(&self) -> usize {
    self
      .peek()
      .or_else(|| self.tokens.last())
      .map_or(0, |t| t.line)
  }

  fn error(&self, expected: &str) -> FbpParseError {
    match self.peek() {
      Some(token) => FbpParseError::Unexpected {
        line: token.line,
        column: token.column,
        expected: expected.to_string(),
        found: token.kind.describe(),
      },
      None => {
        let (line, column) = self
          .tokens
          .last()
          .map_or((0, 0), |t| (t.line, t.column));
        FbpParseError::Unexpected {
          line,
          column,
          expected: expected.to_string(),
          found: "end of statement".to_string(),
        }
      }
    }
  }

  fn ident(&mut self, expected: &str) -> Result<String, FbpParseError> {
    match self.peek_kind() {
      Some(TokenKind::Ident(name)) => {
        self.position += 1;
        Ok(name.clone())
      }
      _ => Err(self.error(expected)),
    }
  }

  fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), FbpParseError> {
    if self.peek_kind() == Some(kind) {
      self.position += 1;
      Ok(())
    } else {
      Err(self.error(expected))
    }
  }
}

impl Parser {
  fn statement(&mut self, tokens: &[Token]) -> Result<(), FbpParseError> {
    let mut cursor = Cursor {
      tokens,
      position: 0,
    };
    match cursor.peek_kind() {
      Some(TokenKind::Annotation(key, value)) => {
        self
          .definition
          .properties
          .insert(key.clone(), Value::String(value.clone()));
        cursor.next();
        if !cursor.at_end() {
          return Err(cursor.error("end of statement"));
        }
        Ok(())
      }
      Some(TokenKind::Ident(keyword))
        if matches!(keyword.as_str(), "INPORT" | "OUTPORT" | "EXPORT")
          && tokens.get(1).map(|t| &t.kind) == Some(&TokenKind::Equals) =>
      {
        let keyword = keyword.clone();
        cursor.position = 2;
        self.public_port(&keyword, &mut cursor)
      }
      _ => self.connection_chain(&mut cursor),
    }
  }

  /// `INPORT=Node.PORT:NAME`, `OUTPORT=...` or `EXPORT=...`.
  fn public_port(&mut self, keyword: &str, cursor: &mut Cursor<'_>) -> Result<(), FbpParseError> {
    let line = cursor.line();
    let private = cursor.ident("'Node.PORT'")?;
    let (node, port) = private
      .rsplit_once('.')
      .filter(|(node, port)| !node.is_empty() && !port.is_empty())
      .ok_or_else(|| FbpParseError::Unexpected {
        line,
        column: cursor.tokens[cursor.position - 1].column,
        expected: "'Node.PORT'".to_string(),
        found: format!("'{private}'"),
      })?;
    cursor.expect(&TokenKind::Colon, "':'")?;
    let public = cursor.ident("a public port name")?.to_lowercase();
    if !cursor.at_end() {
      return Err(cursor.error("end of statement"));
    }
    self.use_node(node, line);
    let port = port.to_lowercase();

    let binding = PublicPortJson {
      process: node.to_string(),
      port: port.clone(),
      metadata: Metadata::new(),
    };
    match keyword {
      "INPORT" => {
        self.definition.inports.insert(public, binding);
      }
      "OUTPORT" => {
        self.definition.outports.insert(public, binding);
      }
      _ => self.definition.exports.push(ExportJson {
        private: Some(format!("{node}.{port}")),
        process: None,
        port: None,
        public,
        metadata: Metadata::new(),
      }),
    }
    Ok(())
  }

  /// A declaration or a chain `source -> [port node port ->]* port node`.
  fn connection_chain(&mut self, cursor: &mut Cursor<'_>) -> Result<(), FbpParseError> {
    let mut source = match cursor.peek_kind() {
      Some(TokenKind::Literal(text)) => {
        cursor.next();
        Source::Packet(text.clone())
      }
      _ => {
        let node = self.node(cursor)?;
        if cursor.at_end() {
          return Ok(());
        }
        let port = self.port(cursor)?;
        Source::Port { node, port }
      }
    };
    cursor.expect(&TokenKind::Arrow, "'->'")?;

    loop {
      let in_port = self.port(cursor)?;
      let node = self.node(cursor)?;
      self.connect(source, &node, in_port);
      if cursor.at_end() {
        return Ok(());
      }
      let out_port = self.port(cursor)?;
      cursor.expect(&TokenKind::Arrow, "'->'")?;
      source = Source::Port {
        node,
        port: out_port,
      };
    }
  }

  fn connect(&mut self, source: Source, node: &str, port: PortRef) {
    let tgt = EndpointJson {
      process: node.to_string(),
      port: port.name,
      index: port.index,
    };
    let (src, data) = match source {
      Source::Port { node, port } => (
        Some(EndpointJson {
          process: node,
          port: port.name,
          index: port.index,
        }),
        None,
      ),
      Source::Packet(text) => (None, Some(Value::String(text))),
    };
    trace!(target_node = %tgt.process, port = %tgt.port, "fbp connection");
    self.definition.connections.push(ConnectionJson {
      src,
      data,
      tgt,
      metadata: Metadata::new(),
    });
  }

  fn port(&mut self, cursor: &mut Cursor<'_>) -> Result<PortRef, FbpParseError> {
    let name = cursor.ident("a port name")?.to_lowercase();
    let index = match cursor.peek_kind() {
      Some(TokenKind::Index(index)) => {
        cursor.next();
        Some(*index)
      }
      _ => None,
    };
    Ok(PortRef { name, index })
  }

  /// `Name` or `Name(Component)` or `Name(Component:key=value,...)`.
  fn node(&mut self, cursor: &mut Cursor<'_>) -> Result<String, FbpParseError> {
    let line = cursor.line();
    let name = cursor.ident("a node name")?;
    if let Some(TokenKind::Component(text)) = cursor.peek_kind() {
      cursor.next();
      self.declare(&name, text, line)?;
    }
    self.use_node(&name, line);
    Ok(name)
  }

  fn use_node(&mut self, name: &str, line: usize) {
    self.first_use.entry(name.to_string()).or_insert(line);
  }

  fn declare(&mut self, name: &str, text: &str, line: usize) -> Result<(), FbpParseError> {
    let (component, metadata) = match text.split_once(':') {
      Some((component, pairs)) => (component.trim(), parse_metadata(pairs)),
      None => (text.trim(), Metadata::new()),
    };
    if component.is_empty() {
      // `Name()` refers to a node declared elsewhere.
      return Ok(());
    }
    if let Some(existing) = self.definition.processes.get(name) {
      if existing.component != component {
        return Err(FbpParseError::ConflictingComponent {
          line,
          node: name.to_string(),
          component: component.to_string(),
          previous: existing.component.clone(),
        });
      }
      if metadata.is_empty() {
        return Ok(());
      }
    }
    self.definition.processes.insert(
      name.to_string(),
      ProcessJson {
        component: component.to_string(),
        metadata,
      },
    );
    Ok(())
  }

  fn finish(self) -> Result<GraphJson, FbpParseError> {
    if let Some((node, line)) = self
      .first_use
      .iter()
      .filter(|(node, _)| !self.definition.processes.contains_key(node.as_str()))
      .min_by_key(|(_, line)| **line)
    {
      return Err(FbpParseError::UndeclaredNode {
        line: *line,
        node: node.clone(),
      });
    }
    Ok(self.definition)
  }
}

/// `key=value,key2=value2`; a bare key maps to `true`.
fn parse_metadata(pairs: &str) -> Metadata {
  pairs
    .split(',')
    .map(str::trim)
    .filter(|pair| !pair.is_empty())
    .map(|pair| match pair.split_once('=') {
      Some((key, value)) => (key.trim().to_string(), Value::String(value.trim().to_string())),
      None => (pair.to_string(), Value::Bool(true)),
    })
    .collect()
}
