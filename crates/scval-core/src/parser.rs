//! Recursive-descent parser for the grammar in `spec.md` §4.2.
//!
//! Single-token lookahead, no backtracking: each production either
//! recognizes its leading token and consumes it, or fails immediately.
//! `try_*` helpers implement the grammar's Kleene-star repetitions
//! (`element_def*`, `attr_def*`, `list`) -- they return `Ok(false)`
//! without consuming input when the current token doesn't start that
//! production, rather than treating "no more repetitions" as an error.

use thiserror::Error;

use crate::lexer::{Lexer, Token, TokenKind};
use crate::tree::{NodeKind, Tree};

/// Failure to parse schema source. Carries enough to report roughly
/// where things went wrong; spec.md explicitly excludes full position
/// reporting (line/column) from scope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty schema source")]
    EmptyProgram,

    #[error("unterminated string literal at offset {offset}")]
    UnterminatedString { offset: u32 },

    #[error("unexpected token {found:?} at offset {offset} while parsing {context}")]
    UnexpectedToken {
        found: TokenKind,
        offset: u32,
        context: &'static str,
    },
}

/// Recursive-descent parser producing a [`Tree`] from schema source.
pub struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    tree: Tree,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let lexer = Lexer::new(src);
        // placeholder; replaced by the first real `advance()` in `parse`
        let current = Token {
            kind: TokenKind::Eof,
            offset: 0,
            len: 0,
        };
        Parser {
            src,
            lexer,
            current,
            tree: Tree::new(),
        }
    }

    /// Parses `program := (typedef | element_def)*` and returns the
    /// resulting schema tree, or the first parse error encountered.
    pub fn parse(mut self) -> Result<Tree, ParseError> {
        if self.src.is_empty() {
            return Err(ParseError::EmptyProgram);
        }
        self.tree.push_node(NodeKind::Root);
        self.advance();
        while self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Typedef {
                self.advance();
                self.parse_typedef()?;
            } else {
                self.tree.push_node(NodeKind::Children);
                self.parse_element_def()?;
                self.tree.pop_node();
            }
        }
        self.tree.pop_node();
        Ok(self.tree)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn unexpected(&self, context: &'static str) -> ParseError {
        if self.current.kind == TokenKind::Err {
            return ParseError::UnterminatedString {
                offset: self.current.offset,
            };
        }
        ParseError::UnexpectedToken {
            found: self.current.kind,
            offset: self.current.offset,
            context,
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &'static str) -> Result<(), ParseError> {
        if self.current.kind != kind {
            return Err(self.unexpected(context));
        }
        self.advance();
        Ok(())
    }

    /// Inserts a leaf carrying the *current* token's text, without
    /// consuming it (mirrors the original `LEAF` macro).
    fn leaf_here(&mut self, node_kind: NodeKind) {
        let text = self.current.text(self.src).to_string();
        self.tree.insert_leaf(node_kind, &text);
    }

    /// Checks the current token is `kind`, inserts a leaf from its text,
    /// then consumes it (mirrors `EXPECTEDLEAF`).
    fn expect_leaf(
        &mut self,
        kind: TokenKind,
        node_kind: NodeKind,
        context: &'static str,
    ) -> Result<(), ParseError> {
        if self.current.kind != kind {
            return Err(self.unexpected(context));
        }
        self.leaf_here(node_kind);
        self.advance();
        Ok(())
    }

    fn parse_typedef(&mut self) -> Result<(), ParseError> {
        self.tree.push_node(NodeKind::Typedef);
        self.expect_leaf(TokenKind::Id, NodeKind::Id, "typedef name")?;
        self.parse_typedef_body()?;
        self.tree.pop_node();
        Ok(())
    }

    fn parse_typedef_body(&mut self) -> Result<(), ParseError> {
        if self.try_parse_typedef_expr()? {
            return Ok(());
        }
        if self.current.kind == TokenKind::Callback {
            self.tree.push_node(NodeKind::Callback);
            self.advance();
            self.expect_leaf(TokenKind::Id, NodeKind::Id, "callback name")?;
            self.tree.pop_node();
            return Ok(());
        }
        Err(self.unexpected("typedef body"))
    }

    /// `type_expr := '(' enum ')' | '[' list ']' | base_type | ID | CSTR`.
    /// Returns `Ok(false)` without consuming anything if the current
    /// token doesn't start a `type_expr`.
    fn try_parse_typedef_expr(&mut self) -> Result<bool, ParseError> {
        match self.current.kind {
            TokenKind::OpenParen => {
                self.advance();
                self.tree.push_node(NodeKind::Or);
                self.parse_typedef_enum()?;
                self.tree.pop_node();
                Ok(true)
            }
            TokenKind::OpenBracket => {
                self.advance();
                self.tree.push_node(NodeKind::And);
                self.parse_typedef_list()?;
                self.tree.pop_node();
                Ok(true)
            }
            TokenKind::Real => {
                self.leaf_here(NodeKind::Real);
                self.advance();
                Ok(true)
            }
            TokenKind::Str => {
                self.leaf_here(NodeKind::Str);
                self.advance();
                Ok(true)
            }
            TokenKind::Int => {
                self.leaf_here(NodeKind::Int);
                self.advance();
                Ok(true)
            }
            TokenKind::Bool => {
                self.leaf_here(NodeKind::Bool);
                self.advance();
                Ok(true)
            }
            TokenKind::Cstr | TokenKind::Id => {
                self.leaf_here(NodeKind::Id);
                self.advance();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn parse_typedef_enum(&mut self) -> Result<(), ParseError> {
        if !self.try_parse_typedef_expr()? {
            return Err(self.unexpected("type enumeration"));
        }
        if self.current.kind == TokenKind::Or {
            self.advance();
            return self.parse_typedef_enum();
        }
        self.expect(TokenKind::CloseParen, "type enumeration")
    }

    fn parse_typedef_list(&mut self) -> Result<(), ParseError> {
        while self.try_parse_typedef_expr()? {}
        self.expect(TokenKind::CloseBracket, "type list")
    }

    /// `cardinality` token to the [`NodeKind`] it introduces.
    fn cardinality_kind(kind: TokenKind) -> Option<NodeKind> {
        match kind {
            TokenKind::One => Some(NodeKind::One),
            TokenKind::ZeroOne => Some(NodeKind::ZeroOne),
            TokenKind::ZeroMore => Some(NodeKind::ZeroMore),
            TokenKind::OneMore => Some(NodeKind::OneMore),
            _ => None,
        }
    }

    /// `element_def := cardinality element`. `Ok(false)` (no error) if
    /// the current token isn't a cardinality marker.
    fn try_parse_element_def(&mut self) -> Result<bool, ParseError> {
        let Some(node_kind) = Self::cardinality_kind(self.current.kind) else {
            return Ok(false);
        };
        self.advance();
        self.tree.push_node(node_kind);
        self.parse_element()?;
        self.tree.pop_node();
        Ok(true)
    }

    fn parse_element_def(&mut self) -> Result<(), ParseError> {
        if !self.try_parse_element_def()? {
            return Err(self.unexpected("element definition"));
        }
        Ok(())
    }

    /// `element := ID ('(' type ')')? ('[' attr_def* ']')? ('{' element_def* '}')?`.
    fn parse_element(&mut self) -> Result<(), ParseError> {
        self.expect_leaf(TokenKind::Id, NodeKind::Id, "element name")?;

        if self.current.kind == TokenKind::OpenParen {
            self.advance();
            self.parse_type()?;
            self.expect(TokenKind::CloseParen, "element type")?;
        }

        if self.current.kind == TokenKind::OpenBracket {
            self.advance();
            self.tree.push_node(NodeKind::Attrs);
            self.parse_attribute_list()?;
            self.tree.pop_node();
        }

        if self.current.kind == TokenKind::OpenBrace {
            self.advance();
            self.tree.push_node(NodeKind::Children);
            while self.try_parse_element_def()? {}
            self.tree.pop_node();
            self.expect(TokenKind::CloseBrace, "element children")?;
        }

        Ok(())
    }

    fn parse_attribute_list(&mut self) -> Result<(), ParseError> {
        while self.try_parse_attribute_def()? {}
        self.expect(TokenKind::CloseBracket, "attribute list")
    }

    /// `attr_def := (cardinality)? attribute` -- a bare `ID` defaults to
    /// `ONE` cardinality.
    fn try_parse_attribute_def(&mut self) -> Result<bool, ParseError> {
        if self.current.kind == TokenKind::Id {
            self.tree.push_node(NodeKind::One);
            self.parse_attribute()?;
            self.tree.pop_node();
            return Ok(true);
        }
        let Some(node_kind) = Self::cardinality_kind(self.current.kind) else {
            return Ok(false);
        };
        self.advance();
        self.tree.push_node(node_kind);
        self.parse_attribute()?;
        self.tree.pop_node();
        Ok(true)
    }

    fn parse_attribute(&mut self) -> Result<(), ParseError> {
        self.expect_leaf(TokenKind::Id, NodeKind::Id, "attribute name")?;
        self.expect(TokenKind::OpenParen, "attribute type")?;
        self.parse_type()?;
        self.expect(TokenKind::CloseParen, "attribute type")
    }

    /// `type := ID | base_type`.
    fn parse_type(&mut self) -> Result<(), ParseError> {
        match self.current.kind {
            TokenKind::Id => {
                self.leaf_here(NodeKind::Id);
                self.advance();
                Ok(())
            }
            TokenKind::Real => {
                self.leaf_here(NodeKind::Real);
                self.advance();
                Ok(())
            }
            TokenKind::Str => {
                self.leaf_here(NodeKind::Str);
                self.advance();
                Ok(())
            }
            TokenKind::Bool => {
                self.leaf_here(NodeKind::Bool);
                self.advance();
                Ok(())
            }
            TokenKind::Int => {
                self.leaf_here(NodeKind::Int);
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("type reference")),
        }
    }
}
