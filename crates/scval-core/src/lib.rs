//! Schema lexing, parsing, and tree construction for the Scval schema
//! description language.
//!
//! This crate owns everything that happens before a schema becomes
//! bytecode: tokenizing the source text ([`lexer`]), recursive-descent
//! parsing into an intermediate tree ([`parser`], [`tree`]), and the
//! string hash shared between compile time and run time ([`hash`]).

pub mod hash;
pub mod id;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use hash::hash_bytes;
pub use id::{LeafRef, NodeRef};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use tree::{Leaf, Node, NodeKind, Tree};
