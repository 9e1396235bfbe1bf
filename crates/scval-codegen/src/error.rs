//! Code generation and bytecode (de)serialization error types.

use thiserror::Error;

/// Errors produced while lowering a schema tree to bytecode, or while
/// loading a previously saved bytecode blob.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    /// A `typedef` body was neither a type expression nor a callback
    /// binding -- the tree reached codegen in a shape the parser should
    /// never produce.
    #[error("malformed typedef body")]
    MalformedTypedef,

    /// A `CHKC` inside a typedef body would need two levels of
    /// subroutine return-address nesting; the VM has exactly one
    /// `last_pc` slot (spec.md §9).
    #[error("named type check nested inside a typedef body is not supported")]
    NestedSubroutineCall,

    /// The schema tree had no content to compile.
    #[error("empty schema tree")]
    EmptyTree,

    /// A bytecode blob was too short to contain its declared header.
    #[error("truncated bytecode: expected at least {expected} bytes, got {got}")]
    TruncatedHeader { expected: usize, got: usize },

    /// A bytecode blob's header declared more operations/constants than
    /// the remaining bytes can hold.
    #[error("truncated bytecode body: expected {expected} bytes, got {got}")]
    TruncatedBody { expected: usize, got: usize },

    /// A schema nests deeply enough that a counter or string register
    /// bank would need to exceed the single-byte register index the
    /// bytecode format allots it.
    #[error("schema nesting needs register {needed}, but only 0..=255 are addressable")]
    RegisterOverflow { needed: usize },
}
