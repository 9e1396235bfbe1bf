//! Lowers a parsed [`scval_core::tree::Tree`] into register-machine
//! bytecode, and (de)serializes that bytecode to/from its binary form.

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod opcode;

pub use bytecode::{Bytecode, Operation, ERR_ADDR, NIL_DATA};
pub use codegen::generate;
pub use error::CodegenError;
pub use opcode::Opcode;
