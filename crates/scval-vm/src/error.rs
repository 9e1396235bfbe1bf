//! VM fault types.
//!
//! `spec.md` §7 draws a line between a *reject* verdict (the run
//! completed, `pc` ended at `ERR_ADDR`) and a *fault* (an unknown
//! opcode, or a register operand outside the bank sizes the bytecode
//! header declares) -- a fault aborts the run immediately rather than
//! running it to completion. Both are represented here so `Context::run`
//! never panics on malformed or hand-assembled bytecode.

use thiserror::Error;

/// A fatal condition encountered while executing bytecode. Distinct
/// from a validation *reject*: a fault means the bytecode itself (or
/// the register banks it specifies) could not be trusted, not that the
/// document failed to validate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("unknown opcode byte {byte} at pc {pc}")]
    UnknownOpcode { byte: u8, pc: u32 },

    #[error("counter register {reg} exceeds bank size {bank_size}")]
    CounterRegisterOutOfBounds { reg: u8, bank_size: usize },

    #[error("string register {reg} exceeds bank size {bank_size}")]
    StringRegisterOutOfBounds { reg: u8, bank_size: usize },

    #[error("constant index {index} exceeds constant segment size {len}")]
    ConstantOutOfBounds { index: u16, len: usize },
}
