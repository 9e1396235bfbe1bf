//! Optional execution trace recording for [`crate::vm::Context::run`].
//!
//! One entry per step, purely diagnostic, never consulted by the VM
//! itself to decide the accept/reject verdict.

use scval_codegen::Opcode;

/// One step of VM execution: the program counter it was fetched from
/// and the opcode dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub pc: u32,
    pub opcode: Opcode,
}
