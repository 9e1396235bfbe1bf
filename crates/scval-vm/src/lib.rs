//! The stack-machine VM that executes compiled Scval bytecode against a
//! host-supplied document cursor, producing an accept/reject verdict.
//!
//! This crate has no dependency beyond [`scval_core`] and
//! [`scval_codegen`]; a document reader is supplied by the caller
//! through the [`cursor::HostCursor`] trait (`spec.md` §1 calls the
//! reader itself an external collaborator, out of scope for the core).

pub mod cursor;
pub mod error;
pub mod predicates;
pub mod trace;
pub mod vm;

pub use cursor::HostCursor;
pub use error::VmError;
pub use trace::TraceEntry;
pub use vm::{run, RunOutcome};
