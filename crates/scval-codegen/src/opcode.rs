//! VM opcode set, as specified in `spec.md` §4.3.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// One VM instruction's operation code. Operand layout is opcode-specific
/// and documented on [`crate::bytecode::Operation`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Opcode {
    /// Load current element's name into a string register.
    Lden = 0,
    /// Load current element's text value into a string register.
    Ldev,
    /// Load current attribute's name into a string register.
    Ldan,
    /// Load current attribute's value into a string register.
    Ldav,
    /// Compare a string register's hash against a constant (or NIL_DATA).
    Cmps,
    /// Compare a counter register against an immediate, then clear it.
    Cmpi,
    /// Jump if `cmp_res == 0`.
    Je,
    /// Jump if `cmp_res != 0`.
    Jne,
    /// Jump if `cmp_res > 0`.
    Jg,
    /// Unconditional jump.
    Jmp,
    /// Reserved no-op.
    Clr,
    /// Increment a counter register.
    Inc,
    /// Check a string register against a built-in type predicate.
    Chkn,
    /// Call a user-type subroutine.
    Chkc,
    /// Descend to the current element's first child.
    Down,
    /// Ascend back to the saved element.
    Up,
    /// Move to the current element's first attribute.
    Gatt,
    /// Move to the next attribute.
    Natt,
    /// Move to the next sibling element.
    Next,
    /// Return from a type subroutine.
    Ret,
    /// Invoke a host callback.
    Call,
}
