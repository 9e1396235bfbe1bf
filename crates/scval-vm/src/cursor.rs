//! The host cursor contract (`spec.md` §6): an abstract, stateful view
//! over a document tree that the VM drives opcode by opcode.
//!
//! The prose spec describes one stringly-dispatched `do(op, ...)`
//! operation; `HostCursor` expresses the same contract as one typed
//! method per opcode family, which is both the idiomatic shape for a
//! Rust trait object and lets implementors return `Option<String>`
//! instead of smuggling "no such element" through a sentinel string.

/// Stateful navigation over a document tree, driven exclusively by VM
/// opcodes (`spec.md` §4.3, §6). Implementors track a current element
/// position and a current attribute position within it.
pub trait HostCursor {
    /// `LDEN`: current element's name, or `None` if there is no current
    /// element (walked off the end of a sibling list).
    fn element_name(&mut self) -> Option<String>;

    /// `LDEV`: current element's text value, or `None`.
    fn element_value(&mut self) -> Option<String>;

    /// `LDAN`: current attribute's name, or `None` if there is no
    /// current attribute.
    fn attr_name(&mut self) -> Option<String>;

    /// `LDAV`: current attribute's value, or `None`.
    fn attr_value(&mut self) -> Option<String>;

    /// `DOWN`: push the current element onto the descent stack and
    /// move to its first child (or the null-element state if it has
    /// none).
    fn down(&mut self);

    /// `UP`: pop the descent stack, restoring the element saved by the
    /// matching `down`.
    fn up(&mut self);

    /// `GATT`: move to the current element's first attribute.
    fn gatt(&mut self);

    /// `NATT`: move to the next attribute (or the null-attribute state).
    fn natt(&mut self);

    /// `NEXT`: move to the next sibling element (or the null-element
    /// state).
    fn next(&mut self);

    /// `CALL`: invoke the user check named by `type_name_hash` with
    /// `value`. Returns `true` to accept, `false` to reject.
    fn call(&mut self, type_name_hash: u32, value: &str) -> bool;
}
