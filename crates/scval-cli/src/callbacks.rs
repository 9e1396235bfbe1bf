//! Demo user-type callbacks, reused from the original's inline
//! `author`/`date`/`price` example checks (`spec.md` §1, §10): each
//! accepts any non-empty value. These are fixtures for the CLI's
//! `demos/catalog` sample, not library code -- a real host registers
//! its own checks against [`crate::xml_cursor::XmlTreeCursor`].

use scval_core::hash::hash_str;

use crate::xml_cursor::XmlTreeCursor;

/// Registers the three example callbacks the catalog demo schema
/// references: `#AUTHOR`, `#DATE`, `#PRICE`.
pub fn register_demo_callbacks(cursor: &mut XmlTreeCursor) {
    cursor.register_callback(hash_str("AUTHOR"), |v| !v.is_empty());
    cursor.register_callback(hash_str("DATE"), |v| !v.is_empty());
    cursor.register_callback(hash_str("PRICE"), |v| !v.is_empty());
}
