//! Two-pass bytecode generator.
//!
//! Pass one walks the root's top-level `Children` blocks -- each is a
//! schema's main validation entry point -- concatenating their code and
//! terminating with a jump past the end of the whole program. Pass two
//! emits one subroutine per `Typedef`, then back-patches every `CHKC`
//! call site whose data address names that typedef with the
//! subroutine's final entry address. This mirrors `ScvalAST::GenerateCode`
//! in the reference compiler instruction for instruction.

use scval_core::tree::{NodeKind, Tree};

use crate::bytecode::{Bytecode, Operation, ERR_ADDR};
use crate::error::CodegenError;
use crate::opcode::Opcode;

/// Built-in type tags for `CHKN`, in the order the VM's dispatch table
/// expects them.
const CHKN_REAL: u8 = 0;
const CHKN_STR: u8 = 1;
const CHKN_INT: u8 = 2;
const CHKN_BOOL: u8 = 3;

struct Builder {
    code: Vec<Operation>,
    consts: Vec<u32>,
    max_counter_reg: u8,
    max_string_reg: u8,
}

impl Builder {
    fn new() -> Self {
        Builder {
            code: Vec::new(),
            consts: Vec::new(),
            max_counter_reg: 0,
            max_string_reg: 0,
        }
    }

    fn pos(&self) -> usize {
        self.code.len()
    }

    fn emit(&mut self, op: Operation) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    fn patch_jump(&mut self, at: usize, addr: u32) {
        self.code[at].set_addr(addr);
    }

    /// Interns a constant hash, matching the original `ScvalSet::Set`
    /// dedup-by-value behavior: first occurrence wins the slot.
    fn intern(&mut self, hash: u32) -> u16 {
        if let Some(pos) = self.consts.iter().position(|&c| c == hash) {
            return pos as u16;
        }
        self.consts.push(hash);
        (self.consts.len() - 1) as u16
    }

    fn reg(n: usize) -> Result<u8, CodegenError> {
        u8::try_from(n).map_err(|_| CodegenError::RegisterOverflow { needed: n })
    }

    fn touch_counter(&mut self, rbc: u8) {
        self.max_counter_reg = self.max_counter_reg.max(rbc);
    }

    fn touch_string(&mut self, rbs: u8) {
        self.max_string_reg = self.max_string_reg.max(rbs);
    }
}

/// Lowers a parsed schema [`Tree`] into [`Bytecode`].
pub fn generate(tree: &Tree) -> Result<Bytecode, CodegenError> {
    if tree.is_empty() {
        return Err(CodegenError::EmptyTree);
    }
    let mut b = Builder::new();
    let root = tree.root();

    let mut last_main_jump: Option<usize> = None;
    for child in tree.children(root) {
        if tree.node(child).kind == NodeKind::Children {
            gen_children_elements(&mut b, tree, child, 0, 0)?;
            last_main_jump = Some(b.emit(Operation::jump_addr(Opcode::Jmp)));
        }
    }

    for typedef in tree.children(root) {
        if tree.node(typedef).kind != NodeKind::Typedef {
            continue;
        }
        let mut kids = tree.children(typedef);
        let name_node = kids.next().ok_or(CodegenError::MalformedTypedef)?;
        let name_leaf = tree.node(name_node).leaf.0;

        let entry = b.pos();
        for op in b.code.iter_mut() {
            if op.opcode == u8::from(Opcode::Chkc) && op.data_addr() == name_leaf {
                op.set_data_addr(entry as u16);
            }
        }

        if let Some(body) = kids.next() {
            match tree.node(body).kind {
                NodeKind::Callback => {
                    let cb_name = tree
                        .children(body)
                        .next()
                        .ok_or(CodegenError::MalformedTypedef)?;
                    let hash = tree.leaf(tree.node(cb_name).leaf).hash;
                    let data_addr = b.intern(hash);
                    let mut call = Operation::simple(Opcode::Call);
                    call.set_data_addr(data_addr);
                    b.emit(call);
                    let mut je = Operation::simple(Opcode::Je);
                    je.set_addr(ERR_ADDR);
                    b.emit(je);
                }
                NodeKind::Or | NodeKind::And => {
                    // Enumerations and lists are parsed but intentionally
                    // emit no bytecode; there is no opcode that checks a
                    // value against an enumerated or composite set.
                }
                NodeKind::Real | NodeKind::Str | NodeKind::Int | NodeKind::Bool
                | NodeKind::Id => {
                    // A bare type-literal body (`@book str`) also emits
                    // no bytecode: the subroutine is just the trailing
                    // RET, matching the original's AST_CALLBACK/AST_OR/
                    // AST_AND-only switch with no default arm.
                }
                _ => return Err(CodegenError::MalformedTypedef),
            }
        }

        b.emit(Operation::simple(Opcode::Ret));
    }

    if let Some(at) = last_main_jump {
        let end = b.pos() as u32;
        b.patch_jump(at, end);
    }

    Ok(Bytecode {
        max_counter_reg: b.max_counter_reg as u32,
        max_string_reg: b.max_string_reg as u32,
        code: b.code,
        consts: b.consts,
    })
}

/// One `{ element_def* }` block, or a schema's top-level entry point.
/// Loops reading sibling elements with `LDEN`/`CMPS` until the host
/// cursor reports `NIL_DATA` (no more elements), matching one of the
/// known element names each time, then checks the per-element
/// cardinality counters before falling through.
fn gen_children_elements(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbc: usize,
    rbs: usize,
) -> Result<(), CodegenError> {
    let rbs_reg = Builder::reg(rbs)?;
    let while_addr = b.pos();
    b.emit(Operation::with_reg(Opcode::Lden, rbs_reg));
    b.emit(Operation::new(Opcode::Cmps, rbs_reg, 0xFF, 0xFF));
    let je_at = b.emit(Operation::simple(Opcode::Je));

    let mut rc = rbc;
    let mut jmp_to_next: Vec<usize> = Vec::new();
    for child in tree.children(node) {
        match tree.node(child).kind {
            NodeKind::One | NodeKind::OneMore | NodeKind::ZeroMore | NodeKind::ZeroOne => {
                gen_child_element(b, tree, child, rc, rbs)?;
                rc += 1;
                jmp_to_next.push(b.pos() - 1);
            }
            _ => {}
        }
    }

    let mut jmp_err = Operation::simple(Opcode::Jmp);
    jmp_err.set_addr(ERR_ADDR);
    b.emit(jmp_err);
    let after = b.pos() as u32;
    for at in jmp_to_next {
        b.patch_jump(at, after);
    }
    b.emit(Operation::simple(Opcode::Next));
    let mut jmp_while = Operation::simple(Opcode::Jmp);
    jmp_while.set_addr(while_addr as u32);
    b.emit(jmp_while);

    gen_counters_comparison(b, tree, node, rbc)?;
    b.patch_jump(je_at, b.pos() as u32);

    b.touch_string(rbs_reg);
    Ok(())
}

/// Emits the `CMPI`/conditional-jump pair for each cardinality marker
/// among `node`'s children, validating how many times each counter
/// register was incremented against what its cardinality requires.
fn gen_counters_comparison(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbc: usize,
) -> Result<(), CodegenError> {
    let mut rc = rbc;
    for child in tree.children(node) {
        let kind = tree.node(child).kind;
        if !matches!(
            kind,
            NodeKind::One | NodeKind::OneMore | NodeKind::ZeroMore | NodeKind::ZeroOne
        ) {
            continue;
        }
        let rc_reg = Builder::reg(rc)?;
        match kind {
            NodeKind::One => {
                b.emit(Operation::new(Opcode::Cmpi, rc_reg, 1, 0));
                let mut jne = Operation::simple(Opcode::Jne);
                jne.set_addr(ERR_ADDR);
                b.emit(jne);
            }
            NodeKind::OneMore => {
                b.emit(Operation::new(Opcode::Cmpi, rc_reg, 0, 0));
                let mut je = Operation::simple(Opcode::Je);
                je.set_addr(ERR_ADDR);
                b.emit(je);
            }
            NodeKind::ZeroOne => {
                b.emit(Operation::new(Opcode::Cmpi, rc_reg, 1, 0));
                let mut jg = Operation::simple(Opcode::Jg);
                jg.set_addr(ERR_ADDR);
                b.emit(jg);
            }
            NodeKind::ZeroMore => {}
            _ => unreachable!(),
        }
        rc += 1;
    }
    b.touch_counter(Builder::reg(rc)?);
    Ok(())
}

/// `[ attr_def* ]`: the same read-compare-count loop as
/// [`gen_children_elements`], but over attributes (`LDAN`/`NATT`
/// instead of `LDEN`/`NEXT`).
fn gen_children_attributes(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbc: usize,
    rbs: usize,
) -> Result<(), CodegenError> {
    let rbs_reg = Builder::reg(rbs)?;
    b.emit(Operation::simple(Opcode::Gatt));
    let while_addr = b.pos();
    b.emit(Operation::with_reg(Opcode::Ldan, rbs_reg));
    b.emit(Operation::new(Opcode::Cmps, rbs_reg, 0xFF, 0xFF));
    let je_at = b.emit(Operation::simple(Opcode::Je));

    let mut rc = rbc;
    let mut jmp_to_next: Vec<usize> = Vec::new();
    for child in tree.children(node) {
        match tree.node(child).kind {
            NodeKind::One | NodeKind::OneMore | NodeKind::ZeroMore | NodeKind::ZeroOne => {
                gen_child_attribute(b, tree, child, rc, rbs)?;
                rc += 1;
                jmp_to_next.push(b.pos() - 1);
            }
            _ => {}
        }
    }

    let mut jmp_err = Operation::simple(Opcode::Jmp);
    jmp_err.set_addr(ERR_ADDR);
    b.emit(jmp_err);
    let after = b.pos() as u32;
    for at in jmp_to_next {
        b.patch_jump(at, after);
    }
    b.emit(Operation::simple(Opcode::Natt));
    let mut jmp_while = Operation::simple(Opcode::Jmp);
    jmp_while.set_addr(while_addr as u32);
    b.emit(jmp_while);

    gen_counters_comparison(b, tree, node, rbc)?;
    b.patch_jump(je_at, b.pos() as u32);
    b.touch_string(rbs_reg);
    Ok(())
}

/// One `attr_def`: compares the current attribute's name against the
/// expected hash, and on match loads its value and checks the
/// attribute's declared type.
fn gen_child_attribute(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbc: usize,
    rbs: usize,
) -> Result<(), CodegenError> {
    let rbs_reg = Builder::reg(rbs)?;
    let rbc_reg = Builder::reg(rbc)?;
    let mut kids = tree.children(node);
    let name_node = kids.next().ok_or(CodegenError::MalformedTypedef)?;
    let type_node = kids.next().ok_or(CodegenError::MalformedTypedef)?;

    let hash = tree.leaf(tree.node(name_node).leaf).hash;
    let data_addr = b.intern(hash);
    let mut cmps = Operation::new(Opcode::Cmps, rbs_reg, 0, 0);
    cmps.set_data_addr(data_addr);
    b.emit(cmps);
    let jne_at = b.emit(Operation::simple(Opcode::Jne));

    b.emit(Operation::with_reg(Opcode::Inc, rbc_reg));
    let rbs_next = Builder::reg(rbs + 1)?;
    b.emit(Operation::with_reg(Opcode::Ldav, rbs_next));
    gen_check_type(b, tree, type_node, rbs + 1)?;

    b.emit(Operation::simple(Opcode::Jmp));
    b.patch_jump(jne_at, b.pos() as u32);

    b.touch_counter(rbc_reg);
    Ok(())
}

/// Emits the appropriate check for a type reference: `CHKN` for the
/// four built-in scalar kinds, `CHKC` (subroutine call, back-patched
/// later) for a named type.
fn gen_check_type(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbs: usize,
) -> Result<(), CodegenError> {
    let rbs_reg = Builder::reg(rbs)?;
    match tree.node(node).kind {
        NodeKind::Real => {
            b.emit(Operation::new(Opcode::Chkn, rbs_reg, CHKN_REAL, 0));
        }
        NodeKind::Str => {
            b.emit(Operation::new(Opcode::Chkn, rbs_reg, CHKN_STR, 0));
        }
        NodeKind::Int => {
            b.emit(Operation::new(Opcode::Chkn, rbs_reg, CHKN_INT, 0));
        }
        NodeKind::Bool => {
            b.emit(Operation::new(Opcode::Chkn, rbs_reg, CHKN_BOOL, 0));
        }
        NodeKind::Id => {
            let leaf = tree.node(node).leaf.0;
            let mut chkc = Operation::new(Opcode::Chkc, rbs_reg, 0, 0);
            chkc.set_data_addr(leaf);
            b.emit(chkc);
        }
        _ => return Err(CodegenError::MalformedTypedef),
    }
    b.touch_string(rbs_reg);
    Ok(())
}

/// One `element_def`: compares the current element's name against the
/// expected hash, and on match walks its attributes, children, and/or
/// inline type check.
fn gen_child_element(
    b: &mut Builder,
    tree: &Tree,
    node: scval_core::id::NodeRef,
    rbc: usize,
    rbs: usize,
) -> Result<(), CodegenError> {
    let rbs_reg = Builder::reg(rbs)?;
    let rbc_reg = Builder::reg(rbc)?;
    let mut kids = tree.children(node);
    let name_node = kids.next().ok_or(CodegenError::MalformedTypedef)?;

    let hash = tree.leaf(tree.node(name_node).leaf).hash;
    let data_addr = b.intern(hash);
    let mut cmps = Operation::new(Opcode::Cmps, rbs_reg, 0, 0);
    cmps.set_data_addr(data_addr);
    b.emit(cmps);
    let jne_at = b.emit(Operation::simple(Opcode::Jne));

    b.emit(Operation::with_reg(Opcode::Inc, rbc_reg));

    for rest in kids {
        match tree.node(rest).kind {
            NodeKind::Attrs => {
                gen_children_attributes(b, tree, rest, rbc + 1, rbs + 1)?;
            }
            NodeKind::Children => {
                b.emit(Operation::simple(Opcode::Down));
                gen_children_elements(b, tree, rest, rbc + 1, rbs + 1)?;
                b.emit(Operation::simple(Opcode::Up));
            }
            _ => {
                let rbs_next = Builder::reg(rbs + 1)?;
                b.emit(Operation::with_reg(Opcode::Ldev, rbs_next));
                gen_check_type(b, tree, rest, rbs + 1)?;
            }
        }
    }

    b.emit(Operation::simple(Opcode::Jmp));
    b.patch_jump(jne_at, b.pos() as u32);

    b.touch_counter(rbc_reg);
    b.touch_string(rbs_reg);
    Ok(())
}
