//! The stack-machine VM: fetch-dispatch loop over a compiled
//! [`Bytecode`], driving a [`HostCursor`] and returning an
//! accept/reject verdict (`spec.md` §4.5).

use scval_codegen::{Bytecode, Opcode, ERR_ADDR, NIL_DATA};
use tracing::{trace, warn};

use crate::cursor::HostCursor;
use crate::error::VmError;
use crate::predicates;
use crate::trace::TraceEntry;

/// CHKN type tags, matching `scval_codegen::codegen`'s dispatch order.
const CHKN_REAL: u8 = 0;
const CHKN_STR: u8 = 1;
const CHKN_INT: u8 = 2;
const CHKN_BOOL: u8 = 3;

/// The VM's register banks and scratch state for one `run`. Fresh per
/// call (`spec.md` §5: "The VM context is created fresh per `Run`
/// call").
struct Context {
    counter: Vec<u16>,
    str_hash: Vec<u32>,
    str_vals: Vec<String>,
    cmp_res: i64,
    check_reg: u8,
    pc: u32,
    last_pc: u32,
}

impl Context {
    fn new(bytecode: &Bytecode) -> Self {
        Context {
            counter: vec![0u16; bytecode.counter_bank_size()],
            str_hash: vec![0u32; bytecode.string_bank_size()],
            str_vals: vec![String::new(); bytecode.string_bank_size()],
            cmp_res: 0,
            check_reg: 0,
            pc: 0,
            last_pc: 0,
        }
    }

    fn counter_reg(&self, r: u8) -> Result<usize, VmError> {
        let idx = r as usize;
        if idx >= self.counter.len() {
            return Err(VmError::CounterRegisterOutOfBounds {
                reg: r,
                bank_size: self.counter.len(),
            });
        }
        Ok(idx)
    }

    fn string_reg(&self, r: u8) -> Result<usize, VmError> {
        let idx = r as usize;
        if idx >= self.str_vals.len() {
            return Err(VmError::StringRegisterOutOfBounds {
                reg: r,
                bank_size: self.str_vals.len(),
            });
        }
        Ok(idx)
    }

    /// Stores a `LD*` result: `None` (cursor ran off the end) is the
    /// NIL sentinel, hashed as `0` rather than `hash("")`, so `CMPS`
    /// against `NIL_DATA` (which compares against the literal `0`) is
    /// the loop-exit signal spec.md §9 requires. A real empty-string
    /// name/value still hashes to `hash("")` and so is distinguishable
    /// from "no element here".
    fn load_string(&mut self, reg: usize, value: Option<String>) {
        match value {
            Some(s) => {
                self.str_hash[reg] = scval_core::hash::hash_str(&s);
                self.str_vals[reg] = s;
            }
            None => {
                self.str_hash[reg] = 0;
                self.str_vals[reg].clear();
            }
        }
    }
}

/// Outcome of one bytecode run against one document cursor.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `true` iff the document was accepted by the schema.
    pub accepted: bool,
    /// Per-step execution trace, present iff `trace_enabled` was passed
    /// to [`run`]. Pure observability; never affects `accepted`.
    pub trace: Option<Vec<TraceEntry>>,
}

/// Executes `bytecode` against `cursor`, returning the accept/reject
/// verdict (and, optionally, a step trace). A returned `Err` is a VM
/// *fault* -- an unknown opcode or an out-of-bank register -- distinct
/// from a validation reject, which comes back as `Ok(RunOutcome {
/// accepted: false, .. })`.
pub fn run(
    bytecode: &Bytecode,
    cursor: &mut dyn HostCursor,
    trace_enabled: bool,
) -> Result<RunOutcome, VmError> {
    let mut ctx = Context::new(bytecode);
    let mut trace_log = trace_enabled.then(Vec::new);

    loop {
        if ctx.pc as usize >= bytecode.code.len() {
            break;
        }
        let pc_here = ctx.pc;
        let op = bytecode.code[ctx.pc as usize];
        ctx.pc += 1;

        let opcode = Opcode::try_from(op.opcode).map_err(|_| VmError::UnknownOpcode {
            byte: op.opcode,
            pc: pc_here,
        })?;

        if let Some(log) = trace_log.as_mut() {
            log.push(TraceEntry {
                pc: pc_here,
                opcode,
            });
        }
        trace!(pc = pc_here, ?opcode, "dispatch");

        match opcode {
            Opcode::Lden => {
                let r = ctx.string_reg(op.op0)?;
                let v = cursor.element_name();
                ctx.load_string(r, v);
            }
            Opcode::Ldev => {
                let r = ctx.string_reg(op.op0)?;
                let v = cursor.element_value();
                ctx.load_string(r, v);
            }
            Opcode::Ldan => {
                let r = ctx.string_reg(op.op0)?;
                let v = cursor.attr_name();
                ctx.load_string(r, v);
            }
            Opcode::Ldav => {
                let r = ctx.string_reg(op.op0)?;
                let v = cursor.attr_value();
                ctx.load_string(r, v);
            }
            Opcode::Cmps => {
                let r = ctx.string_reg(op.op0)?;
                let data_addr = op.data_addr();
                let rhs: i64 = if data_addr == NIL_DATA {
                    0
                } else {
                    let idx = data_addr as usize;
                    if idx >= bytecode.consts.len() {
                        return Err(VmError::ConstantOutOfBounds {
                            index: data_addr,
                            len: bytecode.consts.len(),
                        });
                    }
                    bytecode.consts[idx] as i64
                };
                ctx.cmp_res = ctx.str_hash[r] as i64 - rhs;
            }
            Opcode::Cmpi => {
                let r = ctx.counter_reg(op.op0)?;
                let imm = op.op1 as i64;
                ctx.cmp_res = ctx.counter[r] as i64 - imm;
                ctx.counter[r] = 0;
            }
            Opcode::Je => {
                if ctx.cmp_res == 0 {
                    ctx.pc = op.addr();
                }
            }
            Opcode::Jne => {
                if ctx.cmp_res != 0 {
                    ctx.pc = op.addr();
                }
            }
            Opcode::Jg => {
                if ctx.cmp_res > 0 {
                    ctx.pc = op.addr();
                }
            }
            Opcode::Jmp => {
                ctx.pc = op.addr();
            }
            Opcode::Clr => {
                // reserved no-op, never emitted by the generator.
            }
            Opcode::Inc => {
                let r = ctx.counter_reg(op.op0)?;
                ctx.counter[r] = ctx.counter[r].wrapping_add(1);
            }
            Opcode::Chkn => {
                let r = ctx.string_reg(op.op0)?;
                let ok = match op.op1 {
                    CHKN_REAL => predicates::is_real(&ctx.str_vals[r]),
                    CHKN_STR => true,
                    CHKN_INT => predicates::is_integer(&ctx.str_vals[r]),
                    CHKN_BOOL => predicates::is_bool(ctx.str_hash[r]),
                    _ => false,
                };
                if !ok {
                    warn!(pc = pc_here, kind = op.op1, "CHKN predicate failed");
                    ctx.pc = ERR_ADDR;
                }
            }
            Opcode::Chkc => {
                ctx.check_reg = op.op0;
                ctx.last_pc = ctx.pc;
                ctx.pc = op.data_addr() as u32;
            }
            Opcode::Down => cursor.down(),
            Opcode::Up => cursor.up(),
            Opcode::Gatt => cursor.gatt(),
            Opcode::Natt => cursor.natt(),
            Opcode::Next => cursor.next(),
            Opcode::Ret => {
                ctx.pc = ctx.last_pc;
            }
            Opcode::Call => {
                let r = ctx.string_reg(ctx.check_reg)?;
                let data_addr = op.data_addr();
                let idx = data_addr as usize;
                if idx >= bytecode.consts.len() {
                    return Err(VmError::ConstantOutOfBounds {
                        index: data_addr,
                        len: bytecode.consts.len(),
                    });
                }
                let type_hash = bytecode.consts[idx];
                let accepted = cursor.call(type_hash, &ctx.str_vals[r]);
                ctx.cmp_res = if accepted { 1 } else { 0 };
            }
        }

        if ctx.pc == ERR_ADDR {
            break;
        }
    }

    let accepted = ctx.pc != ERR_ADDR;
    if !accepted {
        warn!(pc = ctx.pc, "run rejected");
    }
    Ok(RunOutcome {
        accepted,
        trace: trace_log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scval_core::parser::Parser;

    struct NullCursor;

    impl HostCursor for NullCursor {
        fn element_name(&mut self) -> Option<String> {
            None
        }
        fn element_value(&mut self) -> Option<String> {
            None
        }
        fn attr_name(&mut self) -> Option<String> {
            None
        }
        fn attr_value(&mut self) -> Option<String> {
            None
        }
        fn down(&mut self) {}
        fn up(&mut self) {}
        fn gatt(&mut self) {}
        fn natt(&mut self) {}
        fn next(&mut self) {}
        fn call(&mut self, _type_name_hash: u32, _value: &str) -> bool {
            true
        }
    }

    fn compile(src: &str) -> Bytecode {
        let tree = Parser::new(src).parse().expect("valid schema");
        scval_codegen::generate(&tree).expect("codegen should succeed")
    }

    #[test]
    fn zero_or_more_top_level_element_accepts_an_empty_document() {
        let bc = compile("*catalog");
        let mut cursor = NullCursor;
        let outcome = run(&bc, &mut cursor, false).expect("no vm fault");
        assert!(outcome.accepted);
    }

    #[test]
    fn required_top_level_element_rejects_an_empty_document() {
        let bc = compile("!catalog");
        let mut cursor = NullCursor;
        let outcome = run(&bc, &mut cursor, false).expect("no vm fault");
        assert!(!outcome.accepted);
    }

    #[test]
    fn trace_is_recorded_only_when_enabled() {
        let bc = compile("*catalog");
        let mut cursor = NullCursor;
        let without = run(&bc, &mut cursor, false).unwrap();
        assert!(without.trace.is_none());

        let mut cursor = NullCursor;
        let with = run(&bc, &mut cursor, true).unwrap();
        assert!(with.trace.is_some());
        assert!(!with.trace.unwrap().is_empty());
    }

    #[test]
    fn unknown_opcode_is_a_fault_not_a_reject() {
        let mut bc = compile("!catalog");
        bc.code[0].opcode = 255;
        let mut cursor = NullCursor;
        let err = run(&bc, &mut cursor, false).unwrap_err();
        assert!(matches!(err, VmError::UnknownOpcode { .. }));
    }

    #[test]
    fn register_out_of_bounds_is_a_fault() {
        let mut bc = compile("!catalog");
        bc.code[0].op0 = 200;
        let mut cursor = NullCursor;
        let err = run(&bc, &mut cursor, false).unwrap_err();
        assert!(matches!(err, VmError::StringRegisterOutOfBounds { .. }));
    }
}
