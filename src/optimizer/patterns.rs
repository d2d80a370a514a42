//! The peephole rewrite catalog.
//!
//! Each entry matches a window of instructions by opcode sequence, optionally
//! guards it with a precondition, and splices a denser superinstruction in
//! place. The registry is a static ordered slice: within one window width,
//! earlier entries win. Every rewrite preserves the summed stack effect of
//! the window it replaces.
//!
//! The `×N` push families extend greedily past their nominal window and
//! consume every contiguous instruction with the same opcode, so a run of N
//! identical pushes always fuses into a single `PushN*` with count N.

use smallvec::{smallvec, SmallVec};

use crate::item::{AnnotatedItem, Instruction, Operand};
use crate::opcodes::{ArgKind, Opcode};

use super::types::PatternKind;

/// One entry of the rewrite catalog
pub struct PeepholePattern {
    /// Opcode sequence to match; its length is the window width
    pub opcodes: &'static [Opcode],
    /// Extra precondition checked after the opcodes match
    pub check: Option<fn(&[AnnotatedItem], usize) -> bool>,
    /// In-place rewrite at the window start
    pub apply: fn(&mut Vec<AnnotatedItem>, usize),
    /// Statistics category this pattern reports under
    pub kind: PatternKind,
}

impl PeepholePattern {
    /// Window width of this pattern
    #[inline]
    pub fn length(&self) -> usize {
        self.opcodes.len()
    }
}

/// The registered rewrite catalog, in registration order.
///
/// Registration order is the tie-break within a window width; fusion inputs
/// (the plain push runs) are registered before the fusions that consume
/// their outputs, and the outer fixpoint picks up the chained opportunities.
pub static PATTERNS: &[PeepholePattern] = &[
    PeepholePattern {
        opcodes: &[Opcode::Assign, Opcode::Pop],
        check: None,
        apply: fuse_assign_pop,
        kind: PatternKind::AssignFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushNull, Opcode::AssignPop],
        check: None,
        apply: fuse_null_write,
        kind: PatternKind::NullWriteFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushReferenceValue, Opcode::DereferenceField],
        check: None,
        apply: fuse_field_read,
        kind: PatternKind::FieldReadFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::BooleanNot, Opcode::JumpIfFalse],
        check: None,
        apply: invert_branch,
        kind: PatternKind::BranchInversion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushReferenceValue, Opcode::JumpIfFalse],
        check: None,
        apply: fuse_reference_branch,
        kind: PatternKind::ReferenceBranchFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushString, Opcode::PushString],
        check: None,
        apply: fuse_string_run,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushFloat, Opcode::PushFloat],
        check: None,
        apply: fuse_float_run,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushReferenceValue, Opcode::PushReferenceValue],
        check: None,
        apply: fuse_ref_run,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushResource, Opcode::PushResource],
        check: None,
        apply: fuse_resource_run,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushString, Opcode::PushFloat],
        check: None,
        apply: fuse_string_float,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushStringFloat, Opcode::PushStringFloat],
        check: None,
        apply: fuse_string_float_run,
        kind: PatternKind::PushRunFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushFloat, Opcode::SwitchCase],
        check: None,
        apply: fuse_switch_on_float,
        kind: PatternKind::SwitchFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushString, Opcode::SwitchCase],
        check: None,
        apply: fuse_switch_on_string,
        kind: PatternKind::SwitchFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushNFloats, Opcode::CreateList],
        check: Some(counts_match),
        apply: fuse_list_floats,
        kind: PatternKind::ListFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushNStrings, Opcode::CreateList],
        check: Some(counts_match),
        apply: fuse_list_strings,
        kind: PatternKind::ListFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushNResources, Opcode::CreateList],
        check: Some(counts_match),
        apply: fuse_list_resources,
        kind: PatternKind::ListFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushNRefs, Opcode::CreateList],
        check: Some(counts_match),
        apply: fuse_list_refs,
        kind: PatternKind::ListFusion,
    },
    PeepholePattern {
        opcodes: &[Opcode::Jump, Opcode::Jump],
        check: None,
        apply: drop_dead_jump,
        kind: PatternKind::DeadJump,
    },
    PeepholePattern {
        opcodes: &[Opcode::PushType, Opcode::IsType],
        check: None,
        apply: fuse_type_check,
        kind: PatternKind::TypeCheckFusion,
    },
];

/// Read one operand out of an instruction in the window, checking its kind.
///
/// A kind mismatch is a bug in the rewrite catalog or in the emitter's
/// argument schemas, so it panics rather than failing the rewrite.
fn arg(stream: &[AnnotatedItem], i: usize, idx: usize, kind: ArgKind) -> Operand {
    let instr = stream[i]
        .as_instruction()
        .unwrap_or_else(|| panic!("peephole window item {i} is not an instruction"));
    let operand = instr
        .args
        .get(idx)
        .unwrap_or_else(|| panic!("{}: missing argument {idx}", instr.opcode));
    if operand.kind() != kind {
        panic!(
            "{}: argument {idx} is {operand:?}, expected {kind:?}",
            instr.opcode
        );
    }
    operand.clone()
}

/// Replace `len` items at `i` with a single fused instruction
fn splice(stream: &mut Vec<AnnotatedItem>, i: usize, len: usize, fused: Instruction) {
    stream[i] = AnnotatedItem::Instruction(fused);
    stream.drain(i + 1..i + len);
}

fn fuse_assign_pop(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let reference = arg(stream, i, 0, ArgKind::Reference);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::AssignPop, [reference]),
    );
}

fn fuse_null_write(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let reference = arg(stream, i + 1, 0, ArgKind::Reference);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::NullRef, [reference]),
    );
}

fn fuse_field_read(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let reference = arg(stream, i, 0, ArgKind::Reference);
    let field = arg(stream, i + 1, 0, ArgKind::String);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::PushRefAndDereferenceField, [reference, field]),
    );
}

fn invert_branch(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let label = arg(stream, i + 1, 0, ArgKind::Label);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::JumpIfTrue, [label]),
    );
}

fn fuse_reference_branch(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let reference = arg(stream, i, 0, ArgKind::Reference);
    let label = arg(stream, i + 1, 0, ArgKind::Label);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::JumpIfReferenceFalse, [reference, label]),
    );
}

/// Greedily fuse a contiguous run of single-operand pushes into one `PushN*`
fn fuse_run(
    stream: &mut Vec<AnnotatedItem>,
    i: usize,
    element: Opcode,
    element_kind: ArgKind,
    fused: Opcode,
) {
    let mut elements = vec![
        arg(stream, i, 0, element_kind),
        arg(stream, i + 1, 0, element_kind),
    ];
    let mut end = i + 2;
    while end < stream.len() && stream[end].opcode() == Some(element) {
        elements.push(arg(stream, end, 0, element_kind));
        end += 1;
    }
    let mut args: SmallVec<[Operand; 4]> = smallvec![Operand::ListSize(elements.len() as u32)];
    args.extend(elements);
    splice(stream, i, end - i, Instruction::with_args(fused, args));
}

fn fuse_string_run(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_run(
        stream,
        i,
        Opcode::PushString,
        ArgKind::String,
        Opcode::PushNStrings,
    );
}

fn fuse_float_run(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_run(
        stream,
        i,
        Opcode::PushFloat,
        ArgKind::Float,
        Opcode::PushNFloats,
    );
}

fn fuse_ref_run(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_run(
        stream,
        i,
        Opcode::PushReferenceValue,
        ArgKind::Reference,
        Opcode::PushNRefs,
    );
}

fn fuse_resource_run(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_run(
        stream,
        i,
        Opcode::PushResource,
        ArgKind::Resource,
        Opcode::PushNResources,
    );
}

fn fuse_string_float(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let string = arg(stream, i, 0, ArgKind::String);
    let float = arg(stream, i + 1, 0, ArgKind::Float);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::PushStringFloat, [string, float]),
    );
}

/// Greedily fuse a run of `PushStringFloat` pairs; the count operand is the
/// number of pairs, not the number of pushed values
fn fuse_string_float_run(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let mut pairs = vec![
        (
            arg(stream, i, 0, ArgKind::String),
            arg(stream, i, 1, ArgKind::Float),
        ),
        (
            arg(stream, i + 1, 0, ArgKind::String),
            arg(stream, i + 1, 1, ArgKind::Float),
        ),
    ];
    let mut end = i + 2;
    while end < stream.len() && stream[end].opcode() == Some(Opcode::PushStringFloat) {
        pairs.push((
            arg(stream, end, 0, ArgKind::String),
            arg(stream, end, 1, ArgKind::Float),
        ));
        end += 1;
    }
    let mut args: SmallVec<[Operand; 4]> = smallvec![Operand::ListSize(pairs.len() as u32)];
    for (string, float) in pairs {
        args.push(string);
        args.push(float);
    }
    splice(
        stream,
        i,
        end - i,
        Instruction::with_args(Opcode::PushNOfStringFloats, args),
    );
}

fn fuse_switch_on_float(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let float = arg(stream, i, 0, ArgKind::Float);
    let label = arg(stream, i + 1, 0, ArgKind::Label);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::SwitchOnFloat, [float, label]),
    );
}

fn fuse_switch_on_string(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let string = arg(stream, i, 0, ArgKind::String);
    let label = arg(stream, i + 1, 0, ArgKind::Label);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::SwitchOnString, [string, label]),
    );
}

/// The push run and the list constructor must agree on the element count
fn counts_match(stream: &[AnnotatedItem], i: usize) -> bool {
    let run = match arg(stream, i, 0, ArgKind::ListSize) {
        Operand::ListSize(n) => n,
        _ => unreachable!(),
    };
    let list = match arg(stream, i + 1, 0, ArgKind::ListSize) {
        Operand::ListSize(n) => n,
        _ => unreachable!(),
    };
    run == list
}

/// Fold a `PushN*` run directly into a list constructor, keeping the run's
/// count and elements as the new instruction's arguments
fn fuse_list(stream: &mut Vec<AnnotatedItem>, i: usize, fused: Opcode) {
    let args = stream[i]
        .as_instruction()
        .expect("peephole window item is not an instruction")
        .args
        .clone();
    splice(stream, i, 2, Instruction::with_args(fused, args));
}

fn fuse_list_floats(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_list(stream, i, Opcode::CreateListNFloats);
}

fn fuse_list_strings(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_list(stream, i, Opcode::CreateListNStrings);
}

fn fuse_list_resources(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_list(stream, i, Opcode::CreateListNResources);
}

fn fuse_list_refs(stream: &mut Vec<AnnotatedItem>, i: usize) {
    fuse_list(stream, i, Opcode::CreateListNRefs);
}

/// The second of two consecutive unconditional jumps can never execute
fn drop_dead_jump(stream: &mut Vec<AnnotatedItem>, i: usize) {
    stream.remove(i + 1);
}

fn fuse_type_check(stream: &mut Vec<AnnotatedItem>, i: usize) {
    let type_id = arg(stream, i, 0, ArgKind::TypeId);
    splice(
        stream,
        i,
        2,
        Instruction::with_args(Opcode::IsTypeDirect, [type_id]),
    );
}
