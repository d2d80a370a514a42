//! opticode - Bytecode Optimization Core
//!
//! This library is the optimization stage of a compiler back-end that lowers
//! a dynamically-typed, object-oriented scripting language into a linear,
//! register-free stack bytecode. It sits between the emitter, which produces
//! an annotated instruction stream, and the packer, which encodes the final
//! bytes.
//!
//! # Architecture
//!
//! The pipeline has two stages over a per-procedure stream:
//!
//! 1. **Peephole rewriting** (`optimizer::PeepholeOptimizer`)
//!    - Scans instruction windows of descending width {5, 4, 3, 2}
//!    - Fuses matches from a registered catalog into superinstructions
//!    - Repeats until a whole iteration performs no rewrite
//!
//! 2. **CFG construction and cleanup** (`optimizer::CfgBuilder`)
//!    - Splits the stream into basic blocks at labels and after
//!      control-flow-splitting opcodes
//!    - Collapses adjacent labels into aliases and canonicalizes jump
//!      arguments
//!    - Routes throw and call edges through the active try region
//!    - Forwards jumps over trivial jump chains, prunes empty and
//!      unreachable blocks, and drops unreferenced labels, to fixpoint
//!
//! Both stages consult the static opcode metadata registry
//! (`opcodes::Opcode::metadata`) for block-splitting classification, stack
//! effects and argument schemas.
//!
//! # Example
//!
//! ```rust
//! use opticode::{optimize, AnnotatedItem, Opcode, Operand, OptimizeOptions};
//!
//! let stream = vec![
//!     AnnotatedItem::instr_args(Opcode::PushFloat, [Operand::Float(1.0)]),
//!     AnnotatedItem::instr_args(Opcode::PushFloat, [Operand::Float(2.0)]),
//!     AnnotatedItem::instr(Opcode::Return),
//! ];
//!
//! let (blocks, peephole, _cfg) =
//!     optimize(stream, "/proc/example", &OptimizeOptions::default()).unwrap();
//! assert_eq!(blocks[0].items[0].opcode(), Some(Opcode::PushNFloats));
//! assert_eq!(peephole.push_runs_fused, 1);
//! ```
//!
//! # Failure model
//!
//! Malformed input (duplicate labels, jumps to labels that do not exist,
//! misplaced block terminators) aborts the procedure with a
//! [`CfgError`](error::CfgError) naming the offender and the procedure;
//! the caller decides whether to fall back to the unoptimized stream.
//! Optimizer bugs (catalog argument-cast failures, control-flow coverage
//! gaps) panic with block and item context. There is no recoverable error
//! class: optimization is pure transformation.

pub mod error;
pub mod item;
pub mod opcodes;
pub mod optimizer;

pub use error::{CfgError, CfgResult};
pub use item::{
    AnnotatedItem, Instruction, Label, LocalVariable, Operand, Reference, SourceLocation,
};
pub use opcodes::{ArgKind, Opcode, OpcodeMetadata};
pub use optimizer::{
    convert, dump_cfg, optimize, run_peephole, BasicBlock, CfgBuilder, CfgStats, OptimizeOptions,
    PeepholeOptimizer, PeepholeStats,
};
