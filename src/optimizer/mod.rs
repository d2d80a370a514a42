//! Bytecode optimization passes.
//!
//! Two subsystems compose sequentially over one procedure's annotated
//! stream:
//!
//! 1. The **peephole rewriter** (`PeepholeOptimizer`) fuses short
//!    instruction windows into denser superinstructions, repeated to
//!    fixpoint; the catalog lives in `PATTERNS`.
//! 2. The **CFG builder** (`CfgBuilder`) splits the rewritten stream into
//!    basic blocks, resolves label aliases, routes throw and call edges
//!    through the try stack, forwards trivial jump chains, and prunes dead
//!    blocks and labels, iterated to fixpoint.
//!
//! # Example
//!
//! ```ignore
//! // Before:                         After:
//! // push_float 1        ->          push_n_floats #3 1 2 3
//! // push_float 2                    pop
//! // push_float 3
//! // pop
//! ```

mod cfg;
mod dump;
mod patterns;
mod peephole;
mod types;

#[cfg(test)]
mod tests;

// Re-export public types
pub use cfg::{convert, BasicBlock, CfgBuilder};
pub use dump::dump_cfg;
pub use patterns::{PeepholePattern, PATTERNS};
pub use peephole::{run_peephole, PeepholeOptimizer};
pub use types::{CfgStats, OptimizeOptions, PatternKind, PeepholeStats};

use crate::error::CfgResult;
use crate::item::AnnotatedItem;

/// Full optimization of one procedure: peephole rewriting followed by CFG
/// construction and cleanup.
///
/// Returns the cleaned block list (entry at index 0) together with the
/// statistics of both stages.
pub fn optimize(
    items: Vec<AnnotatedItem>,
    origin_name: &str,
    options: &OptimizeOptions,
) -> CfgResult<(Vec<BasicBlock>, PeepholeStats, CfgStats)> {
    let mut items = items;
    let mut rewriter = PeepholeOptimizer::new();
    if options.peephole {
        rewriter.run(&mut items);
    }
    let mut builder = CfgBuilder::new(origin_name).cleanup(options.cfg_cleanup);
    let blocks = builder.convert(items)?;
    Ok((blocks, rewriter.stats().clone(), builder.stats().clone()))
}
