//! Peephole rewriter for annotated bytecode streams.
//!
//! Scans the linear stream with windows of descending width {5, 4, 3, 2}.
//! A window matches when every item in it is an instruction (labels and
//! local-variable declarations block matching), the opcode sequence equals a
//! registered pattern's sequence, and the pattern's precondition holds. The
//! first matching pattern in registration order fires and the scan moves to
//! the next index; the outer loop repeats until a whole iteration performs
//! zero rewrites, so fusions that feed other fusions converge.

use tracing::{debug, trace};

use crate::item::AnnotatedItem;

use super::patterns::PATTERNS;
use super::types::{PatternKind, PeepholeStats};

/// Peephole rewriter over an annotated item stream
pub struct PeepholeOptimizer {
    /// Statistics about rewrites performed
    stats: PeepholeStats,
}

impl Default for PeepholeOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PeepholeOptimizer {
    /// Create a new peephole rewriter
    pub fn new() -> Self {
        Self {
            stats: PeepholeStats::new(),
        }
    }

    /// Get rewrite statistics
    pub fn stats(&self) -> &PeepholeStats {
        &self.stats
    }

    /// Rewrite the stream in place until no registered pattern applies
    pub fn run(&mut self, stream: &mut Vec<AnnotatedItem>) {
        loop {
            self.stats.iterations += 1;
            if self.run_iteration(stream) == 0 {
                break;
            }
        }
        debug!(
            rewrites = self.stats.total_rewrites(),
            iterations = self.stats.iterations,
            "peephole stable"
        );
    }

    /// One outer iteration: four scans with window widths 5, 4, 3, 2.
    ///
    /// Returns the number of rewrites performed.
    fn run_iteration(&mut self, stream: &mut Vec<AnnotatedItem>) -> usize {
        let mut rewrites = 0;
        for width in [5usize, 4, 3, 2] {
            let mut i = 0;
            while i + width <= stream.len() {
                if let Some(kind) = self.try_rewrite(stream, i, width) {
                    self.stats.record(kind);
                    rewrites += 1;
                }
                i += 1;
            }
        }
        rewrites
    }

    /// Try every registered pattern of the given width at position `i`
    fn try_rewrite(
        &mut self,
        stream: &mut Vec<AnnotatedItem>,
        i: usize,
        width: usize,
    ) -> Option<PatternKind> {
        if !stream[i..i + width].iter().all(AnnotatedItem::is_instruction) {
            return None;
        }
        'patterns: for pattern in PATTERNS.iter().filter(|p| p.length() == width) {
            for (offset, opcode) in pattern.opcodes.iter().enumerate() {
                if stream[i + offset].opcode() != Some(*opcode) {
                    continue 'patterns;
                }
            }
            if let Some(check) = pattern.check {
                if !check(stream, i) {
                    continue;
                }
            }
            // The fused instruction inherits its location from the first
            // location-bearing item of the matched window.
            let location = stream[i..i + width].iter().find_map(AnnotatedItem::location);
            trace!(kind = ?pattern.kind, index = i, "peephole rewrite");
            (pattern.apply)(stream, i);
            stream[i].set_location(location);
            return Some(pattern.kind);
        }
        None
    }
}

/// Rewrite a stream to fixpoint and return the statistics
///
/// Convenience function for one-shot use.
pub fn run_peephole(stream: &mut Vec<AnnotatedItem>) -> PeepholeStats {
    let mut optimizer = PeepholeOptimizer::new();
    optimizer.run(stream);
    optimizer.stats
}
