//! Control-flow-graph construction and cleanup.
//!
//! Converts a linear annotated stream into a basic-block graph and cleans it
//! to fixpoint:
//!
//! 1. **Split**: a fresh block starts after every control-flow-splitting
//!    instruction and at every label; adjacent labels collapse into aliases
//!    of the first.
//! 2. **Cleanup fixpoint**: remove empty blocks, rebuild fallthrough and
//!    jump edges (routing throws and calls to the active catch target),
//!    canonicalize aliased jump arguments, forward jumps whose target is
//!    itself a trivial unconditional jump, prune unreachable blocks, and
//!    drop labels nothing references. When label removal changes block
//!    structure the stream is flattened and re-split.
//!
//! Blocks live in an arena and name each other by index; ids are debug-only
//! and allocated from a per-conversion counter.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{CfgError, CfgResult};
use crate::item::{AnnotatedItem, Instruction, Operand};
use crate::opcodes::Opcode;

use super::types::CfgStats;

/// A basic block: a straight-line run of items plus its edges.
///
/// Edges are indices into the block list returned by [`CfgBuilder::convert`],
/// kept symmetric: `a` lists `b` as a successor exactly when `b` lists `a`
/// as a predecessor.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Stable id for debug output
    pub id: u32,
    pub items: Vec<AnnotatedItem>,
    pub predecessors: SmallVec<[usize; 2]>,
    pub successors: SmallVec<[usize; 2]>,
}

impl BasicBlock {
    fn new(id: u32) -> Self {
        Self {
            id,
            items: Vec::new(),
            predecessors: SmallVec::new(),
            successors: SmallVec::new(),
        }
    }

    /// Check if the block holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The first instruction past any leading labels.
    ///
    /// Returns `None` when the block is empty or a local-variable
    /// declaration sits before the first instruction.
    pub fn first_real_instruction(&self) -> Option<&Instruction> {
        self.items
            .iter()
            .find(|item| !matches!(item, AnnotatedItem::Label(_)))
            .and_then(AnnotatedItem::as_instruction)
    }
}

/// Which argument of a jump carries its target label
fn jump_label_arg(opcode: Opcode) -> Option<usize> {
    match opcode {
        Opcode::Jump
        | Opcode::JumpIfFalse
        | Opcode::JumpIfTrue
        | Opcode::JumpIfNull
        | Opcode::JumpIfNullNoPop
        | Opcode::BooleanAnd
        | Opcode::BooleanOr
        | Opcode::SwitchCase
        | Opcode::SwitchCaseRange
        | Opcode::EnumerateNoAssign
        | Opcode::Spawn => Some(0),
        Opcode::Enumerate
        | Opcode::JumpIfReferenceFalse
        | Opcode::JumpIfReferenceTrue
        | Opcode::SwitchOnFloat
        | Opcode::SwitchOnString => Some(1),
        _ => None,
    }
}

enum FixpointOutcome {
    /// An iteration completed without changes; the graph is final
    Stable,
    /// Label removal changed block structure; re-split the flattened stream
    Rebuild,
}

/// Converts one procedure's annotated stream into a cleaned basic-block graph
pub struct CfgBuilder {
    origin: String,
    run_cleanup: bool,
    blocks: Vec<BasicBlock>,
    /// Canonical label name → index of the block it opens
    labels: HashMap<String, usize>,
    /// Canonical label name → number of jump arguments currently naming it
    label_references: HashMap<String, usize>,
    /// Collapsed label name → canonical label name
    aliases: HashMap<String, String>,
    next_id: u32,
    stats: CfgStats,
}

impl CfgBuilder {
    /// Create a builder for the named procedure
    pub fn new(origin_name: impl Into<String>) -> Self {
        Self {
            origin: origin_name.into(),
            run_cleanup: true,
            blocks: Vec::new(),
            labels: HashMap::new(),
            label_references: HashMap::new(),
            aliases: HashMap::new(),
            next_id: 0,
            stats: CfgStats::new(),
        }
    }

    /// Enable or disable the cleanup fixpoint (default: enabled).
    ///
    /// With cleanup disabled the conversion stops after the naive
    /// split-connect-resolve pass, which is occasionally useful when
    /// debugging the emitter.
    pub fn cleanup(mut self, enabled: bool) -> Self {
        self.run_cleanup = enabled;
        self
    }

    /// Get conversion statistics
    pub fn stats(&self) -> &CfgStats {
        &self.stats
    }

    /// Convert a stream into a block list; index 0 is the entry block.
    ///
    /// Every jump argument in the output names a canonical label resolving
    /// to exactly one block in the list.
    pub fn convert(&mut self, items: Vec<AnnotatedItem>) -> CfgResult<Vec<BasicBlock>> {
        let mut items = items;
        loop {
            self.split(std::mem::take(&mut items))?;
            if !self.run_cleanup {
                self.connect_linear();
                self.resolve_jumps()?;
                self.renumber();
                break;
            }
            match self.cleanup_fixpoint()? {
                FixpointOutcome::Stable => break,
                FixpointOutcome::Rebuild => items = self.flatten(),
            }
        }
        debug!(
            origin = %self.origin,
            blocks = self.blocks.len(),
            iterations = self.stats.iterations,
            "cfg conversion complete"
        );
        Ok(std::mem::take(&mut self.blocks))
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // === Phase A: split ===

    /// Split the stream into blocks at labels and after splitting opcodes.
    ///
    /// Adjacent labels do not open their own block; the later names become
    /// aliases of the first and their items are discarded.
    fn split(&mut self, items: Vec<AnnotatedItem>) -> CfgResult<()> {
        let capacity_hint = self.blocks.len().max(8);
        self.blocks = Vec::with_capacity(capacity_hint);
        self.aliases.clear();

        let mut seen: HashSet<String> = HashSet::new();
        let mut previous_label: Option<String> = None;
        let mut current = BasicBlock::new(self.alloc_id());

        for item in items {
            match item {
                AnnotatedItem::Label(label) => {
                    if !seen.insert(label.name.clone()) {
                        return Err(CfgError::DuplicateLabel {
                            label: label.name,
                            origin: self.origin.clone(),
                        });
                    }
                    if let Some(canonical) = &previous_label {
                        trace!(alias = %label.name, canonical = %canonical, "collapsed adjacent label");
                        self.aliases.insert(label.name, canonical.clone());
                        self.stats.aliases_collapsed += 1;
                        continue;
                    }
                    previous_label = Some(label.name.clone());
                    let id = self.alloc_id();
                    self.blocks
                        .push(std::mem::replace(&mut current, BasicBlock::new(id)));
                    current.items.push(AnnotatedItem::Label(label));
                }
                AnnotatedItem::Instruction(instr) => {
                    previous_label = None;
                    let splits = instr.opcode.splits_basic_block();
                    current.items.push(AnnotatedItem::Instruction(instr));
                    if splits {
                        let id = self.alloc_id();
                        self.blocks
                            .push(std::mem::replace(&mut current, BasicBlock::new(id)));
                    }
                }
                AnnotatedItem::LocalVariable(_) => {
                    previous_label = None;
                    current.items.push(item);
                }
            }
        }
        self.blocks.push(current);
        self.reindex_labels();
        Ok(())
    }

    // === Phase B: cleanup fixpoint ===

    fn cleanup_fixpoint(&mut self) -> CfgResult<FixpointOutcome> {
        loop {
            self.stats.iterations += 1;
            let mut changed = false;

            changed |= self.remove_empty_blocks();
            self.clear_edges();
            self.connect_linear();
            changed |= self.resolve_jumps()?;
            self.renumber();
            changed |= self.forward_jumps()?;
            changed |= self.remove_unreachable();
            self.renumber();
            let labels_removed = self.remove_unreferenced_labels();
            changed |= labels_removed;

            trace!(iteration = self.stats.iterations, changed, "cfg cleanup pass");
            if !changed {
                return Ok(FixpointOutcome::Stable);
            }
            let displaced = self.reindex_labels();
            if labels_removed || displaced {
                return Ok(FixpointOutcome::Rebuild);
            }
        }
    }

    /// Remove empty blocks (the entry is exempt), retargeting any label that
    /// pointed at a removed block to the next surviving block in layout order
    fn remove_empty_blocks(&mut self) -> bool {
        let mut keep: Vec<bool> = self.blocks.iter().map(|b| !b.is_empty()).collect();
        keep[0] = true;
        let removed = keep.iter().filter(|&&k| !k).count();
        if removed == 0 {
            return false;
        }
        self.stats.empty_blocks_removed += removed;
        self.retain_blocks(&keep, true);
        true
    }

    fn clear_edges(&mut self) {
        for block in &mut self.blocks {
            block.predecessors.clear();
            block.successors.clear();
        }
    }

    /// Add the naive fallthrough edge between each pair of adjacent blocks
    fn connect_linear(&mut self) {
        for i in 0..self.blocks.len().saturating_sub(1) {
            self.add_edge(i, i + 1);
        }
    }

    /// Resolve every jump to its target block, refining the naive edges.
    ///
    /// Walks blocks in layout order, maintaining the try stack, counting
    /// label references, and rewriting aliased jump arguments to their
    /// canonical names. Returns whether any argument was rewritten.
    fn resolve_jumps(&mut self) -> CfgResult<bool> {
        let mut changed = false;
        let mut try_stack: Vec<usize> = Vec::new();
        for bi in 0..self.blocks.len() {
            // A block ending in an unconditional jump, return or throw
            // cannot fall through. Drop the naive fallthrough edge before
            // walking the block so a speculative catch edge to the same
            // neighbor is not lost with it.
            if bi + 1 < self.blocks.len() {
                let terminator = self.blocks[bi].items.last().and_then(AnnotatedItem::opcode);
                if matches!(
                    terminator,
                    Some(Opcode::Jump) | Some(Opcode::Return) | Some(Opcode::Throw)
                ) {
                    self.remove_edge(bi, bi + 1);
                }
            }
            for ii in 0..self.blocks[bi].items.len() {
                let Some(opcode) = self.blocks[bi].items[ii].opcode() else {
                    continue;
                };
                match opcode {
                    // Conditional jumps with the label in argument 0: the
                    // fallthrough edge stays alongside the target edge.
                    Opcode::JumpIfFalse
                    | Opcode::JumpIfTrue
                    | Opcode::JumpIfNull
                    | Opcode::JumpIfNullNoPop
                    | Opcode::BooleanAnd
                    | Opcode::BooleanOr
                    | Opcode::SwitchCase
                    | Opcode::SwitchCaseRange
                    | Opcode::EnumerateNoAssign
                    | Opcode::Spawn => {
                        self.require_last(bi, ii, opcode)?;
                        let target = self.resolve_label_arg(bi, ii, 0, &mut changed)?;
                        self.add_edge(bi, target);
                    }
                    // Conditional jumps with the label in argument 1
                    Opcode::Enumerate
                    | Opcode::JumpIfReferenceFalse
                    | Opcode::JumpIfReferenceTrue
                    | Opcode::SwitchOnFloat
                    | Opcode::SwitchOnString => {
                        self.require_last(bi, ii, opcode)?;
                        let target = self.resolve_label_arg(bi, ii, 1, &mut changed)?;
                        self.add_edge(bi, target);
                    }
                    // An unconditional jump cannot fall through; its naive
                    // fallthrough edge was already dropped above.
                    Opcode::Jump => {
                        self.require_last(bi, ii, opcode)?;
                        let target = self.resolve_label_arg(bi, ii, 0, &mut changed)?;
                        self.add_edge(bi, target);
                    }
                    Opcode::Return => {
                        self.require_last(bi, ii, opcode)?;
                    }
                    Opcode::Throw => {
                        self.require_last(bi, ii, opcode)?;
                        if let Some(&catch) = try_stack.last() {
                            self.add_edge(bi, catch);
                        }
                    }
                    // Without interprocedural analysis any call may throw
                    // into the active catch target; the fallthrough stays.
                    Opcode::Call | Opcode::CallStatement | Opcode::DereferenceCall => {
                        if let Some(&catch) = try_stack.last() {
                            self.add_edge(bi, catch);
                        }
                    }
                    Opcode::Try | Opcode::TryNoValue => {
                        let target = self.resolve_label_arg(bi, ii, 0, &mut changed)?;
                        try_stack.push(target);
                    }
                    Opcode::EndTry => {
                        try_stack.pop();
                    }
                    other => {
                        assert!(
                            !other.splits_basic_block(),
                            "{}: unhandled control-flow opcode {other} in block {} at item {ii}",
                            self.origin,
                            self.blocks[bi].id
                        );
                    }
                }
            }
        }
        Ok(changed)
    }

    /// A splitting opcode anywhere but the end of its block is fatal
    fn require_last(&self, bi: usize, ii: usize, opcode: Opcode) -> CfgResult<()> {
        if ii + 1 != self.blocks[bi].items.len() {
            return Err(CfgError::MisplacedTerminator {
                opcode: opcode.mnemonic().to_string(),
                block_id: self.blocks[bi].id,
                origin: self.origin.clone(),
            });
        }
        Ok(())
    }

    /// Resolve a label argument through the alias table to its block,
    /// rewriting the argument to the canonical name and counting the
    /// reference
    fn resolve_label_arg(
        &mut self,
        bi: usize,
        ii: usize,
        arg_idx: usize,
        changed: &mut bool,
    ) -> CfgResult<usize> {
        let name = self.blocks[bi].items[ii]
            .as_instruction()
            .expect("jump resolution on a non-instruction item")
            .label_arg(arg_idx)
            .to_string();
        let canonical = self.resolve_alias(&name);
        let Some(&target) = self.labels.get(&canonical) else {
            return Err(CfgError::MissingJumpTarget {
                label: name,
                origin: self.origin.clone(),
            });
        };
        if canonical != name {
            let instr = self.blocks[bi].items[ii]
                .as_instruction_mut()
                .expect("jump resolution on a non-instruction item");
            instr.args[arg_idx] = Operand::Label(canonical.clone());
            self.stats.jumps_canonicalized += 1;
            *changed = true;
        }
        *self.label_references.entry(canonical).or_insert(0) += 1;
        Ok(target)
    }

    /// Follow the alias table to a canonical label name
    fn resolve_alias(&self, name: &str) -> String {
        let mut current = name;
        while let Some(next) = self.aliases.get(current) {
            current = next;
        }
        current.to_string()
    }

    /// Renumber block ids sequentially from the entry's current id
    fn renumber(&mut self) {
        let base = self.blocks.first().map(|b| b.id).unwrap_or(0);
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.id = base + i as u32;
        }
    }

    /// Rewrite jumps whose target block starts (past its labels) with an
    /// unconditional jump, so they point at the ultimate destination.
    ///
    /// Follows whole chains in one step; a degenerate jump cycle stops the
    /// chase at its entry instead of looping.
    fn forward_jumps(&mut self) -> CfgResult<bool> {
        let mut changed = false;
        for bi in 0..self.blocks.len() {
            for ii in 0..self.blocks[bi].items.len() {
                let Some(opcode) = self.blocks[bi].items[ii].opcode() else {
                    continue;
                };
                let Some(arg_idx) = jump_label_arg(opcode) else {
                    continue;
                };
                let original = self.blocks[bi].items[ii]
                    .as_instruction()
                    .expect("jump forwarding on a non-instruction item")
                    .label_arg(arg_idx)
                    .to_string();
                let ultimate = self.chase_jump_chain(&original)?;
                if ultimate != original {
                    trace!(from = %original, to = %ultimate, "forwarded jump");
                    let instr = self.blocks[bi].items[ii]
                        .as_instruction_mut()
                        .expect("jump forwarding on a non-instruction item");
                    instr.args[arg_idx] = Operand::Label(ultimate.clone());
                    if let Some(count) = self.label_references.get_mut(&original) {
                        *count = count.saturating_sub(1);
                    }
                    *self.label_references.entry(ultimate).or_insert(0) += 1;
                    self.stats.jumps_forwarded += 1;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Walk a chain of trivial unconditional jumps to its final label
    fn chase_jump_chain(&self, start: &str) -> CfgResult<String> {
        let mut current = start.to_string();
        let mut visited = vec![current.clone()];
        loop {
            let Some(&block) = self.labels.get(&current) else {
                return Err(CfgError::MissingJumpTarget {
                    label: current,
                    origin: self.origin.clone(),
                });
            };
            let Some(instr) = self.blocks[block].first_real_instruction() else {
                break;
            };
            if instr.opcode != Opcode::Jump {
                break;
            }
            let next = self.resolve_alias(instr.label_arg(0));
            if visited.contains(&next) {
                break;
            }
            visited.push(next.clone());
            current = next;
        }
        Ok(current)
    }

    /// Remove blocks with no predecessors; the entry block is exempt
    fn remove_unreachable(&mut self) -> bool {
        let keep: Vec<bool> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| i == 0 || !b.predecessors.is_empty())
            .collect();
        let removed = keep.iter().filter(|&&k| !k).count();
        if removed == 0 {
            return false;
        }
        self.stats.unreachable_blocks_removed += removed;
        self.retain_blocks(&keep, false);
        true
    }

    /// Drop the blocks marked false in `keep`, fixing up the label map.
    ///
    /// When `retarget` is set, labels on removed blocks move to the next
    /// surviving block; otherwise they are dropped with their block. Edge
    /// lists of survivors may hold stale indices afterwards; the following
    /// cleanup pass rebuilds all edges before they are read again.
    fn retain_blocks(&mut self, keep: &[bool], retarget: bool) {
        let n = self.blocks.len();
        let mut new_index = vec![usize::MAX; n];
        let mut next_free = 0;
        for i in 0..n {
            if keep[i] {
                new_index[i] = next_free;
                next_free += 1;
            }
        }
        let mut next_surviving: Vec<Option<usize>> = vec![None; n];
        let mut next = None;
        for i in (0..n).rev() {
            next_surviving[i] = next;
            if keep[i] {
                next = Some(i);
            }
        }
        let labels = std::mem::take(&mut self.labels);
        self.labels = labels
            .into_iter()
            .filter_map(|(name, bi)| {
                if keep[bi] {
                    Some((name, new_index[bi]))
                } else if retarget {
                    next_surviving[bi].map(|nb| (name, new_index[nb]))
                } else {
                    None
                }
            })
            .collect();
        let mut i = 0;
        self.blocks.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }

    /// Delete every label item whose reference count is zero
    fn remove_unreferenced_labels(&mut self) -> bool {
        let mut removed = 0;
        let references = &self.label_references;
        for block in &mut self.blocks {
            block.items.retain(|item| match item {
                AnnotatedItem::Label(label) => {
                    if references.get(&label.name).copied().unwrap_or(0) == 0 {
                        removed += 1;
                        false
                    } else {
                        true
                    }
                }
                _ => true,
            });
        }
        if removed == 0 {
            return false;
        }
        trace!(removed, "removed unreferenced labels");
        self.stats.labels_removed += removed;
        true
    }

    /// Rebuild the label table by scanning blocks and zero the reference
    /// counts. Returns whether any label sits somewhere other than position
    /// 0 of its block, which forces a structural rebuild.
    fn reindex_labels(&mut self) -> bool {
        self.labels.clear();
        self.label_references.clear();
        let mut displaced = false;
        for (bi, block) in self.blocks.iter().enumerate() {
            for (pos, item) in block.items.iter().enumerate() {
                if let AnnotatedItem::Label(label) = item {
                    self.labels.insert(label.name.clone(), bi);
                    self.label_references.insert(label.name.clone(), 0);
                    if pos != 0 {
                        displaced = true;
                    }
                }
            }
        }
        displaced
    }

    /// Concatenate all block items back into a linear stream
    fn flatten(&mut self) -> Vec<AnnotatedItem> {
        let total: usize = self.blocks.iter().map(|b| b.items.len()).sum();
        let mut items = Vec::with_capacity(total);
        for block in &mut self.blocks {
            items.append(&mut block.items);
        }
        items
    }

    // === Edge maintenance ===

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.blocks[from].successors.contains(&to) {
            self.blocks[from].successors.push(to);
        }
        if !self.blocks[to].predecessors.contains(&from) {
            self.blocks[to].predecessors.push(from);
        }
    }

    fn remove_edge(&mut self, from: usize, to: usize) {
        self.blocks[from].successors.retain(|s| *s != to);
        self.blocks[to].predecessors.retain(|p| *p != from);
    }
}

/// Convert one procedure's stream into a cleaned block list
///
/// Convenience function for one-shot conversion; index 0 of the result is
/// the entry block.
pub fn convert(items: Vec<AnnotatedItem>, origin_name: &str) -> CfgResult<Vec<BasicBlock>> {
    let mut builder = CfgBuilder::new(origin_name);
    builder.convert(items)
}
