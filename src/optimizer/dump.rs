//! Debug dumps of converted graphs.
//!
//! These helpers are a debugging aid for emitter and optimizer work: they
//! write synchronously to the working directory and nothing in the library
//! calls them. Keep them out of production paths.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use super::cfg::BasicBlock;

/// Write a textual listing of the graph to `./cfg/<sanitized_name>` and a
/// flattened instruction listing to `<path>_insts`.
///
/// Forward slashes in `name` (procedure paths) are replaced by underscores.
pub fn dump_cfg(blocks: &[BasicBlock], name: &str) -> io::Result<()> {
    let sanitized = name.replace('/', "_");
    let dir = PathBuf::from("cfg");
    fs::create_dir_all(&dir)?;
    let path = dir.join(&sanitized);

    let mut listing = String::new();
    for (index, block) in blocks.iter().enumerate() {
        let preds: Vec<u32> = block.predecessors.iter().map(|&p| blocks[p].id).collect();
        let succs: Vec<u32> = block.successors.iter().map(|&s| blocks[s].id).collect();
        let _ = writeln!(
            listing,
            "block {} (#{index}) preds={preds:?} succs={succs:?}",
            block.id
        );
        for item in &block.items {
            let _ = writeln!(listing, "{item}");
        }
        let _ = writeln!(listing);
    }
    fs::write(&path, listing)?;

    let mut flattened = String::new();
    for block in blocks {
        for item in &block.items {
            let _ = writeln!(flattened, "{item}");
        }
    }
    let insts_path = dir.join(format!("{sanitized}_insts"));
    fs::write(insts_path, flattened)
}
