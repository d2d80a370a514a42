//! Tests for the peephole rewriter and the CFG builder.

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use std::collections::HashMap;

    use crate::error::CfgError;
    use crate::item::{AnnotatedItem, LocalVariable, Operand, Reference, SourceLocation};
    use crate::opcodes::Opcode;
    use crate::optimizer::{
        convert, dump_cfg, optimize, run_peephole, BasicBlock, CfgBuilder, OptimizeOptions,
    };

    fn push_float(value: f32) -> AnnotatedItem {
        AnnotatedItem::instr_args(Opcode::PushFloat, [Operand::Float(value)])
    }

    fn push_string(index: u32) -> AnnotatedItem {
        AnnotatedItem::instr_args(Opcode::PushString, [Operand::String(index)])
    }

    fn push_ref(reference: Reference) -> AnnotatedItem {
        AnnotatedItem::instr_args(Opcode::PushReferenceValue, [Operand::Reference(reference)])
    }

    fn jump(label: &str) -> AnnotatedItem {
        AnnotatedItem::instr_args(Opcode::Jump, [Operand::Label(label.into())])
    }

    fn jump_if_false(label: &str) -> AnnotatedItem {
        AnnotatedItem::instr_args(Opcode::JumpIfFalse, [Operand::Label(label.into())])
    }

    fn label(name: &str) -> AnnotatedItem {
        AnnotatedItem::label(name)
    }

    fn ret() -> AnnotatedItem {
        AnnotatedItem::instr(Opcode::Return)
    }

    fn call_self() -> AnnotatedItem {
        AnnotatedItem::instr_args(
            Opcode::Call,
            [Operand::Reference(Reference::SelfRef), Operand::ListSize(0)],
        )
    }

    fn opcodes_of(stream: &[AnnotatedItem]) -> Vec<Opcode> {
        stream.iter().filter_map(AnnotatedItem::opcode).collect()
    }

    fn total_stack_effect(stream: &[AnnotatedItem]) -> i32 {
        stream
            .iter()
            .filter_map(AnnotatedItem::as_instruction)
            .map(|instr| instr.stack_effect())
            .sum()
    }

    /// Check the well-formedness invariants of a converted graph
    fn check_invariants(blocks: &[BasicBlock]) {
        // Edge symmetry
        for (bi, block) in blocks.iter().enumerate() {
            for &succ in &block.successors {
                assert!(
                    blocks[succ].predecessors.contains(&bi),
                    "edge {bi}->{succ} missing its predecessor half"
                );
            }
            for &pred in &block.predecessors {
                assert!(
                    blocks[pred].successors.contains(&bi),
                    "edge {pred}->{bi} missing its successor half"
                );
            }
        }
        // Non-entry blocks are reachable from somewhere
        for (bi, block) in blocks.iter().enumerate().skip(1) {
            assert!(
                !block.predecessors.is_empty(),
                "non-entry block {bi} has no predecessors"
            );
        }
        // Labels map to the block they open, and every jump argument
        // resolves to a block in the list
        let mut label_blocks: HashMap<&str, usize> = HashMap::new();
        for (bi, block) in blocks.iter().enumerate() {
            for item in &block.items {
                if let AnnotatedItem::Label(l) = item {
                    label_blocks.insert(l.name.as_str(), bi);
                }
            }
        }
        let mut reference_counts: HashMap<&str, usize> = HashMap::new();
        for block in blocks {
            for item in &block.items {
                let Some(instr) = item.as_instruction() else {
                    continue;
                };
                for arg in &instr.args {
                    if let Operand::Label(name) = arg {
                        assert!(
                            label_blocks.contains_key(name.as_str()),
                            "jump argument {name} does not resolve to a block"
                        );
                        *reference_counts.entry(name.as_str()).or_insert(0) += 1;
                    }
                }
            }
        }
        // Every surviving label is referenced at least once
        for name in label_blocks.keys() {
            assert!(
                reference_counts.get(name).copied().unwrap_or(0) >= 1,
                "label {name} survives with zero references"
            );
        }
    }

    // === Peephole: the rewrite catalog ===

    #[test]
    fn test_greedy_float_fusion() {
        let mut stream = vec![
            push_float(1.0),
            push_float(2.0),
            push_float(3.0),
            AnnotatedItem::instr(Opcode::Pop),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(opcodes_of(&stream), vec![Opcode::PushNFloats, Opcode::Pop]);
        let fused = stream[0].as_instruction().unwrap();
        assert_eq!(
            fused.args.as_slice(),
            &[
                Operand::ListSize(3),
                Operand::Float(1.0),
                Operand::Float(2.0),
                Operand::Float(3.0),
            ]
        );
        assert_eq!(stats.push_runs_fused, 1);
    }

    #[test]
    fn test_greedy_run_is_single_instruction() {
        // N identical pushes always end up in exactly one PushN* with count N
        for n in 2..8u32 {
            let mut stream: Vec<AnnotatedItem> =
                (0..n).map(|i| push_string(i)).collect();
            stream.push(ret());
            run_peephole(&mut stream);
            assert_eq!(
                opcodes_of(&stream),
                vec![Opcode::PushNStrings, Opcode::Return],
                "run of {n}"
            );
            assert_eq!(
                stream[0].as_instruction().unwrap().list_size_arg(0),
                n,
                "run of {n}"
            );
        }
    }

    #[test]
    fn test_boolean_not_folding() {
        let mut stream = vec![
            AnnotatedItem::instr(Opcode::BooleanNot),
            jump_if_false("L"),
            label("L"),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(stream.len(), 2);
        let inverted = stream[0].as_instruction().unwrap();
        assert_eq!(inverted.opcode, Opcode::JumpIfTrue);
        assert_eq!(inverted.label_arg(0), "L");
        assert!(matches!(&stream[1], AnnotatedItem::Label(l) if l.name == "L"));
        assert_eq!(stats.branches_inverted, 1);
    }

    #[test]
    fn test_assign_pop_chain_reaches_null_ref() {
        // Assign; Pop fuses first, then PushNull; AssignPop on the next
        // outer iteration.
        let mut stream = vec![
            AnnotatedItem::instr(Opcode::PushNull),
            AnnotatedItem::instr_args(
                Opcode::Assign,
                [Operand::Reference(Reference::Local(0))],
            ),
            AnnotatedItem::instr(Opcode::Pop),
            ret(),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(opcodes_of(&stream), vec![Opcode::NullRef, Opcode::Return]);
        assert_eq!(
            stream[0].as_instruction().unwrap().args.as_slice(),
            &[Operand::Reference(Reference::Local(0))]
        );
        assert_eq!(stats.assigns_fused, 1);
        assert_eq!(stats.null_writes_fused, 1);
    }

    #[test]
    fn test_field_read_fusion() {
        let mut stream = vec![
            push_ref(Reference::Src),
            AnnotatedItem::instr_args(Opcode::DereferenceField, [Operand::String(7)]),
            ret(),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(
            opcodes_of(&stream),
            vec![Opcode::PushRefAndDereferenceField, Opcode::Return]
        );
        assert_eq!(
            stream[0].as_instruction().unwrap().args.as_slice(),
            &[Operand::Reference(Reference::Src), Operand::String(7)]
        );
        assert_eq!(stats.field_reads_fused, 1);
    }

    #[test]
    fn test_reference_branch_fusion() {
        let mut stream = vec![push_ref(Reference::Local(2)), jump_if_false("skip"), label("skip")];
        let stats = run_peephole(&mut stream);

        let fused = stream[0].as_instruction().unwrap();
        assert_eq!(fused.opcode, Opcode::JumpIfReferenceFalse);
        assert_eq!(fused.label_arg(1), "skip");
        assert_eq!(stats.reference_branches_fused, 1);
    }

    #[test]
    fn test_string_float_pairs_collapse_to_run() {
        let mut stream = vec![
            push_string(0),
            push_float(1.0),
            push_string(1),
            push_float(2.0),
            ret(),
        ];
        run_peephole(&mut stream);

        assert_eq!(
            opcodes_of(&stream),
            vec![Opcode::PushNOfStringFloats, Opcode::Return]
        );
        assert_eq!(
            stream[0].as_instruction().unwrap().args.as_slice(),
            &[
                Operand::ListSize(2),
                Operand::String(0),
                Operand::Float(1.0),
                Operand::String(1),
                Operand::Float(2.0),
            ]
        );
    }

    #[test]
    fn test_switch_case_fusion() {
        let mut stream = vec![
            push_float(4.0),
            AnnotatedItem::instr_args(Opcode::SwitchCase, [Operand::Label("case4".into())]),
            push_string(9),
            AnnotatedItem::instr_args(Opcode::SwitchCase, [Operand::Label("case_s".into())]),
            label("case4"),
            label("case_s"),
            ret(),
        ];
        let stats = run_peephole(&mut stream);

        let ops = opcodes_of(&stream);
        assert_eq!(
            ops,
            vec![Opcode::SwitchOnFloat, Opcode::SwitchOnString, Opcode::Return]
        );
        assert_eq!(stats.switch_cases_fused, 2);
    }

    #[test]
    fn test_list_fusion() {
        let mut stream = vec![
            push_float(1.0),
            push_float(2.0),
            push_float(3.0),
            AnnotatedItem::instr_args(Opcode::CreateList, [Operand::ListSize(3)]),
            ret(),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(
            opcodes_of(&stream),
            vec![Opcode::CreateListNFloats, Opcode::Return]
        );
        assert_eq!(
            stream[0].as_instruction().unwrap().args.as_slice(),
            &[
                Operand::ListSize(3),
                Operand::Float(1.0),
                Operand::Float(2.0),
                Operand::Float(3.0),
            ]
        );
        assert_eq!(stats.push_runs_fused, 1);
        assert_eq!(stats.lists_fused, 1);
    }

    #[test]
    fn test_list_fusion_requires_matching_count() {
        // Two pushed floats feeding a three-element list constructor: the
        // run still fuses but the list fusion precondition fails.
        let mut stream = vec![
            push_float(1.0),
            push_float(2.0),
            AnnotatedItem::instr_args(Opcode::CreateList, [Operand::ListSize(3)]),
            ret(),
        ];
        let stats = run_peephole(&mut stream);

        assert_eq!(
            opcodes_of(&stream),
            vec![Opcode::PushNFloats, Opcode::CreateList, Opcode::Return]
        );
        assert_eq!(stats.lists_fused, 0);
    }

    #[test]
    fn test_dead_jump_dropped() {
        let mut stream = vec![jump("A"), jump("B"), label("A"), ret()];
        let stats = run_peephole(&mut stream);

        assert_eq!(stream.len(), 3);
        assert_eq!(stream[0].as_instruction().unwrap().label_arg(0), "A");
        assert_eq!(stats.dead_jumps_removed, 1);
    }

    #[test]
    fn test_type_check_fusion() {
        let mut stream = vec![
            AnnotatedItem::instr_args(Opcode::PushType, [Operand::TypeId(12)]),
            AnnotatedItem::instr(Opcode::IsType),
            ret(),
        ];
        run_peephole(&mut stream);

        assert_eq!(opcodes_of(&stream), vec![Opcode::IsTypeDirect, Opcode::Return]);
        assert_eq!(
            stream[0].as_instruction().unwrap().args.as_slice(),
            &[Operand::TypeId(12)]
        );
    }

    #[test]
    fn test_labels_block_windows() {
        let mut stream = vec![push_float(1.0), label("mid"), push_float(2.0), ret()];
        let stats = run_peephole(&mut stream);

        assert_eq!(stats.total_rewrites(), 0);
        assert_eq!(stream.len(), 4);
    }

    #[test]
    fn test_local_variables_block_windows() {
        let mut stream = vec![
            push_float(1.0),
            AnnotatedItem::LocalVariable(LocalVariable::new("counter")),
            push_float(2.0),
            ret(),
        ];
        let stats = run_peephole(&mut stream);
        assert_eq!(stats.total_rewrites(), 0);
    }

    #[test]
    fn test_peephole_idempotence() {
        let mut stream = vec![
            AnnotatedItem::instr(Opcode::PushNull),
            AnnotatedItem::instr_args(Opcode::Assign, [Operand::Reference(Reference::Local(1))]),
            AnnotatedItem::instr(Opcode::Pop),
            push_float(1.0),
            push_float(2.0),
            push_float(3.0),
            AnnotatedItem::instr_args(Opcode::CreateList, [Operand::ListSize(3)]),
            AnnotatedItem::instr(Opcode::BooleanNot),
            jump_if_false("out"),
            jump("out"),
            label("out"),
            ret(),
        ];
        run_peephole(&mut stream);
        let first = stream.clone();
        let stats = run_peephole(&mut stream);

        assert_eq!(stats.total_rewrites(), 0);
        assert_eq!(stream, first);
    }

    #[test]
    fn test_rewrites_preserve_stack_effect() {
        let streams: Vec<Vec<AnnotatedItem>> = vec![
            vec![push_float(1.0), push_float(2.0), push_float(3.0)],
            vec![
                AnnotatedItem::instr_args(
                    Opcode::Assign,
                    [Operand::Reference(Reference::Global(3))],
                ),
                AnnotatedItem::instr(Opcode::Pop),
            ],
            vec![
                AnnotatedItem::instr(Opcode::PushNull),
                AnnotatedItem::instr_args(
                    Opcode::AssignPop,
                    [Operand::Reference(Reference::Local(0))],
                ),
            ],
            vec![push_string(0), push_float(0.5)],
            vec![
                push_float(1.0),
                push_float(2.0),
                AnnotatedItem::instr_args(Opcode::CreateList, [Operand::ListSize(2)]),
            ],
            vec![
                AnnotatedItem::instr(Opcode::BooleanNot),
                jump_if_false("L"),
                label("L"),
            ],
            vec![
                AnnotatedItem::instr_args(Opcode::PushType, [Operand::TypeId(1)]),
                AnnotatedItem::instr(Opcode::IsType),
            ],
        ];
        for mut stream in streams {
            let before = total_stack_effect(&stream);
            run_peephole(&mut stream);
            assert_eq!(
                total_stack_effect(&stream),
                before,
                "stack effect changed for {:?}",
                opcodes_of(&stream)
            );
        }
    }

    #[test]
    fn test_fused_location_inherited() {
        let first = SourceLocation {
            file: 1,
            line: 10,
            column: 4,
        };
        let second = SourceLocation {
            file: 1,
            line: 11,
            column: 4,
        };
        let mut stream = vec![
            AnnotatedItem::Instruction(
                crate::item::Instruction::with_args(Opcode::PushFloat, [Operand::Float(1.0)])
                    .at(first),
            ),
            AnnotatedItem::Instruction(
                crate::item::Instruction::with_args(Opcode::PushFloat, [Operand::Float(2.0)])
                    .at(second),
            ),
            ret(),
        ];
        run_peephole(&mut stream);
        assert_eq!(stream[0].location(), Some(first));

        // When only a later window item carries a location, it wins
        let mut stream = vec![
            push_float(1.0),
            AnnotatedItem::Instruction(
                crate::item::Instruction::with_args(Opcode::PushFloat, [Operand::Float(2.0)])
                    .at(second),
            ),
            ret(),
        ];
        run_peephole(&mut stream);
        assert_eq!(stream[0].location(), Some(second));
    }

    // === CFG: split, resolve, cleanup ===

    #[test]
    fn test_dead_jump_then_convert() {
        let mut stream = vec![jump("A"), jump("B"), label("A"), ret()];
        run_peephole(&mut stream);
        let blocks = convert(stream, "/proc/dead_jump").unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(opcodes_of(&blocks[0].items), vec![Opcode::Jump]);
        assert_eq!(opcodes_of(&blocks[1].items), vec![Opcode::Return]);
        assert_eq!(blocks[0].successors.as_slice(), &[1]);
        assert_eq!(blocks[1].predecessors.as_slice(), &[0]);
        check_invariants(&blocks);
    }

    #[test]
    fn test_adjacent_labels_collapse() {
        let stream = vec![
            jump("Y"),
            label("X"),
            label("Y"),
            push_float(0.0),
            ret(),
        ];
        let mut builder = CfgBuilder::new("/proc/alias");
        let blocks = builder.convert(stream).unwrap();

        // Only the canonical label X survives and the jump was rewritten
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].items[0].as_instruction().unwrap().label_arg(0), "X");
        assert!(matches!(&blocks[1].items[0], AnnotatedItem::Label(l) if l.name == "X"));
        assert!(!blocks
            .iter()
            .flat_map(|b| &b.items)
            .any(|item| matches!(item, AnnotatedItem::Label(l) if l.name == "Y")));
        assert_eq!(builder.stats().aliases_collapsed, 1);
        assert_eq!(builder.stats().jumps_canonicalized, 1);
        check_invariants(&blocks);
    }

    #[test]
    fn test_jump_forwarding_deletes_trampoline() {
        let stream = vec![
            jump("L1"),
            label("L1"),
            jump("L2"),
            label("L2"),
            ret(),
        ];
        let mut builder = CfgBuilder::new("/proc/forward");
        let blocks = builder.convert(stream).unwrap();

        // The L1 trampoline loses its only reference and then its block
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].items[0].as_instruction().unwrap().label_arg(0), "L2");
        assert!(matches!(&blocks[1].items[0], AnnotatedItem::Label(l) if l.name == "L2"));
        assert!(builder.stats().jumps_forwarded >= 1);
        assert!(builder.stats().labels_removed >= 1);
        check_invariants(&blocks);
    }

    #[test]
    fn test_conditional_jump_forwarding_keeps_fallthrough() {
        let stream = vec![
            AnnotatedItem::instr_args(Opcode::JumpIfTrue, [Operand::Label("L1".into())]),
            label("L1"),
            jump("L2"),
            label("L2"),
            ret(),
        ];
        let mut builder = CfgBuilder::new("/proc/forward_cond");
        let blocks = builder.convert(stream).unwrap();

        // The conditional now targets L2 directly; the trampoline stays
        // reachable through the false path.
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].items[0].as_instruction().unwrap().label_arg(0), "L2");
        assert_eq!(opcodes_of(&blocks[1].items), vec![Opcode::Jump]);
        assert_eq!(blocks[1].items[0].as_instruction().unwrap().label_arg(0), "L2");
        assert!(builder.stats().jumps_forwarded >= 1);
        check_invariants(&blocks);
    }

    #[test]
    fn test_try_throw_routing() {
        let stream = vec![
            AnnotatedItem::instr_args(Opcode::Try, [Operand::Label("CATCH".into())]),
            call_self(),
            AnnotatedItem::instr(Opcode::Throw),
            label("CATCH"),
            ret(),
        ];
        let blocks = convert(stream, "/proc/try_throw").unwrap();

        assert_eq!(blocks.len(), 2);
        // The block holding the call and the throw routes to the catch
        // target and nowhere else: Throw discards its fallthrough.
        assert_eq!(blocks[0].successors.as_slice(), &[1]);
        assert_eq!(blocks[1].predecessors.as_slice(), &[0]);
        assert!(matches!(&blocks[1].items[0], AnnotatedItem::Label(l) if l.name == "CATCH"));
        check_invariants(&blocks);
    }

    #[test]
    fn test_call_in_try_gets_speculative_catch_edge() {
        let stream = vec![
            AnnotatedItem::instr_args(Opcode::Try, [Operand::Label("CATCH".into())]),
            call_self(),
            jump("done"),
            label("done"),
            ret(),
            label("CATCH"),
            ret(),
        ];
        let blocks = convert(stream, "/proc/try_call").unwrap();

        assert_eq!(blocks.len(), 3);
        // Call block: jump target plus the speculative catch edge
        let mut successors = blocks[0].successors.to_vec();
        successors.sort_unstable();
        assert_eq!(successors, vec![1, 2]);
        // The return before the catch label does not fall into it
        assert_eq!(blocks[2].predecessors.as_slice(), &[0]);
        check_invariants(&blocks);
    }

    #[test]
    fn test_end_try_stops_catch_routing() {
        let stream = vec![
            AnnotatedItem::instr_args(Opcode::Try, [Operand::Label("CATCH".into())]),
            call_self(),
            AnnotatedItem::instr(Opcode::EndTry),
            jump("mid"),
            label("mid"),
            call_self(),
            jump("done"),
            label("done"),
            ret(),
            label("CATCH"),
            ret(),
        ];
        let blocks = convert(stream, "/proc/end_try").unwrap();

        assert_eq!(blocks.len(), 4);
        // The in-try call routes to the catch target...
        assert!(blocks[0].successors.contains(&3));
        // ...but the call after EndTry does not: its block's only successor
        // is the jump target.
        assert_eq!(blocks[1].successors.as_slice(), &[2]);
        check_invariants(&blocks);
    }

    #[test]
    fn test_unreachable_code_after_return_removed() {
        let stream = vec![ret(), push_float(1.0), ret()];
        let mut builder = CfgBuilder::new("/proc/unreachable");
        let blocks = builder.convert(stream).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(opcodes_of(&blocks[0].items), vec![Opcode::Return]);
        assert!(builder.stats().unreachable_blocks_removed >= 1);
    }

    #[test]
    fn test_entry_block_survives_everything() {
        let blocks = convert(Vec::new(), "/proc/empty").unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn test_spawn_has_both_edges() {
        let stream = vec![
            AnnotatedItem::instr_args(Opcode::Spawn, [Operand::Label("body".into())]),
            ret(),
            label("body"),
            ret(),
        ];
        let blocks = convert(stream, "/proc/spawn").unwrap();

        assert_eq!(blocks.len(), 3);
        let mut successors = blocks[0].successors.to_vec();
        successors.sort_unstable();
        assert_eq!(successors, vec![1, 2]);
        check_invariants(&blocks);
    }

    #[test]
    fn test_enumerate_loop_shape() {
        let stream = vec![
            push_float(1.0),
            push_float(10.0),
            push_float(1.0),
            AnnotatedItem::instr(Opcode::CreateRangeEnumerator),
            label("LOOP"),
            AnnotatedItem::instr_args(
                Opcode::Enumerate,
                [
                    Operand::Reference(Reference::Local(0)),
                    Operand::Label("DONE".into()),
                ],
            ),
            push_ref(Reference::Local(0)),
            AnnotatedItem::instr(Opcode::Pop),
            jump("LOOP"),
            label("DONE"),
            AnnotatedItem::instr(Opcode::DestroyEnumerator),
            ret(),
        ];
        let blocks = convert(stream, "/proc/range_loop").unwrap();

        assert_eq!(blocks.len(), 4);
        // Loop header: fallthrough into the body plus the exit edge
        let mut header_succs = blocks[1].successors.to_vec();
        header_succs.sort_unstable();
        assert_eq!(header_succs, vec![2, 3]);
        // Back edge from the body
        assert!(blocks[2].successors.contains(&1));
        assert!(blocks[1].predecessors.contains(&2));
        check_invariants(&blocks);
    }

    #[test]
    fn test_boolean_and_splits_block() {
        let stream = vec![
            push_float(1.0),
            AnnotatedItem::instr_args(Opcode::BooleanAnd, [Operand::Label("END".into())]),
            push_float(2.0),
            label("END"),
            ret(),
        ];
        let blocks = convert(stream, "/proc/short_circuit").unwrap();

        assert_eq!(blocks.len(), 3);
        let mut successors = blocks[0].successors.to_vec();
        successors.sort_unstable();
        assert_eq!(successors, vec![1, 2]);
        check_invariants(&blocks);
    }

    #[test]
    fn test_local_variable_rides_along() {
        let stream = vec![
            AnnotatedItem::LocalVariable(LocalVariable::new("i")),
            push_float(0.0),
            AnnotatedItem::instr_args(
                Opcode::AssignPop,
                [Operand::Reference(Reference::Local(0))],
            ),
            ret(),
        ];
        let blocks = convert(stream, "/proc/locals").unwrap();

        assert_eq!(blocks.len(), 1);
        assert!(matches!(
            &blocks[0].items[0],
            AnnotatedItem::LocalVariable(v) if v.name == "i"
        ));
    }

    #[test]
    fn test_duplicate_label_is_fatal() {
        let stream = vec![jump("A"), label("A"), ret(), label("A"), ret()];
        let err = convert(stream, "/proc/dup").unwrap_err();
        assert_eq!(
            err,
            CfgError::DuplicateLabel {
                label: "A".into(),
                origin: "/proc/dup".into(),
            }
        );
    }

    #[test]
    fn test_missing_jump_target_is_fatal() {
        let stream = vec![jump("nowhere"), ret()];
        let err = convert(stream, "/proc/missing").unwrap_err();
        assert_eq!(
            err,
            CfgError::MissingJumpTarget {
                label: "nowhere".into(),
                origin: "/proc/missing".into(),
            }
        );
    }

    #[test]
    fn test_cleanup_disabled_keeps_raw_shape() {
        let stream = vec![ret(), ret()];
        let mut builder = CfgBuilder::new("/proc/raw").cleanup(false);
        let blocks = builder.convert(stream).unwrap();

        // Naive conversion: both returns and the trailing empty block stay
        assert_eq!(blocks.len(), 3);
        assert!(blocks[1].predecessors.is_empty());
        assert_eq!(builder.stats().unreachable_blocks_removed, 0);
    }

    #[test]
    fn test_block_ids_are_sequential() {
        let stream = vec![
            jump("B"),
            label("A"),
            ret(),
            label("B"),
            jump("A"),
        ];
        let blocks = convert(stream, "/proc/ids").unwrap();
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].id, pair[0].id + 1);
        }
    }

    #[test]
    fn test_dump_cfg_writes_listings() {
        let stream = vec![jump("A"), label("A"), ret()];
        let blocks = convert(stream, "/proc/dump_me").unwrap();
        dump_cfg(&blocks, "/proc/dump_me").unwrap();

        let listing = std::fs::read_to_string("cfg/_proc_dump_me").unwrap();
        assert!(listing.contains("block 0"));
        assert!(listing.contains("jump A"));
        let flattened = std::fs::read_to_string("cfg/_proc_dump_me_insts").unwrap();
        assert!(flattened.contains("A:"));

        std::fs::remove_file("cfg/_proc_dump_me").ok();
        std::fs::remove_file("cfg/_proc_dump_me_insts").ok();
    }

    #[test]
    fn test_full_pipeline_stats() {
        let stream = vec![
            push_float(1.0),
            push_float(2.0),
            push_float(3.0),
            AnnotatedItem::instr_args(Opcode::CreateList, [Operand::ListSize(3)]),
            AnnotatedItem::instr_args(
                Opcode::AssignPop,
                [Operand::Reference(Reference::Local(0))],
            ),
            jump("tail"),
            jump("tail"),
            label("tail"),
            ret(),
        ];
        let (blocks, peephole, cfg) =
            optimize(stream, "/proc/stats", &OptimizeOptions::default()).unwrap();

        assert_eq!(peephole.push_runs_fused, 1);
        assert_eq!(peephole.lists_fused, 1);
        assert_eq!(peephole.dead_jumps_removed, 1);
        assert!(cfg.iterations >= 1);
        check_invariants(&blocks);
    }
}
