use super::*;
use crate::machine::errors::MachineError;

fn program(lines: &[(u32, &str)]) -> Program {
    let mut p = Program::new();
    for (number, text) in lines {
        p.set_line(*number, text);
    }
    p
}

fn run(lines: &[(u32, &str)]) -> (Vm, RunReport) {
    let p = program(lines);
    let mut vm = Vm::new();
    let report = vm.run(&p).expect("run failed");
    (vm, report)
}

fn run_err(lines: &[(u32, &str)]) -> RuntimeError {
    let p = program(lines);
    let mut vm = Vm::new();
    vm.run(&p).expect_err("expected error")
}

fn stack_after(lines: &[(u32, &str)]) -> Vec<i64> {
    run(lines).0.snapshot().stack
}

/// Stack after `CRCT a; CRCT b; <op>; PARA`.
fn binary_result(a: i64, b: i64, op: &str) -> i64 {
    let stack = stack_after(&[
        (10, &format!("CRCT {a}")),
        (20, &format!("CRCT {b}")),
        (30, op),
        (40, "PARA"),
    ]);
    assert_eq!(stack.len(), 1, "binary op must leave exactly one value");
    stack[0]
}

// ==================== Arithmetic ====================

#[test]
fn soma_subt_mult() {
    assert_eq!(binary_result(2, 3, "SOMA"), 5);
    assert_eq!(binary_result(10, 3, "SUBT"), 7);
    assert_eq!(binary_result(-4, 6, "MULT"), -24);
}

#[test]
fn operand_order_is_left_then_right() {
    // The value pushed first is the left operand.
    assert_eq!(binary_result(1, 10, "SUBT"), -9);
    assert_eq!(binary_result(10, 1, "SUBT"), 9);
}

#[test]
fn divi_floors_toward_negative_infinity() {
    assert_eq!(binary_result(7, 2, "DIVI"), 3);
    assert_eq!(binary_result(-7, 2, "DIVI"), -4);
    assert_eq!(binary_result(7, -2, "DIVI"), -4);
    assert_eq!(binary_result(-7, -2, "DIVI"), 3);
    assert_eq!(binary_result(6, 3, "DIVI"), 2);
    assert_eq!(binary_result(-6, 3, "DIVI"), -2);
}

#[test]
fn divi_by_zero_fails_with_line() {
    let err = run_err(&[(10, "CRCT 1"), (20, "CRCT 0"), (30, "DIVI"), (40, "PARA")]);
    assert_eq!(err.line(), Some(30));
    assert_eq!(err.source(), &MachineError::DivisionByZero);
}

#[test]
fn invr_negates() {
    assert_eq!(stack_after(&[(10, "CRCT 5"), (20, "INVR"), (30, "PARA")]), vec![-5]);
    assert_eq!(stack_after(&[(10, "CRCT -5"), (20, "INVR"), (30, "PARA")]), vec![5]);
}

#[test]
fn arithmetic_wraps_instead_of_panicking() {
    let max = i64::MAX;
    let stack = stack_after(&[
        (10, &format!("CRCT {max}")),
        (20, "CRCT 1"),
        (30, "SOMA"),
        (40, "PARA"),
    ]);
    assert_eq!(stack, vec![i64::MIN]);
}

// ==================== Logic and comparison ====================

#[test]
fn conj_and_disj_treat_nonzero_as_true() {
    assert_eq!(binary_result(1, 1, "CONJ"), 1);
    assert_eq!(binary_result(7, -3, "CONJ"), 1);
    assert_eq!(binary_result(1, 0, "CONJ"), 0);
    assert_eq!(binary_result(0, 0, "CONJ"), 0);

    assert_eq!(binary_result(0, 0, "DISJ"), 0);
    assert_eq!(binary_result(0, 5, "DISJ"), 1);
    assert_eq!(binary_result(2, 0, "DISJ"), 1);
}

#[test]
fn comparisons_push_zero_or_one() {
    assert_eq!(binary_result(1, 2, "CMME"), 1); // <
    assert_eq!(binary_result(2, 1, "CMME"), 0);
    assert_eq!(binary_result(2, 1, "CMMA"), 1); // >
    assert_eq!(binary_result(1, 2, "CMMA"), 0);
    assert_eq!(binary_result(3, 3, "CMIG"), 1); // ==
    assert_eq!(binary_result(3, 4, "CMIG"), 0);
    assert_eq!(binary_result(3, 4, "CMDG"), 1); // !=
    assert_eq!(binary_result(3, 3, "CMDG"), 0);
    assert_eq!(binary_result(3, 3, "CMEG"), 1); // <=
    assert_eq!(binary_result(4, 3, "CMEG"), 0);
    assert_eq!(binary_result(3, 3, "CMAG"), 1); // >=
    assert_eq!(binary_result(2, 3, "CMAG"), 0);
}

#[test]
fn binary_op_underflow_reports_counts() {
    let err = run_err(&[(10, "CRCT 1"), (20, "SOMA"), (30, "PARA")]);
    assert_eq!(err.line(), Some(20));
    assert_eq!(
        err.source(),
        &MachineError::StackUnderflow {
            opcode: "SOMA",
            needed: 2,
            available: 1,
        }
    );
}

// ==================== Memory ====================

#[test]
fn amem_then_dmem_restores_memory() {
    let (vm, _) = run(&[
        (10, "AMEM 2"),
        (20, "CRCT 9"),
        (30, "ARMZ 0"),
        (40, "AMEM 3"),
        (50, "DMEM 3"),
        (60, "PARA"),
    ]);
    assert_eq!(vm.snapshot().memory, vec![9, 0]);
}

#[test]
fn amem_zero_is_a_no_op() {
    let (vm, _) = run(&[(10, "AMEM 0"), (20, "PARA")]);
    assert!(vm.snapshot().memory.is_empty());
}

#[test]
fn amem_negative_fails() {
    let err = run_err(&[(10, "AMEM -1"), (20, "PARA")]);
    assert_eq!(err.line(), Some(10));
    assert_eq!(
        err.source(),
        &MachineError::InvalidAllocation {
            opcode: "AMEM",
            size: -1,
            available: 0,
        }
    );
}

#[test]
fn dmem_beyond_allocation_fails() {
    let err = run_err(&[(10, "AMEM 1"), (20, "DMEM 2"), (30, "PARA")]);
    assert_eq!(err.line(), Some(20));
    assert_eq!(
        err.source(),
        &MachineError::InvalidAllocation {
            opcode: "DMEM",
            size: 2,
            available: 1,
        }
    );
}

#[test]
fn crvl_and_armz_roundtrip_through_memory() {
    let (vm, _) = run(&[
        (10, "AMEM 2"),
        (20, "CRCT 42"),
        (30, "ARMZ 1"),
        (40, "CRVL 1"),
        (50, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![42]);
    assert_eq!(vm.snapshot().memory, vec![0, 42]);
}

#[test]
fn crvl_out_of_bounds_fails_at_its_line() {
    let err = run_err(&[(10, "AMEM 1"), (20, "CRVL 5"), (30, "PARA")]);
    assert_eq!(err.line(), Some(20));
    assert_eq!(
        err.source(),
        &MachineError::MemoryOutOfBounds { address: 5, size: 1 }
    );
}

#[test]
fn armz_pops_the_stored_value() {
    let (vm, _) = run(&[
        (10, "AMEM 1"),
        (20, "CRCT 3"),
        (30, "ARMZ 0"),
        (40, "PARA"),
    ]);
    assert!(vm.snapshot().stack.is_empty());
    assert_eq!(vm.snapshot().memory, vec![3]);
}

#[test]
fn armz_on_empty_stack_underflows() {
    let err = run_err(&[(10, "AMEM 1"), (20, "ARMZ 0"), (30, "PARA")]);
    assert!(matches!(
        err.source(),
        MachineError::StackUnderflow { opcode: "ARMZ", .. }
    ));
}

#[test]
fn armz_decodes_the_address_before_popping() {
    // Malformed address wins over the empty stack.
    let err = run_err(&[(10, "ARMZ x"), (20, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::InvalidArgument {
            opcode: "ARMZ",
            token: "x".to_string(),
        }
    );
}

#[test]
fn armz_negative_address_is_out_of_bounds() {
    let err = run_err(&[(10, "AMEM 1"), (20, "CRCT 1"), (30, "ARMZ -1"), (40, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::MemoryOutOfBounds { address: -1, size: 1 }
    );
}

// ==================== Constants and output ====================

#[test]
fn crct_pushes_signed_constants() {
    assert_eq!(
        stack_after(&[(10, "CRCT -12"), (20, "CRCT 0"), (30, "PARA")]),
        vec![-12, 0]
    );
}

#[test]
fn crct_rejects_non_integer_argument() {
    let err = run_err(&[(10, "CRCT abc"), (20, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::InvalidArgument {
            opcode: "CRCT",
            token: "abc".to_string(),
        }
    );
}

#[test]
fn impr_emits_without_popping() {
    let (vm, report) = run(&[(10, "CRCT 7"), (20, "IMPR"), (30, "PARA")]);
    assert_eq!(report.emitted, vec![7]);
    assert_eq!(vm.snapshot().stack, vec![7]);
}

#[test]
fn impr_on_empty_stack_underflows() {
    let err = run_err(&[(10, "IMPR"), (20, "PARA")]);
    assert!(matches!(
        err.source(),
        MachineError::StackUnderflow { opcode: "IMPR", .. }
    ));
}

#[test]
fn emitted_values_are_ordered() {
    let (_, report) = run(&[
        (10, "CRCT 1"),
        (20, "IMPR"),
        (30, "CRCT 2"),
        (40, "IMPR"),
        (50, "PARA"),
    ]);
    assert_eq!(report.emitted, vec![1, 2]);
}

// ==================== Control flow ====================

#[test]
fn dsvs_jumps_by_line_number() {
    let (vm, _) = run(&[
        (10, "DSVS 40"),
        (20, "CRCT 111"),
        (40, "CRCT 222"),
        (50, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![222]);
}

#[test]
fn dsvs_jumps_by_label() {
    let (vm, _) = run(&[
        (10, "DSVS done"),
        (20, "CRCT 111"),
        (40, "done: CRCT 222"),
        (50, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![222]);
}

#[test]
fn dsvs_unknown_target_fails() {
    let err = run_err(&[(10, "DSVS nowhere"), (20, "PARA")]);
    assert_eq!(err.line(), Some(10));
    assert_eq!(
        err.source(),
        &MachineError::UnresolvedTarget {
            target: "nowhere".to_string(),
        }
    );
}

#[test]
fn numeric_target_never_falls_back_to_labels() {
    // A label spelled "5" exists, but "DSVS 5" resolves as a line number
    // and line 5 does not exist.
    let err = run_err(&[(10, "DSVS 5"), (30, "5: CRCT 1"), (40, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::UnresolvedTarget {
            target: "5".to_string(),
        }
    );
}

#[test]
fn dsvf_jumps_only_on_zero() {
    let (vm, _) = run(&[
        (10, "CRCT 0"),
        (20, "DSVF 50"),
        (30, "CRCT 111"),
        (50, "CRCT 222"),
        (60, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![222]);
}

#[test]
fn dsvf_nonzero_pops_and_falls_through_without_resolving() {
    // The target does not exist, but a non-zero condition never consults it.
    let (vm, _) = run(&[
        (10, "CRCT 1"),
        (20, "DSVF nowhere"),
        (30, "CRCT 9"),
        (40, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![9]);
}

#[test]
fn dsvf_on_empty_stack_underflows() {
    let err = run_err(&[(10, "DSVF 30"), (30, "PARA")]);
    assert!(matches!(
        err.source(),
        MachineError::StackUnderflow { opcode: "DSVF", .. }
    ));
}

#[test]
fn duplicate_label_resolves_to_the_greater_line() {
    let (vm, _) = run(&[
        (5, "DSVS L1"),
        (10, "L1: CRCT 111"),
        (20, "PARA"),
        (30, "L1: CRCT 222"),
        (40, "PARA"),
    ]);
    assert_eq!(vm.snapshot().stack, vec![222]);
}

#[test]
fn backward_jump_loops_until_condition_flips() {
    // Counts down from 3: memory[0] ends at 0, loop body runs three times.
    let (vm, report) = run(&[
        (10, "INPP"),
        (20, "AMEM 1"),
        (30, "CRCT 3"),
        (40, "ARMZ 0"),
        (50, "loop: CRVL 0"),
        (60, "DSVF end"),
        (70, "CRVL 0"),
        (80, "CRCT 1"),
        (90, "SUBT"),
        (100, "ARMZ 0"),
        (110, "DSVS loop"),
        (120, "end: PARA"),
    ]);
    assert_eq!(vm.snapshot().memory, vec![0]);
    assert!(report.steps > 10);
}

#[test]
fn tight_loop_never_halts_within_bounded_steps() {
    let p = program(&[(10, "L1: CRCT 1"), (20, "DSVS L1")]);
    let mut vm = Vm::new();
    vm.reset(&p).unwrap();
    for _ in 0..1000 {
        let outcome = vm.step_current().expect("loop step failed");
        assert_ne!(outcome, StepOutcome::Halted);
    }
    assert!(!vm.at_end());
}

// ==================== Start rule and lifecycle ====================

#[test]
fn execution_starts_at_inpp_wherever_it_is() {
    let (vm, _) = run(&[(10, "CRCT 111"), (20, "PARA"), (30, "INPP"), (40, "CRCT 222"), (50, "PARA")]);
    assert_eq!(vm.snapshot().stack, vec![222]);
}

#[test]
fn execution_starts_at_first_line_without_inpp() {
    let (vm, _) = run(&[(10, "CRCT 1"), (20, "PARA")]);
    assert_eq!(vm.snapshot().stack, vec![1]);
}

#[test]
fn empty_program_fails_to_start() {
    let p = Program::new();
    let mut vm = Vm::new();
    let err = vm.run(&p).unwrap_err();
    assert_eq!(err.source(), &MachineError::EmptyProgram);
    assert_eq!(err.line(), None);
}

#[test]
fn run_fully_resets_previous_state() {
    let p = program(&[(10, "AMEM 1"), (20, "CRCT 5"), (30, "PARA")]);
    let mut vm = Vm::new();
    vm.run(&p).unwrap();
    assert_eq!(vm.snapshot().stack, vec![5]);

    // Second run starts from scratch, not on top of the old stack/memory.
    let report = vm.run(&p).unwrap();
    assert_eq!(vm.snapshot().stack, vec![5]);
    assert_eq!(vm.snapshot().memory, vec![0]);
    assert_eq!(report.steps, 3);
}

#[test]
fn run_halts_at_program_exhaustion_without_para() {
    let (vm, report) = run(&[(10, "CRCT 1"), (20, "CRCT 2")]);
    assert_eq!(vm.snapshot().stack, vec![1, 2]);
    assert_eq!(report.steps, 2);
    assert_eq!(vm.mode(), Mode::Halted);
}

#[test]
fn failed_run_leaves_the_machine_idle() {
    let p = program(&[(10, "CRVL 0")]);
    let mut vm = Vm::new();
    vm.run(&p).unwrap_err();
    assert_eq!(vm.mode(), Mode::Idle);
}

#[test]
fn snapshot_reflects_edits_between_runs() {
    let mut p = program(&[(10, "CRCT 1"), (20, "PARA")]);
    let mut vm = Vm::new();
    vm.run(&p).unwrap();
    assert_eq!(vm.snapshot().stack, vec![1]);

    p.set_line(10, "CRCT 99");
    vm.run(&p).unwrap();
    assert_eq!(vm.snapshot().stack, vec![99]);
}

// ==================== Decoding edge cases ====================

#[test]
fn unknown_instruction_fails_when_executed() {
    let err = run_err(&[(10, "HALT"), (20, "PARA")]);
    assert_eq!(err.line(), Some(10));
    assert_eq!(
        err.source(),
        &MachineError::UnknownOpcode {
            name: "HALT".to_string(),
        }
    );
}

#[test]
fn unknown_instruction_after_para_is_never_reached() {
    let (vm, _) = run(&[(10, "PARA"), (20, "HALT")]);
    assert_eq!(vm.mode(), Mode::Halted);
}

#[test]
fn label_only_and_blank_lines_are_no_ops() {
    let (vm, _) = run(&[(10, "L1:"), (15, ""), (20, "CRCT 4"), (30, "PARA")]);
    assert_eq!(vm.snapshot().stack, vec![4]);
}

#[test]
fn zero_arity_opcodes_ignore_extra_tokens() {
    let (vm, _) = run(&[(10, "CRCT 1"), (20, "CRCT 2"), (30, "SOMA ignored"), (40, "PARA")]);
    assert_eq!(vm.snapshot().stack, vec![3]);
}

#[test]
fn one_arity_opcodes_enforce_argument_count() {
    let err = run_err(&[(10, "AMEM"), (20, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::ArityMismatch {
            opcode: "AMEM",
            expected: 1,
            actual: 0,
        }
    );

    let err = run_err(&[(10, "CRCT 1 2"), (20, "PARA")]);
    assert_eq!(
        err.source(),
        &MachineError::ArityMismatch {
            opcode: "CRCT",
            expected: 1,
            actual: 2,
        }
    );
}

#[test]
fn mnemonics_execute_case_insensitively() {
    let (vm, report) = run(&[(10, "crct 8"), (20, "impr"), (30, "para")]);
    assert_eq!(vm.snapshot().stack, vec![8]);
    assert_eq!(report.emitted, vec![8]);
}
