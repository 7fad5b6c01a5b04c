//! End-to-end programs.

use vole::{Cpu, CpuError, CpuState, Event, Recorder, StopReason};
use vole::cpu::MEMORY_SIZE;

#[test]
fn sum_and_store() {
    let mut cpu = Cpu::new();
    cpu.load_program(&["2005", "2103", "5201", "3200", "C000"]);

    let mut rec = Recorder::new();
    let executed = cpu.run_observed(&mut rec).unwrap();

    assert_eq!(executed, 5);
    assert_eq!(cpu.regs.get(0).unwrap(), 5);
    assert_eq!(cpu.regs.get(1).unwrap(), 3);
    assert_eq!(cpu.regs.get(2).unwrap(), 8);
    assert_eq!(cpu.mem.get(0).unwrap(), "08");
    assert!(cpu.is_halted());
    assert_eq!(cpu.pc, 4);

    let writes: Vec<_> = rec.events
        .iter()
        .filter(|e| matches!(e, Event::RegisterWrite { .. }))
        .collect();
    assert_eq!(writes, vec![
        &Event::RegisterWrite { index: 0, old: 0, new: 5 },
        &Event::RegisterWrite { index: 1, old: 0, new: 3 },
        &Event::RegisterWrite { index: 2, old: 0, new: 8 },
    ]);
}

#[test]
fn oversized_program_is_truncated() {
    let mut program: Vec<String> = (0..300).map(|_| "2001".to_string()).collect();
    program[255] = "C000".to_string();
    program[256] = "7777".to_string();

    let mut cpu = Cpu::new();
    assert_eq!(cpu.load_program(&program), MEMORY_SIZE);

    cpu.run().unwrap();
    assert_eq!(cpu.stop_reason(), Some(StopReason::Halt));
    assert_eq!(cpu.pc, 255);
}

#[test]
fn jump_to_zero_on_fresh_memory() {
    let mut cpu = Cpu::new();
    cpu.pc = 0x20;
    cpu.mem.set(0x20, "B000").unwrap();

    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0);
    assert!(cpu.is_running());

    // Fresh memory at 0 holds 0000, which stops the machine.
    cpu.step().unwrap();
    assert_eq!(cpu.state, CpuState::Halted(StopReason::UnrecognizedOpcode(0)));
}

#[test]
fn counting_loop_reaches_target() {
    let source = r#"
            LDI R1, 0
            LDI R2, 1
            LDI R3, 5
            JMP LOOP
            ORG 0x10
    LOOP:   ADD R1, R1, R2
            JEQ R1, R3, DONE
            JMP LOOP
            ORG 0x20
    DONE:   STORE R1, 0x40
            HALT
    "#;
    let words = vole::assemble(source).unwrap();
    assert_eq!(&words[0x10..0x13], &["5112", "B123", "B010"]);

    let mut cpu = Cpu::new();
    cpu.load_program(&words);

    cpu.run().unwrap();
    assert_eq!(cpu.stop_reason(), Some(StopReason::Halt));
    assert_eq!(cpu.regs.get(1).unwrap(), 5);
    assert_eq!(cpu.mem.get(0x40).unwrap(), "05");
}

#[test]
fn store_then_fetch_data_cell() {
    // Storing into the next instruction's cell turns it into a two-digit
    // data word, which then fetches as opcode 0.
    let mut cpu = Cpu::new();
    cpu.load_program(&["2007", "3002", "C000"]);

    cpu.run().unwrap();
    assert_eq!(cpu.mem.get(2).unwrap(), "07");
    assert_eq!(cpu.stop_reason(), Some(StopReason::UnrecognizedOpcode(0)));
}

#[test]
fn malformed_cell_aborts_run() {
    let mut cpu = Cpu::new();
    cpu.load_program(&["2001", "1105", "C000", "0000", "0000", "nope"]);

    let err = cpu.run().unwrap_err();
    assert_eq!(err, CpuError::Parse { text: "nope".into() });
    assert_eq!(cpu.stop_reason(), Some(StopReason::Fault));
    assert_eq!(cpu.pc, 1);
}

#[test]
fn reload_after_halt_runs_again() {
    let mut cpu = Cpu::new();
    cpu.load_program(&["C000"]);
    cpu.run().unwrap();

    cpu.load_program(&["2A2A", "C000"]);
    cpu.run().unwrap();

    assert_eq!(cpu.regs.get(0xA).unwrap(), 0x2A);
    assert_eq!(cpu.cycles, 3);
}

#[test]
fn snapshot_serializes() {
    let mut cpu = Cpu::new();
    cpu.load_program(&["2005", "C000"]);
    cpu.run().unwrap();

    let json = serde_json::to_value(cpu.snapshot()).unwrap();
    assert_eq!(json["program_counter"], 1);
    assert_eq!(json["instruction_register"], "C000");
    assert_eq!(json["registers"][0], "05");
    assert_eq!(json["memory"][0], "2005");
}

#[test]
fn program_file_runs() {
    let path = std::env::temp_dir().join(format!("vole-scenario-{}.txt", std::process::id()));
    std::fs::write(&path, "; add\n2005\n2103\n\n5201\n3200\nC000\n").unwrap();

    let words = vole::load_program(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut cpu = Cpu::new();
    cpu.load_program(&words);
    cpu.run().unwrap();
    assert_eq!(cpu.regs.get(2).unwrap(), 8);
    assert_eq!(cpu.mem.get(0).unwrap(), "08");
}
