//! Debugger application state and logic.

use crate::Cpu;
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::{Event, Recorder, MEMORY_SIZE};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<String>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
    /// Events produced by the most recent step.
    pub events: Recorder,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<String>) -> Self {
        let mut cpu = Cpu::new();
        cpu.load_program(&program);

        Self {
            cpu,
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            events: Recorder::new(),
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU halted: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.pc;
        self.events.clear();
        match self.cpu.step_observed(&mut self.events) {
            Ok(Some(_)) => {
                let word = format!("{:04X}", self.cpu.ir);
                self.status = format!("PC={:02X}: {}", pc, disassemble_instruction(&word));
            }
            Ok(None) => {
                self.status = format!("PC={:02X}: unrecognized opcode, halted", pc);
                self.running = false;
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Halted after {} steps", self.cpu.cycles);
            return;
        }

        self.step();

        // Check for breakpoint
        let pc = self.cpu.pc;
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.cpu.load_program(&self.program);
        self.events.clear();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Get disassembly around current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let pc = self.cpu.pc;
        let start = pc.saturating_sub(lines / 2);

        self.cpu.mem
            .dump(start, lines)
            .into_iter()
            .map(|(addr, word)| (addr, disassemble_instruction(word), addr == pc))
            .collect()
    }

    /// Scroll the memory view, staying within memory.
    pub fn scroll_memory(&mut self, delta: isize) {
        let max = MEMORY_SIZE - 1;
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max);
    }

    /// Human-readable lines for the events of the last step.
    pub fn event_lines(&self) -> Vec<String> {
        self.events.events.iter().map(describe_event).collect()
    }
}

fn describe_event(event: &Event) -> String {
    match event {
        Event::Fetch { pc, word } => format!("fetch [{:02X}] = {:04X}", pc, word),
        Event::RegisterWrite { index, old, new } => {
            format!("R{:X}: {:02x} -> {:02x}", index, old, new)
        }
        Event::MemoryWrite { address, old, new } => {
            format!("[{:02X}]: {} -> {}", address, old, new)
        }
        Event::Jump { target } => format!("jump to {:02X}", target),
        Event::CompareJump { a, b, target, taken: true } => {
            format!("R{:X} == R{:X}, jump to {:02X}", a, b, target)
        }
        Event::CompareJump { a, b, taken: false, .. } => {
            format!("R{:X} != R{:X}, no jump", a, b)
        }
        Event::ZeroSum { dest } => format!("warning: R{:X} sum is zero", dest),
        Event::Halt { pc } => format!("HALT at {:02X}", pc),
        Event::UnrecognizedOpcode { pc, opcode } => {
            format!("unrecognized opcode {:X} at {:02X}", opcode, pc)
        }
    }
}

/// Runs `restore` when dropped, so the terminal is put back on every exit
/// path out of the debugger, errors and panics included.
struct TerminalGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// Apply one key press to the debugger.
fn handle_key(app: &mut DebuggerApp, code: crossterm::event::KeyCode) {
    use crossterm::event::KeyCode;

    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('s') => {
            app.running = false;
            app.step();
        }
        KeyCode::Char('r') => app.run(),
        KeyCode::Char('p') => {
            app.running = false;
            app.status = "Paused.".into();
        }
        KeyCode::Char('b') => app.toggle_breakpoint(),
        KeyCode::Char('x') => app.reset(),
        KeyCode::Up => app.scroll_memory(-1),
        KeyCode::Down => app.scroll_memory(1),
        _ => {}
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<String>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    let _guard = TerminalGuard {
        restore: || {
            // Nothing useful can be done if restoring fails.
            let _ = disable_raw_mode();
            let _ = stdout().execute(LeaveAlternateScreen);
        },
    };
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(program);

    // Main loop
    while !app.should_quit {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code);
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(words: &[&str]) -> DebuggerApp {
        DebuggerApp::new(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_step_reports_instruction() {
        let mut app = app(&["2005", "C000"]);
        app.step();

        assert_eq!(app.status, "PC=00: LDI R0, 0x05");
        assert_eq!(app.event_lines(), vec!["fetch [00] = 2005", "R0: 00 -> 05"]);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app(&["2001", "2002", "2003", "C000"]);
        app.cpu.pc = 0;
        app.breakpoints.insert(2);

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.cpu.pc, 2);
        assert!(app.status.starts_with("Breakpoint"));
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = app(&["2005", "3000", "C000"]);
        app.step();
        app.step();
        app.reset();

        assert_eq!(app.cpu.mem.get(0).unwrap(), "2005");
        assert_eq!(app.cpu.regs.get(0).unwrap(), 0);
        assert!(app.cpu.is_running());
    }

    #[test]
    fn test_disassembly_window() {
        let app = app(&["2005", "C000"]);
        let lines = app.get_disassembly(4);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], (0, "LDI R0, 0x05".to_string(), true));
    }

    #[test]
    fn test_guard_restores_on_error() {
        use std::cell::Cell;

        fn failing_session(restored: &Cell<bool>) -> std::io::Result<()> {
            let _guard = TerminalGuard { restore: || restored.set(true) };
            Err(std::io::Error::other("draw failed"))
        }

        let restored = Cell::new(false);
        assert!(failing_session(&restored).is_err());
        assert!(restored.get());
    }

    #[test]
    fn test_handle_key() {
        use crossterm::event::KeyCode;

        let mut app = app(&["2005", "C000"]);
        handle_key(&mut app, KeyCode::Char('s'));
        assert_eq!(app.cpu.pc, 1);

        handle_key(&mut app, KeyCode::Char('b'));
        assert!(app.breakpoints.contains(&1));

        handle_key(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
