//! Vole Emulator - CLI Entry Point
//!
//! Commands:
//! - `vole-emu run <program>` - Run a program file or ASM source
//! - `vole-emu enter` - Type a program word by word, then run it
//! - `vole-emu debug <program>` - Interactive debugger
//! - `vole-emu asm <source>` - Assemble to a program file
//! - `vole-emu disasm <program>` - Disassemble a program file
//! - `vole-emu` - Interactive menu

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use vole::{Cpu, CpuError, EntrySession};
use vole::asm::Entry;

/// Step limit used when none is given.
const DEFAULT_MAX_STEPS: u64 = 10_000;

#[derive(Parser)]
#[command(name = "vole-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the Vole teaching machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program file (one word per line) or .asm source
        program: String,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Enter a program word by word (end with C000), then run it
    Enter {
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the program file or .asm source
        program: String,
    },
    /// Assemble source to a program file
    Asm {
        /// Path to the source file
        source: String,
        /// Output program file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a program file to readable text
    Disasm {
        /// Path to the program file
        program: String,
    },
}

#[derive(clap::Args)]
struct RunOptions {
    /// Maximum number of steps to run
    #[arg(short, long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,
    /// Log every register and memory write
    #[arg(short, long)]
    trace: bool,
    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let trace = match &cli.command {
        Some(Commands::Run { opts, .. }) | Some(Commands::Enter { opts }) => opts.trace,
        _ => false,
    };
    init_logging(trace);

    match cli.command {
        Some(Commands::Run { program, opts }) => {
            let words = read_program_or_exit(&program);
            run_program(&words, &opts);
        }
        Some(Commands::Enter { opts }) => {
            let stdin = io::stdin();
            let words = enter_program(&mut stdin.lock());
            run_program(&words, &opts);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        None => {
            menu();
        }
    }
}

fn init_logging(trace: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    if trace {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.format_timestamp(None).init();
}

/// Read program words from a program file, assembling `.asm` sources.
fn read_program(path: &str) -> Result<Vec<String>, String> {
    if path.ends_with(".asm") {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read file: {}", e))?;
        let words = vole::assemble(&source)
            .map_err(|e| format!("Assembly error: {}", e))?;
        println!("📝 Assembled {} words", words.len());
        Ok(words)
    } else {
        let words = vole::load_program(path)
            .map_err(|e| format!("Failed to load program: {}", e))?;
        println!("📂 Loaded {} words", words.len());
        Ok(words)
    }
}

fn read_program_or_exit(path: &str) -> Vec<String> {
    match read_program(path) {
        Ok(words) if !words.is_empty() => words,
        Ok(_) => {
            eprintln!("❌ No instructions to execute");
            std::process::exit(1);
        }
        Err(message) => {
            eprintln!("❌ {}", message);
            std::process::exit(1);
        }
    }
}

/// Read words until `C000` or end of input.
fn enter_program(input: &mut impl BufRead) -> Vec<String> {
    let mut session = EntrySession::new();
    println!("Enter instructions (type 'C000' to end):");

    loop {
        print!("Instruction: ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        match session.push(&line) {
            Ok(Entry::Accepted) => {}
            Ok(Entry::Finished) => break,
            Err(e) => eprintln!("{}. Please enter a valid instruction.", e),
        }
    }

    session.into_words()
}

fn run_program(words: &[String], opts: &RunOptions) {
    let mut cpu = Cpu::new();
    cpu.load_program(words);
    run_loaded(&mut cpu, opts.max_steps, opts.json);
}

fn run_loaded(cpu: &mut Cpu, max_steps: u64, json: bool) {
    let result = cpu.run_limited(max_steps);

    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("❌ Failed to encode state: {}", e),
        }
    } else {
        println!();
        println!("{}", cpu.snapshot());
    }

    match result {
        Ok(_) if cpu.is_running() => {
            println!();
            println!("⚠️  Reached step limit ({}). Use --max-steps to increase.", max_steps);
        }
        Ok(_) => {}
        Err(e) => report_fault(cpu, &e),
    }
}

fn report_fault(cpu: &Cpu, error: &CpuError) {
    eprintln!("❌ CPU error at PC={:02X}: {}", cpu.pc, error);
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    let words = read_program_or_exit(path);

    println!("🚀 Launching debugger...");

    if let Err(e) = vole::run_debugger(words) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

/// Where `asm` writes when no `--output` is given: the source path with a
/// `.vole` extension. `None` if that would be the source itself.
fn default_output_path(source_path: &str) -> Option<PathBuf> {
    let source = Path::new(source_path);
    let out = source.with_extension("vole");
    (out != source).then_some(out)
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = match output.map(PathBuf::from).or_else(|| default_output_path(source_path)) {
        Some(path) if path != Path::new(source_path) => path,
        _ => {
            eprintln!("❌ Refusing to overwrite {}; pass --output", source_path);
            std::process::exit(1);
        }
    };

    println!("📝 Assembling: {} → {}", source_path, out_path.display());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let words = match vole::assemble(&source) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} words", words.len());

    if let Err(e) = vole::save_program(&out_path, &words) {
        eprintln!("❌ Failed to save program: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

fn disassemble_file(path: &str) {
    let words = match vole::load_program(path) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", vole::disassemble(&words));
}

/// The interactive menu: load and run programs, inspect the machine.
fn menu() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut cpu = Cpu::new();

    println!("Vole Emulator v0.1.0");

    loop {
        println!();
        println!("1. Choose Input Method (File or Instructions)");
        println!("2. Display State");
        println!("3. Exit");

        let Some(choice) = prompt(&mut input, "Enter your choice: ") else {
            return;
        };

        match choice.as_str() {
            "1" => {
                println!();
                println!("Choose input method:");
                println!("1. Input from file");
                println!("2. Input from instructions");
                let Some(method) = prompt(&mut input, "Enter your choice (1 or 2): ") else {
                    return;
                };

                let words = match method.as_str() {
                    "1" => {
                        let Some(path) = prompt(&mut input, "Enter filename: ") else {
                            return;
                        };
                        match read_program(&path) {
                            Ok(words) => words,
                            Err(message) => {
                                eprintln!("❌ {}", message);
                                continue;
                            }
                        }
                    }
                    "2" => enter_program(&mut input),
                    _ => {
                        eprintln!("Invalid choice");
                        continue;
                    }
                };

                cpu.load_program(&words);
                run_loaded(&mut cpu, DEFAULT_MAX_STEPS, false);
            }
            "2" => {
                println!();
                println!("{}", cpu.snapshot());
            }
            "3" => return,
            _ => eprintln!("Invalid choice!"),
        }
    }
}

/// Print a prompt and read one trimmed line. `None` at end of input.
fn prompt(input: &mut impl BufRead, text: &str) -> Option<String> {
    print!("{}", text);
    io::stdout().flush().ok();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}
