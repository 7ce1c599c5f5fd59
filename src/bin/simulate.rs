//! Command-line driver (C10): interactive and file-mode front ends over the
//! core simulator.
//!
//! Grounded on the teacher's `src/bin/emulate.rs` (`clap` derive `Args`,
//! `maybe_hex` value parser, single-step debug loop) and `src/bin/elf2trace.rs`
//! (the second binary target, image-file rather than ELF-only input). The
//! teacher's `rustyline` dependency is carried but never exercised in its own
//! source; this binary is where it finally gets used, for interactive-mode
//! prompting.

use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;
use log::error;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rv32i_sim::config::SimulatorConfig;
use rv32i_sim::elf_utils::read_text_instructions;
use rv32i_sim::error_sink::BoundedErrorSink;
use rv32i_sim::hart::Hart;
use rv32i_sim::step::{step, step_tolerant};

/// Simulate a 32-bit RISC-V (RV32I + Zicsr) program.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to a binary instruction image (a flat stream of little-endian
    /// 32-bit words) or, with --elf, an ELF executable's .text section.
    /// Omit to start an empty interactive session.
    input: Option<String>,

    /// Treat `input` as an ELF file and load its .text section.
    #[arg(long)]
    elf: bool,

    /// Prompt before executing each instruction instead of running to
    /// completion.
    #[arg(short, long)]
    interactive: bool,

    /// Keep running past an out-of-range instruction fetch instead of
    /// halting: the word reads as zero, and the fault is recorded.
    #[arg(long)]
    continue_on_fault: bool,

    /// Memory size in bytes.
    #[arg(long, value_parser=maybe_hex::<usize>, default_value_t = SimulatorConfig::default().memory_size)]
    memory_size: usize,

    /// Address the program is loaded at and the initial program counter.
    #[arg(long, value_parser=maybe_hex::<u32>, default_value_t = SimulatorConfig::default().origin)]
    origin: u32,

    /// Maximum number of error records retained before flushing.
    #[arg(long, default_value_t = SimulatorConfig::default().error_sink_capacity)]
    error_sink_capacity: usize,
}

fn load_instructions(args: &Args) -> Result<Vec<u32>, String> {
    let Some(input) = &args.input else {
        return Ok(Vec::new());
    };
    if args.elf {
        read_text_instructions(input).map_err(|e| e.to_string())
    } else {
        let bytes = std::fs::read(input).map_err(|e| e.to_string())?;
        Ok(bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes(w.try_into().unwrap()))
            .collect())
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = SimulatorConfig {
        memory_size: args.memory_size,
        error_sink_capacity: args.error_sink_capacity,
        origin: args.origin,
    };
    let instructions = load_instructions(&args)?;

    let mut hart = Hart::with_noop_environment(config.memory_size, config.origin);
    for (n, word) in instructions.iter().enumerate() {
        hart.memory
            .set(config.origin.wrapping_add(4 * n as u32), *word, 32)
            .map_err(|e| e.to_string())?;
    }

    let mut sink = BoundedErrorSink::new(config.error_sink_capacity);

    if args.interactive {
        run_interactive(&mut hart, &mut sink, args.continue_on_fault)
    } else {
        run_to_completion(&mut hart, &mut sink, args.continue_on_fault)
    }
}

fn run_one_step(
    hart: &mut Hart,
    sink: &mut BoundedErrorSink,
    continue_on_fault: bool,
) -> Result<(), String> {
    let result = if continue_on_fault {
        step_tolerant(hart, sink)
    } else {
        step(hart, sink)
    };
    result.map_err(|e| e.to_string())
}

fn run_to_completion(
    hart: &mut Hart,
    sink: &mut BoundedErrorSink,
    continue_on_fault: bool,
) -> Result<(), String> {
    loop {
        run_one_step(hart, sink, continue_on_fault)?;
    }
}

/// Each step prompts for one of two choices: an empty line (or `step`)
/// executes the instruction at the current PC, while a decimal or `0x`-
/// prefixed word overwrites it in memory without executing it. `quit` ends
/// the session.
fn run_interactive(
    hart: &mut Hart,
    sink: &mut BoundedErrorSink,
    continue_on_fault: bool,
) -> Result<(), String> {
    let mut editor = DefaultEditor::new().map_err(|e| e.to_string())?;
    loop {
        let prompt = format!("pc=0x{:08x}> ", hart.pc.current());
        match editor.readline(&prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                let command = line.trim();
                if command == "quit" {
                    return Ok(());
                }
                if command.is_empty() || command == "step" {
                    run_one_step(hart, sink, continue_on_fault)?;
                    continue;
                }
                match maybe_hex::<u32>(command) {
                    Ok(word) => {
                        hart.memory
                            .set(hart.pc.current(), word, 32)
                            .map_err(|e| e.to_string())?;
                    }
                    Err(_) => eprintln!(
                        "not an instruction word: {command} (enter a word to overwrite, \
                         or blank/`step` to execute, or `quit`)"
                    ),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
