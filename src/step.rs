//! The fetch-decode-dispatch-execute-increment cycle tying C4-C8 together.
//!
//! Grounded on the teacher's `Platform::step()`/`execute()` split (fetch and
//! execute can fault; the PC only advances once both succeed) and its
//! `--debug` single-step printer, generalized here into `log::trace!`/`warn!`
//! calls per §6.1 rather than a `println!` gated behind a CLI flag.

use log::{trace, warn};
use thiserror::Error;

use crate::decode::{decode, DecodeError};
use crate::dispatch::{dispatch, DispatchError};
use crate::error_sink::{ErrorRecord, ErrorSink};
use crate::exec::ExecutionFault;
use crate::hart::Hart;
use crate::memory::{MemoryFault, PanickingMemory};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("could not fetch instruction: {0}")]
    Fetch(#[from] MemoryFault),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Execution(#[from] ExecutionFault),
}

impl StepError {
    fn code(&self) -> &'static str {
        match self {
            StepError::Fetch(_) => "fetch_fault",
            StepError::Decode(_) => "decode_error",
            StepError::Dispatch(_) => "dispatch_error",
            StepError::Execution(_) => "execution_fault",
        }
    }
}

/// Run exactly one fetch-decode-dispatch-execute-increment cycle. Any fault
/// is recorded to `sink` before being returned — the core never swallows a
/// fault silently, per §7.
pub fn step(hart: &mut Hart, sink: &mut dyn ErrorSink) -> Result<(), StepError> {
    let pc = hart.pc.current();
    let result = run_step(hart);
    match &result {
        Ok(()) => trace!("executed instruction at pc=0x{pc:08x}"),
        Err(err) => {
            warn!("fault at pc=0x{pc:08x}: {err}");
            sink.record(ErrorRecord {
                code: err.code(),
                message: err.to_string(),
            });
        }
    }
    result
}

fn run_step(hart: &mut Hart) -> Result<(), StepError> {
    let word = hart.memory.get(hart.pc.current())?;
    run_decoded(hart, word)
}

/// Like `step`, but an out-of-range instruction fetch does not end the run:
/// the word is read as zero through `PanickingMemory` (recorded to `sink`)
/// and execution proceeds from there, rather than halting. A fault raised by
/// the instruction's own execution (e.g. an out-of-range load/store) is still
/// fatal — substituting its result would change the instruction's
/// architectural effect, not just the fetch that preceded it.
pub fn step_tolerant(hart: &mut Hart, sink: &mut dyn ErrorSink) -> Result<(), StepError> {
    let pc = hart.pc.current();
    let word = PanickingMemory::new(&mut hart.memory, sink).get(pc);
    let result = run_decoded(hart, word);
    match &result {
        Ok(()) => trace!("executed instruction at pc=0x{pc:08x}"),
        Err(err) => {
            warn!("fault at pc=0x{pc:08x}: {err}");
            sink.record(ErrorRecord {
                code: err.code(),
                message: err.to_string(),
            });
        }
    }
    result
}

fn run_decoded(hart: &mut Hart, word: u32) -> Result<(), StepError> {
    let instr = decode(word)?;
    let exec = dispatch(hart, instr)?;
    exec()?;
    hart.pc.increment();
    Ok(())
}
