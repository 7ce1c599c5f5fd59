//! Simulator construction parameters (ambient stack, §6.2).
//!
//! Grounded on the teacher's `src/bin/emulate.rs` `Args` struct, which
//! exposes the same knobs as CLI flags; this type is the core-side
//! counterpart the CLI builds from parsed arguments.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub memory_size: usize,
    pub error_sink_capacity: usize,
    pub origin: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            memory_size: 256 * 1024,
            error_sink_capacity: 256,
            origin: 0,
        }
    }
}
