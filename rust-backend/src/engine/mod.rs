// src/engine/mod.rs
//
// The Copier Engine (§4.3): owns the ACTIVE/STOPPED/PAUSED/ERROR state
// machine, the per-copier worker tasks, fan-out, scaling, and the risk gate.

pub mod copier_worker;
pub mod fanout;
pub mod position_tracker;
pub mod risk_gate;
pub mod scaling;
pub mod state_machine;
pub mod supervisor;

pub use fanout::FanoutContext;
pub use supervisor::Supervisor;
