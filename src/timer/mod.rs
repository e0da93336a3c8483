//! The stopwatch itself.
//!  - [intervals::IntervalStore] keeps accumulated time as a list of start/stop pairs.
//!  - [service::TimerService] applies start/stop/clear to the store, saves it after every change
//!    and checkpoints an open interval while the shell ticks.

pub mod intervals;
pub mod service;
