//! Terminal stopwatch whose running total survives restarts, crashes and forced termination.
//! Time is kept as a list of start/stop intervals, written atomically to a JSON file in the
//! application directory, and only one process may use that directory at a time.
//!

pub mod cli;
pub mod storage;
pub mod timer;
pub mod utils;
