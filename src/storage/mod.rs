//!  Everything that touches the application directory.
//!   - History lives in a single JSON file written through [repository::FileTimestampRepository].
//!   - Reads and writes of that file are serialized by a [lock::LockProvider].
//!   - [instance::SingleInstanceGuard] keeps a second process away from the same directory.

pub mod error;
pub mod instance;
pub mod lock;
pub mod repository;
