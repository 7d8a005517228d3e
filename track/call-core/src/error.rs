//! The core's only fallible operation: allocating a new `Call`.
//! Every other operation is documented to silently no-op rather than
//! return an error — see `state.rs` and `call.rs` for where that
//! philosophy shows up in practice.

#[derive(Debug, thiserror::Error)]
pub enum CallCreateError {
    #[error("failed to allocate storage for a new call")]
    OutOfMemory,
}
