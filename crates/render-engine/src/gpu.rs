//! GPU compositing probe.
//!
//! No GPU path ships yet; callers that request one fall back to the CPU
//! compositor.

use clipforge_common::{ClipforgeError, ClipforgeResult};

pub fn is_available() -> bool {
    false
}

pub fn initialize() -> ClipforgeResult<()> {
    Err(ClipforgeError::not_initialized("no GPU compositing backend available"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_common::ErrorCode;

    #[test]
    fn test_gpu_unavailable() {
        assert!(!is_available());
        assert_eq!(ErrorCode::of(&initialize()), ErrorCode::NotInitialized);
    }
}
