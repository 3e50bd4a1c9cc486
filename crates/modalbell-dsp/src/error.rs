/// Error type for engine creation and model loading.
///
/// Nothing in here is reachable once an engine is rendering: live mutation
/// ignores bad indices instead of failing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModalError {
    /// Dimensions or array shapes that cannot describe a model.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Buffer allocation failed while building a model or engine.
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// Model file content did not match the expected layout.
    #[error("parse error in `{section}`: {message}")]
    Parse {
        section: &'static str,
        message: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModalError>;

/// Allocate a zeroed buffer of `len` samples without aborting on failure.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ModalError::OutOfMemory {
            bytes: len.saturating_mul(std::mem::size_of::<f32>()),
        })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_zeroed_len() {
        let buf = try_zeroed(17).unwrap();
        assert_eq!(buf.len(), 17);
        assert!(buf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_try_zeroed_huge_fails() {
        match try_zeroed(usize::MAX / 2) {
            Err(ModalError::OutOfMemory { bytes }) => assert!(bytes > 0),
            other => panic!("expected OutOfMemory, got {other:?}"),
        }
    }
}
