//! Structural error types for the optimizer.

/// Fatal structural errors raised while converting a procedure's stream.
///
/// These indicate a malformed input stream or an emitter bug; the optimizer
/// aborts the procedure and the caller decides whether to fall back to the
/// unoptimized stream. Internal invariant violations are not represented
/// here; those panic with block and item context.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgError {
    /// The same label name was defined twice
    DuplicateLabel { label: String, origin: String },
    /// A jump argument names a label that does not exist
    MissingJumpTarget { label: String, origin: String },
    /// A control-flow-splitting opcode is not the last instruction of its block
    MisplacedTerminator {
        opcode: String,
        block_id: u32,
        origin: String,
    },
}

impl std::fmt::Display for CfgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateLabel { label, origin } => {
                write!(f, "{origin}: duplicate label definition: {label}")
            }
            Self::MissingJumpTarget { label, origin } => {
                write!(f, "{origin}: jump references nonexistent label: {label}")
            }
            Self::MisplacedTerminator {
                opcode,
                block_id,
                origin,
            } => {
                write!(
                    f,
                    "{origin}: {opcode} is not the last instruction of block {block_id}"
                )
            }
        }
    }
}

impl std::error::Error for CfgError {}

/// Result type for CFG conversion
pub type CfgResult<T> = Result<T, CfgError>;
