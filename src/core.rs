use std::io;

/// Process identifier, numbered like the host's `pid_t`.
pub type Pid = i32;

/// File descriptor number, numbered like the host's descriptors.
pub type Fd = i32;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Failures reported by the namespace model.
///
/// The variants mirror the `errno` classes a real kernel would report for the
/// same call, so a tracer can compare the model's verdict with what the traced
/// process actually saw.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A path component does not exist in its parent directory.
    #[error("no such file or directory")]
    NotFound,
    /// A component that has to be a directory is something else.
    #[error("not a directory")]
    NotADirectory,
    /// The final component of a creating call already names an entry.
    #[error("file exists")]
    AlreadyExists,
    /// Symlink dereferencing went past the configured bound.
    #[error("too many levels of symbolic links")]
    LoopDetected,
    /// The process handle table reached its configured ceiling.
    #[error("process handle table is full")]
    HandleExhausted,
    /// The descriptor is negative or not open for that process.
    #[error("bad file descriptor: {0}")]
    BadDescriptor(Fd),
    /// The call makes no sense for the entry, e.g. `readlink` on a directory.
    #[error("invalid argument")]
    InvalidInput,
}

impl From<ModelError> for io::Error {
    fn from(err: ModelError) -> Self {
        let kind = match err {
            ModelError::NotFound => io::ErrorKind::NotFound,
            ModelError::NotADirectory => io::ErrorKind::NotADirectory,
            ModelError::AlreadyExists => io::ErrorKind::AlreadyExists,
            ModelError::InvalidInput | ModelError::BadDescriptor(_) => io::ErrorKind::InvalidInput,
            ModelError::HandleExhausted => io::ErrorKind::OutOfMemory,
            ModelError::LoopDetected => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
