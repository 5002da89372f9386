use rawlist_common_traits::region_allocator::AllocError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn capacity_overflow(requested: usize, stride: usize) -> Error {
        Error(ErrorKind::CapacityOverflow { requested, stride }.into())
    }

    /// Returns the allocator failure behind this error, if any.
    pub fn alloc_error(&self) -> Option<&AllocError> {
        match self.kind() {
            ErrorKind::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    /// The requested element count does not fit in the address space.
    #[error("capacity overflow: {requested} elements of {stride} bytes")]
    CapacityOverflow { requested: usize, stride: usize },

    #[error(transparent)]
    Alloc(#[from] AllocError),
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<AllocError> for Error {
    fn from(e: AllocError) -> Self {
        ErrorKind::Alloc(e).into()
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e.into_kind() {
            ErrorKind::Alloc(e) => e.into(),
            other => std::io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::alloc::Layout;

    use rawlist_common_traits::region_allocator::AllocFailure;

    use super::*;

    #[test]
    fn test_capacity_overflow() {
        let e = Error::capacity_overflow(usize::MAX, 8);
        assert!(matches!(
            e.kind(),
            ErrorKind::CapacityOverflow { stride: 8, .. }
        ));
        assert_eq!(
            e.to_string(),
            format!("capacity overflow: {} elements of 8 bytes", usize::MAX)
        );
        assert!(e.alloc_error().is_none());
    }

    #[test]
    fn test_alloc_error_conversion() {
        let layout = Layout::from_size_align(128, 8).unwrap();
        let e: Error = AllocError::new(layout, AllocFailure::OutOfMemory).into();
        assert_eq!(e.alloc_error().map(|a| a.size()), Some(128));
        assert_eq!(
            e.to_string(),
            "failed to allocate 128 bytes (align 8): out of memory"
        );
        let io: std::io::Error = e.into();
        assert_eq!(io.kind(), std::io::ErrorKind::OutOfMemory);
    }

    #[test]
    fn test_invalid_arg() {
        let e = Error::invalid_arg("factor", "must be at least 2");
        assert_eq!(e.to_string(), "invalid argument factor: must be at least 2");
        match e.into_kind() {
            ErrorKind::InvalidArgument { name, .. } => assert_eq!(name, "factor"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
