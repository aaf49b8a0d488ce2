use shortbase_core::StorageError;
use thiserror::Error;

/// Failures while bringing a [`ConverterService`](crate::ConverterService) up.
#[derive(Debug, Clone, Error)]
pub enum StartupError {
    #[error("failed to bootstrap record store: {0}")]
    Bootstrap(#[source] StorageError),
    #[error(transparent)]
    Allocator(#[from] shortbase_allocator::Error),
}
