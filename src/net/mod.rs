//! Socket primitives: addresses and owned descriptors.

mod endpoint;
mod handle;

pub use endpoint::Endpoint;
pub use handle::ConnectionHandle;
