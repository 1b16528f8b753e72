pub mod error;
pub mod result;
pub mod retry;
pub mod security;

pub use result::Result;
pub use retry::RetryPolicy;
