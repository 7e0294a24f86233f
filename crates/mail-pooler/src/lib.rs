//! Rate-limited dispatch pooling for outbound mail.
//!
//! A [`Pooler`] binds a [`throttle_window::WindowCounter`] to a
//! [`Transport`]: every send is admitted by the counter before it reaches
//! the transport, so no more than the configured number of messages leave
//! within each window. Poolers are cheap to duplicate; parallel workers
//! take their own duplicate and get a fresh quota plus an independent
//! transport handle.
pub mod config;
pub mod memory;
pub mod pooler;
pub mod transport;

pub use config::*;
pub use pooler::*;
pub use transport::*;
