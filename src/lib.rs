#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod bitmap;
mod config;
mod error;
mod lease;
mod pool;
mod poolable;
mod wait;

pub use bitmap::*;
pub use config::*;
pub use error::*;
pub use lease::*;
pub use pool::{Pool, PoolStatus};
pub use poolable::*;
pub use wait::CancelToken;
