//! REST API handlers

pub mod health;
pub mod internal;
pub mod shared;
pub mod subscription;
pub mod usage;
pub mod webhook;

pub use health::*;
pub use internal::*;
pub use subscription::*;
pub use usage::*;
pub use webhook::*;
