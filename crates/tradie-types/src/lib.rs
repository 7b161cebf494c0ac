//! Tradie Types - Shared domain types
//!
//! This crate contains domain types used across the TradieMate billing core:
//! - User identity
//! - Subscription tiers and the tier policy table
//! - Usage types and monthly periods
//! - Invoice and recurring-interval types
//! - Webhook sources and processing results

pub mod error;
pub mod invoice;
pub mod limits;
pub mod subscription;
pub mod tier;
pub mod usage;
pub mod user;
pub mod webhook;

pub use error::*;
pub use invoice::*;
pub use limits::*;
pub use subscription::*;
pub use tier::*;
pub use usage::*;
pub use user::*;
pub use webhook::*;
