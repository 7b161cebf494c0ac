//! TradieMate Billing API
//!
//! ## REST Endpoints
//!
//! - `POST /api/v1/usage/check` - Quota decision for an action
//! - `POST /api/v1/usage/enforce` - Quota decision, 403 on denial, 429 on burst limit
//! - `POST /api/v1/usage/increment` - Record an action after it committed
//! - `GET /api/v1/usage/{user_id}` - Usage summary for a period
//! - `GET /api/v1/subscription/{user_id}` - Subscription state for clients
//! - `GET /api/v1/tier-limits` - Tier policy table
//! - `POST /webhooks/stripe` - Stripe platform webhooks
//! - `POST /webhooks/stripe-connect` - Stripe Connect webhooks
//! - `POST /webhooks/revenuecat` - RevenueCat webhooks
//! - `POST /internal/recurring-invoices/run` - Recurring invoice generation
//! - `POST /internal/webhook-events/cleanup` - Retention cleanup
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod scheduler;
pub mod state;

pub use config::{Config, ConfigError, SchedulerConfig};
pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;
