//! Fulfillment Engine - order-fulfillment core for a food-delivery platform
//!
//! The engine turns a shopping cart into a priced, trackable order and
//! drives it through the customer / restaurant / courier lifecycle:
//!
//! - **Cart consolidation** (`carts`): merge equivalent line items, keep
//!   the subtotal consistent, abandon stale carts
//! - **Pricing** (`pricing`): deterministic item/cart/order totals
//! - **Order lifecycle** (`orders`): forward-only status machine with an
//!   append-only audit timeline
//! - **Dispatch** (`dispatch`): rank nearby couriers for assignment
//! - **Ratings** (`ratings`): review upserts and 1-decimal aggregates
//!
//! # Module Structure
//!
//! ```text
//! fulfillment-engine/src/
//! ├── carts/         # Cart consolidation service
//! ├── orders/        # Order lifecycle service
//! ├── dispatch/      # Courier matching
//! ├── ratings/       # Rating aggregation and reviews
//! ├── couriers/      # Courier account operations
//! ├── customers/     # Loyalty balance operations
//! ├── pricing/       # Pure price calculators
//! ├── store/         # Persistence boundary (trait + in-memory impl)
//! ├── clock.rs       # Injectable time source
//! ├── config.rs      # Engine tunables
//! ├── geo.rs         # Great-circle distance
//! └── telemetry.rs   # Logging setup
//! ```
//!
//! Persistence, authentication, notifications, and payment capture stay
//! outside; the engine only talks to the [`store::Store`] boundary.

pub mod carts;
pub mod clock;
pub mod config;
pub mod couriers;
pub mod customers;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod orders;
pub mod pricing;
pub mod ratings;
pub mod store;
pub mod telemetry;

// Re-exports
pub use carts::{AddItemInput, CartService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use couriers::{CourierService, DeliveryInput};
pub use customers::CustomerService;
pub use dispatch::{CourierCandidate, DeliveryMatcher};
pub use error::{EngineError, EngineResult};
pub use orders::{OrderCharges, OrderService, RatingInput};
pub use ratings::{RatingService, RatingStats, ReviewInput};
pub use store::{MemoryStore, Store, StoreError};
pub use telemetry::{init_logger, init_logger_with_file};
