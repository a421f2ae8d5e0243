//! Customer loyalty operations

mod service;

pub use service::CustomerService;
