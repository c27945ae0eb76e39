//! Order module - the slice of the order lifecycle payments interact with.

mod aggregate;
mod status;

pub use aggregate::Order;
pub use status::OrderStatus;
