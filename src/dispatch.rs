//! Query dispatch covering the caller facade, the routing loop, pool slot
//! supervision, and fan-out/fan-in aggregation state.

pub mod dispatcher;
pub mod pool;
pub mod query;
pub mod routing;

pub use dispatcher::Dispatcher;
pub use query::{LookupQuery, ServiceResponse};
