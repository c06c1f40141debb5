//! Request construction: selections, filters, ordering and paging.

mod builder;
mod filter;
mod select;

pub use builder::{Method, NullPosition, Order, Ordering, QueryBuilder, RequestDescriptor};
pub use filter::{Filter, Operator};
pub use select::{Embed, SelectTree};
