//! Remote query service access: wire types, client seam, and query planning.

pub mod client;
mod planner;
mod types;

pub use client::{HttpQueryClient, QueryClient};
pub use planner::build_queries;
pub use types::{ChannelId, ChannelInfo, ChannelQuery, QueryError, RawRecord};
