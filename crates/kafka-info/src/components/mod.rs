//! Card UI components
//!
//! 1. **Primitives** (`primitives.rs`) - skeleton rows, error/empty states,
//!    badges, lag indicator, card container
//! 2. **Parts** (`topic_table.rs`, `cluster_select.rs`) - the lag table and
//!    the cluster picker
//! 3. **Card** (`kafka_info.rs`) - fetch state and layout

pub mod cluster_select;
pub mod kafka_info;
pub mod primitives;
pub mod topic_table;

pub use cluster_select::ClusterSelect;
pub use kafka_info::KafkaInfoCard;
pub use primitives::{Badge, BadgeVariant, EmptyState, ErrorState, LagIndicator, TableCard};
pub use topic_table::{Pager, TopicTable, TopicTableSkeleton};
