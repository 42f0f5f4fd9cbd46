pub mod aggregate;
pub mod matcher;

pub use aggregate::{scan_aggregate, split_frontmatter, AggregateScan};
pub use matcher::{checked_item, split_backlink, strip_countdown, unchecked_item, unchecked_items};
