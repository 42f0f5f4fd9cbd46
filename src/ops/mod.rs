pub mod collect;
pub mod format;
pub mod order_ops;
pub mod reconcile;
