//! Grocery list reconciliation: items added under the same normalized name
//! and unit are merged into one entry with the quantities summed.

pub mod quantity;
pub mod reconcile;

pub use quantity::{format_quantity, parse_quantity, Quantity};
pub use reconcile::{add_item, edit_collision, normalize_name, plan_merge, FamilyLocks, MergePlan, ReconcileStatus, Reconciled};
