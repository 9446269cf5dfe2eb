use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::database::models::{GroceryItem, GroceryItemChanges, NewGroceryItem};
use crate::database::{Store, StoreResult};

use super::quantity::{format_quantity, parse_quantity};

/// Case-folded name with all whitespace removed: `" Green  Beans "` → `"greenbeans"`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// What to do with an incoming grocery item.
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    /// Rewrite the quantity of an existing item in place
    Merge { id: i64, quantity: String },
    /// No compatible item: insert as given
    Insert,
}

/// Decide merge-or-insert against the family's current items.
///
/// The first item (in the given order) whose normalized name and parsed unit
/// both equal the incoming ones wins; quantities add without unit conversion.
pub fn plan_merge(existing: &[GroceryItem], name: &str, quantity: &str) -> MergePlan {
    let key = normalize_name(name);
    let incoming = parse_quantity(quantity);

    existing
        .iter()
        .find_map(|item| {
            if normalize_name(&item.name) != key {
                return None;
            }
            let current = parse_quantity(&item.quantity);
            let total = current.value + incoming.value;
            // An overflowing sum would be stored as "inf <unit>" and lose its key
            (current.unit == incoming.unit && total.is_finite()).then(|| MergePlan::Merge {
                id: item.id,
                quantity: format_quantity(total, &incoming.unit),
            })
        })
        .unwrap_or(MergePlan::Insert)
}

/// Another item in `existing` that an edit of `id` to `name` and `quantity`
/// would duplicate, by normalized name and parsed unit.
pub fn edit_collision(existing: &[GroceryItem], id: i64, name: &str, quantity: &str) -> Option<i64> {
    let key = normalize_name(name);
    let unit = parse_quantity(quantity).unit;
    existing
        .iter()
        .find(|item| item.id != id && normalize_name(&item.name) == key && parse_quantity(&item.quantity).unit == unit)
        .map(|item| item.id)
}

/// Result of a reconciled insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Created(GroceryItem),
    Updated(GroceryItem),
}

impl Reconciled {
    pub fn status(&self) -> ReconcileStatus {
        match self {
            Reconciled::Created(_) => ReconcileStatus::Created,
            Reconciled::Updated(_) => ReconcileStatus::Updated,
        }
    }

    pub fn item(&self) -> &GroceryItem {
        match self {
            Reconciled::Created(item) | Reconciled::Updated(item) => item,
        }
    }

    pub fn into_item(self) -> GroceryItem {
        match self {
            Reconciled::Created(item) | Reconciled::Updated(item) => item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    Created,
    Updated,
}

/// Serializes grocery inserts per family so scan-then-write cannot race
/// within this process. Concurrent identical additions both aggregate.
#[derive(Debug, Default, Clone)]
pub struct FamilyLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl FamilyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, family_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(family_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Add an item to a family's list, merging into a matching item when one exists.
pub async fn add_item(store: &dyn Store, locks: &FamilyLocks, item: NewGroceryItem) -> StoreResult<Reconciled> {
    let _guard = locks.acquire(item.family_id).await;

    let existing = store.list_grocery_items(item.family_id).await?;
    match plan_merge(&existing, &item.name, &item.quantity) {
        MergePlan::Merge { id, quantity } => {
            let changes = GroceryItemChanges {
                quantity: Some(quantity),
                ..Default::default()
            };
            match store.update_grocery_item(id, changes).await? {
                Some(updated) => {
                    debug!("Merged grocery item {} for family {}", id, item.family_id);
                    Ok(Reconciled::Updated(updated))
                }
                // Deleted between scan and update (another process); insert instead
                None => Ok(Reconciled::Created(store.create_grocery_item(item).await?)),
            }
        }
        MergePlan::Insert => {
            let created = store.create_grocery_item(item).await?;
            debug!("Created grocery item {} for family {}", created.id, created.family_id);
            Ok(Reconciled::Created(created))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn item(id: i64, name: &str, quantity: &str) -> GroceryItem {
        GroceryItem {
            id,
            name: name.to_string(),
            quantity: quantity.to_string(),
            category: "Other".to_string(),
            is_completed: false,
            family_id: 1,
        }
    }

    fn new_item(family_id: i64, name: &str, quantity: &str) -> NewGroceryItem {
        NewGroceryItem {
            name: name.to_string(),
            quantity: quantity.to_string(),
            category: "Dairy".to_string(),
            is_completed: false,
            family_id,
        }
    }

    #[test]
    fn normalizes_case_and_spaces() {
        assert_eq!(normalize_name("  Green  Beans "), "greenbeans");
        assert_eq!(normalize_name("MILK"), "milk");
        assert_eq!(normalize_name("pea\tnuts"), "peanuts");
    }

    #[test]
    fn merges_same_name_and_unit() {
        let existing = [item(1, "Milk", "1 gal")];
        assert_eq!(
            plan_merge(&existing, "milk", "2 gal"),
            MergePlan::Merge { id: 1, quantity: "3.0 gal".to_string() }
        );
    }

    #[test]
    fn different_units_never_merge() {
        let existing = [item(1, "Milk", "1 gal")];
        assert_eq!(plan_merge(&existing, "Milk", "1 L"), MergePlan::Insert);
        assert_eq!(plan_merge(&existing, "Milk", "2"), MergePlan::Insert);
    }

    #[test]
    fn unitless_quantities_merge() {
        let existing = [item(4, "Eggs", "6")];
        assert_eq!(
            plan_merge(&existing, "eggs", "6"),
            MergePlan::Merge { id: 4, quantity: "12.0".to_string() }
        );
    }

    #[test]
    fn empty_quantities_merge_to_empty() {
        let existing = [item(2, "Bread", "")];
        assert_eq!(
            plan_merge(&existing, "bread", ""),
            MergePlan::Merge { id: 2, quantity: String::new() }
        );
    }

    #[test]
    fn word_units_merge_by_text() {
        let existing = [item(3, "Eggs", "dozen")];
        assert_eq!(
            plan_merge(&existing, "Eggs", "Dozen"),
            MergePlan::Merge { id: 3, quantity: "0.0 dozen".to_string() }
        );
    }

    #[test]
    fn first_compatible_item_wins() {
        let existing = [item(1, "Apples", "3 kg"), item(2, "apples", "2 lbs"), item(3, "APPLES", "1 lbs")];
        assert_eq!(
            plan_merge(&existing, "apples", "1 lbs"),
            MergePlan::Merge { id: 2, quantity: "3.0 lbs".to_string() }
        );
    }

    #[test]
    fn internal_spaces_ignored_for_matching() {
        let existing = [item(9, "Ice Cream", "1 tub")];
        assert!(matches!(plan_merge(&existing, "icecream", "1 tub"), MergePlan::Merge { id: 9, .. }));
    }

    #[test]
    fn oversized_numbers_do_not_merge_into_inf() {
        let existing = [item(1, "Milk", "1 gal")];
        let huge = format!("{} gal", "9".repeat(400));
        assert_eq!(plan_merge(&existing, "Milk", &huge), MergePlan::Insert);

        // Each side is finite but the sum is not
        let near_max = format!("{} gal", "9".repeat(308));
        let existing = [item(2, "Milk", &near_max)];
        assert_eq!(plan_merge(&existing, "Milk", &near_max), MergePlan::Insert);
        assert!(matches!(plan_merge(&existing, "Milk", "1 gal"), MergePlan::Merge { id: 2, .. }));
    }

    #[test]
    fn edits_that_duplicate_another_item_collide() {
        let existing = [item(1, "Milk", "1 gal"), item(2, "Oat Milk", "2 L"), item(3, "Milk", "1 L")];
        assert_eq!(edit_collision(&existing, 2, "milk", "2 gal"), Some(1));
        assert_eq!(edit_collision(&existing, 3, "Milk", "4 gal"), Some(1));
        assert_eq!(edit_collision(&existing, 1, "MILK", "5 gal"), None);
        assert_eq!(edit_collision(&existing, 2, "Oat Milk", "3 L"), None);
        assert_eq!(edit_collision(&existing, 3, "Milk", "2 cups"), None);
    }

    #[tokio::test]
    async fn add_item_creates_then_updates() {
        let store = MemoryStore::new();
        let locks = FamilyLocks::new();

        let first = add_item(&store, &locks, new_item(1, "Milk", "1 gal")).await.unwrap();
        assert_eq!(first.status(), ReconcileStatus::Created);

        let second = add_item(&store, &locks, new_item(1, "milk", "2 gal")).await.unwrap();
        assert_eq!(second.status(), ReconcileStatus::Updated);
        assert_eq!(second.item().id, first.item().id);
        assert_eq!(second.item().name, "Milk");
        assert_eq!(second.item().quantity, "3.0 gal");
        assert_eq!(second.item().category, "Dairy");

        let items = store.list_grocery_items(1).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn families_do_not_share_items() {
        let store = MemoryStore::new();
        let locks = FamilyLocks::new();

        add_item(&store, &locks, new_item(1, "Milk", "1 gal")).await.unwrap();
        let other = add_item(&store, &locks, new_item(2, "Milk", "1 gal")).await.unwrap();

        assert_eq!(other.status(), ReconcileStatus::Created);
        assert_eq!(other.into_item().quantity, "1 gal");
    }

    #[tokio::test]
    async fn concurrent_identical_adds_aggregate() {
        let store = Arc::new(MemoryStore::new());
        let locks = FamilyLocks::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                add_item(store.as_ref(), &locks, new_item(5, "Rice", "1 kg")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let items = store.list_grocery_items(5).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, "8.0 kg");
    }
}
