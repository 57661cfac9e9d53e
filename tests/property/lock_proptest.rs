//! Property-based tests for the action lock table

use basket_sync::client::ActionLockTable;
use basket_sync::shared::{ActionKind, EntityId};
use proptest::prelude::*;
use std::collections::HashSet;

fn action_kind() -> impl Strategy<Value = ActionKind> {
    prop_oneof![
        Just(ActionKind::Insert),
        Just(ActionKind::Update),
        Just(ActionKind::Delete),
    ]
}

proptest! {
    #[test]
    fn test_table_matches_set_of_blocked_pairs(
        ops in prop::collection::vec((any::<bool>(), 1..6i64, action_kind()), 0..50),
    ) {
        let mut table = ActionLockTable::new();
        let mut model: HashSet<(EntityId, ActionKind)> = HashSet::new();

        for (block, id, kind) in ops {
            if block {
                table.block_action(id, kind);
                model.insert((id, kind));
            } else {
                table.release_action(id, kind);
                model.remove(&(id, kind));
            }

            let ids: HashSet<EntityId> = model.iter().map(|(id, _)| *id).collect();
            prop_assert_eq!(table.len(), ids.len());
            for id in 1..6i64 {
                prop_assert_eq!(table.contains(id), ids.contains(&id));
            }
        }

        for (id, kind) in model.clone() {
            table.release_action(id, kind);
        }
        prop_assert!(table.is_empty());
    }

    #[test]
    fn test_block_then_release_leaves_no_entry(id in any::<i64>(), kind in action_kind()) {
        let mut table = ActionLockTable::new();
        table.block_action(id, kind);
        prop_assert!(table.is_action_blocked(id, kind));

        table.release_action(id, kind);
        prop_assert!(!table.contains(id));
        prop_assert!(!table.is_action_blocked(id, kind));
    }

    #[test]
    fn test_pending_insert_blocks_ids_without_entry(
        provisional in 1..1000i64,
        other in 1000..2000i64,
        kind in action_kind(),
    ) {
        let mut table = ActionLockTable::new();
        table.block_action(provisional, ActionKind::Insert);

        prop_assert!(table.is_action_blocked(other, kind));

        table.release_action(provisional, ActionKind::Insert);
        prop_assert!(!table.is_action_blocked(other, kind));
    }

    #[test]
    fn test_entry_of_own_overrides_pending_insert(
        provisional in 1..1000i64,
        other in 1000..2000i64,
    ) {
        let mut table = ActionLockTable::new();
        table.block_action(provisional, ActionKind::Insert);
        table.block_action(other, ActionKind::Delete);

        prop_assert!(table.is_action_blocked(other, ActionKind::Delete));
        prop_assert!(!table.is_action_blocked(other, ActionKind::Insert));
        prop_assert!(!table.is_action_blocked(other, ActionKind::Update));
    }
}
