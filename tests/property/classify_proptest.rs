//! Property-based tests for change classification

use basket_sync::shared::{classify, ActionKind, ChangeNotification, InvalidChangePayload, RawChange};
use proptest::prelude::*;
use serde_json::json;

fn row() -> impl Strategy<Value = serde_json::Value> {
    (1..10_000i64, proptest::option::of(0..50i64), proptest::option::of(any::<bool>())).prop_map(
        |(id, quantity, in_cart)| json!({ "id": id, "quantity": quantity, "in_cart": in_cart }),
    )
}

proptest! {
    #[test]
    fn test_classification_is_total(
        record in proptest::option::of(row()),
        old_record in proptest::option::of(row()),
    ) {
        let change: RawChange = ChangeNotification {
            record: record.clone(),
            old_record: old_record.clone(),
            commit_timestamp: None,
        };

        let expected = match (record.is_some(), old_record.is_some()) {
            (true, false) => Ok(ActionKind::Insert),
            (true, true) => Ok(ActionKind::Update),
            (false, true) => Ok(ActionKind::Delete),
            (false, false) => Err(InvalidChangePayload),
        };
        prop_assert_eq!(classify(&change), expected);
    }

    #[test]
    fn test_entity_id_prefers_new_record(new_id in 1..1000i64, old_id in 1000..2000i64) {
        let change: RawChange =
            ChangeNotification::update(json!({ "id": new_id }), json!({ "id": old_id }));
        prop_assert_eq!(change.entity_id(), Some(new_id));

        let change: RawChange = ChangeNotification::delete(json!({ "id": old_id }));
        prop_assert_eq!(change.entity_id(), Some(old_id));
    }
}
