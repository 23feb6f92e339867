#![forbid(unsafe_code)]

use std::sync::Arc;

use reclist_adapter::line_item::LineItem;
use reclist_adapter::{AdapterError, AdapterRuntime, LineItemFormResponse};
use reclist_contracts::record::{RecordId, RecordKey};
use reclist_contracts::submission::FormDecodeError;
use reclist_engines::integrity_codec::{IntegrityCodec, IntegritySecret};
use reclist_os::RecordListError;

fn runtime() -> AdapterRuntime {
    AdapterRuntime::new(Arc::new(IntegrityCodec::new(
        IntegritySecret::from_bytes(vec![0x5a; 48]).unwrap(),
    )))
}

fn bolt() -> LineItem {
    LineItem {
        id: Some(RecordId::from(42)),
        description: "Hex bolt".to_string(),
        quantity: Some(12),
    }
}

/// Form pairs a browser would post for `response`, plus extra fields.
fn post_back(response: &LineItemFormResponse, extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let carrier = response.view.carrier.as_ref().expect("editable form has carrier");
    for (name, value) in carrier.pairs() {
        pairs.push((name.to_string(), value.to_string()));
    }
    for entry in &response.view.entries {
        let prefix = &entry.field_prefix;
        if let Some(id) = &entry.record.id {
            pairs.push((format!("{prefix}[id]"), id.to_string()));
        }
        pairs.push((
            format!("{prefix}[description]"),
            entry.record.description.clone(),
        ));
        pairs.push((
            format!("{prefix}[quantity]"),
            entry
                .record
                .quantity
                .map(|quantity| quantity.to_string())
                .unwrap_or_default(),
        ));
    }
    for (name, value) in extra {
        pairs.push((name.to_string(), value.to_string()));
    }
    pairs
}

#[test]
fn at_adapter_01_seed_renders_records_and_empty_ledger() {
    let response = runtime().seed_line_item_form(&[bolt()]).unwrap();
    assert_eq!(response.outcome, "SEEDED");
    assert_eq!(response.view.entries.len(), 1);
    assert_eq!(response.view.entries[0].field_prefix, "lineItemRecords[0]");
    assert_eq!(response.changed.len(), 1);
    assert!(response.removed.is_empty());
}

#[test]
fn at_adapter_02_remove_persisted_item_moves_it_to_removed() {
    let rt = runtime();
    let seeded = rt.seed_line_item_form(&[bolt()]).unwrap();
    let response = rt
        .run_line_item_submission(post_back(&seeded, &[("lineItemRecords[0][remove]", "×")]))
        .unwrap();
    assert_eq!(response.outcome, "UPDATED");
    assert!(response.changed.is_empty());
    assert_eq!(response.removed, vec![bolt()]);
    assert_eq!(
        response.view.placeholder(),
        Some("No records listed.")
    );
}

#[test]
fn at_adapter_03_add_then_edit_keeps_typed_values() {
    let rt = runtime();
    let seeded = rt.seed_line_item_form(&[bolt()]).unwrap();
    let added = rt
        .run_line_item_submission(post_back(&seeded, &[("lineItemRecordAdd", "Add")]))
        .unwrap();
    assert_eq!(added.changed.len(), 2);
    assert_eq!(added.changed[1].key, RecordKey(1));

    let edited = rt
        .run_line_item_submission(post_back(
            &added,
            &[
                ("lineItemRecords[1][description]", "Washer"),
                ("lineItemRecords[1][quantity]", "4"),
            ],
        ))
        .unwrap();
    assert_eq!(edited.outcome, "UNCHANGED");
    assert_eq!(edited.changed[1].record.description, "Washer");
    assert_eq!(edited.changed[1].record.quantity, Some(4));
    assert!(edited.field_errors.is_empty());
    assert_eq!(edited.changed[1].record.id, None);
}

#[test]
fn at_adapter_04_tampered_ledger_rejects_submission() {
    let rt = runtime();
    let seeded = rt.seed_line_item_form(&[bolt()]).unwrap();
    let removed = rt
        .run_line_item_submission(post_back(&seeded, &[("lineItemRecords[0][remove]", "×")]))
        .unwrap();
    let mut pairs = post_back(&removed, &[]);
    let replacement = if pairs[1].1.starts_with('f') { "e" } else { "f" };
    pairs[1].1.replace_range(0..1, replacement);

    let err = rt
        .run_line_item_submission(pairs)
        .expect_err("tampered hash must be rejected");
    assert!(matches!(
        err,
        AdapterError::RecordList(RecordListError::Integrity(_))
    ));
}

#[test]
fn at_adapter_05_malformed_form_is_rejected_before_processing() {
    let err = runtime()
        .run_line_item_submission([("lineItemRecords[x][remove]", "1")])
        .expect_err("bad key must fail");
    assert!(matches!(
        err,
        AdapterError::Decode(FormDecodeError::InvalidRecordKey { .. })
    ));
}

#[test]
fn at_adapter_06_response_json_shape() {
    let response = runtime().seed_line_item_form(&[bolt()]).unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["changed"][0]["record"]["quantity"], 12);
    assert_eq!(json["view"]["messages"]["add_record"], "Add Another Record");
    assert_eq!(
        json["view"]["carrier"]["removed_hash"]["name"],
        "lineItemRecordsRemovedHash"
    );
}

#[test]
fn at_adapter_07_identity_typed_into_blank_row_is_refused() {
    let rt = runtime();
    let seeded = rt.seed_line_item_form(&[]).unwrap();
    let pairs = post_back(
        &seeded,
        &[
            ("lineItemRecords[0][id]", "999"),
            ("lineItemRecords[0][remove]", "x"),
        ],
    );

    let err = rt
        .run_line_item_submission(pairs)
        .expect_err("unissued identity must not be deleted");
    assert!(matches!(
        err,
        AdapterError::RecordList(RecordListError::UnverifiedIdentity { key: RecordKey(0) })
    ));
}

#[test]
fn at_adapter_08_non_numeric_quantity_is_reported() {
    let rt = runtime();
    let seeded = rt.seed_line_item_form(&[bolt()]).unwrap();
    let response = rt
        .run_line_item_submission(post_back(
            &seeded,
            &[("lineItemRecords[0][quantity]", "a dozen")],
        ))
        .unwrap();
    assert_eq!(response.outcome, "INVALID");
    assert_eq!(response.changed[0].record.quantity, None);
    assert_eq!(response.field_errors.len(), 1);
    assert_eq!(response.field_errors[0].key, RecordKey(0));
    assert_eq!(response.field_errors[0].field, "quantity");
    assert_eq!(response.field_errors[0].value, "a dozen");
}
