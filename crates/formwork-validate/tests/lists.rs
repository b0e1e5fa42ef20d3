//! Validation over list-shaped model parts and the map-only host boundary.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use formwork_core::FormTree;
use formwork_model::{FieldPath, SuiteResult};
use formwork_validate::{Orchestrator, SuiteError, collect};

#[tokio::test(start_paused = true)]
async fn list_fields_validate_and_aggregate_by_indexed_path() {
    // The host hands over a map-only representation; declared list keys are
    // restored to real lists on the way in.
    let form = json!({
        "addresses": {
            "0": {"street": "", "zip": "1000"},
            "1": {"street": "Main", "zip": "2000"}
        }
    });
    let tree = Arc::new(Mutex::new(FormTree::from_form_value(&form, &["addresses"])));
    let suite = |model: Value, _target: Option<String>| async move {
        let mut result = SuiteResult::new();
        if let Some(addresses) = model["addresses"].as_array() {
            for (index, address) in addresses.iter().enumerate() {
                if address["street"].as_str().is_none_or(str::is_empty) {
                    result.add_error(format!("addresses[{index}].street"), "Required");
                }
            }
        }
        Ok::<_, SuiteError>(result)
    };
    let handle = Orchestrator::new(Arc::clone(&tree), suite).spawn();

    handle.validate_all();
    handle.await_settled().await;
    {
        let guard = tree.lock().unwrap();
        let issues = collect(&guard);
        assert_eq!(
            issues.errors["addresses[0].street"],
            vec!["Required".to_string()]
        );
        assert!(!issues.errors.contains_key("addresses[1].street"));

        // The host-facing representation stays map-only.
        let form_value = guard.form_value();
        assert!(form_value["addresses"].is_object());
        assert_eq!(form_value["addresses"]["1"]["street"], json!("Main"));
    }

    // Filling the street revalidates just that control and clears its entry.
    tree.lock()
        .unwrap()
        .set_value(&FieldPath::parse("addresses[0].street"), &json!("Broad"))
        .expect("set street");
    handle.await_settled().await;

    let issues = collect(&tree.lock().unwrap());
    assert!(issues.errors.is_empty(), "left-over entries: {issues:?}");
}
