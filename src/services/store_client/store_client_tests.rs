use super::*;
use serde_json::json;

#[test]
fn get_by_path_walks_nested_objects() {
    let v = json!({"data": {"configuration": {"sections": []}}});
    assert!(get_by_path(&v, "data.configuration").is_some());
    assert!(get_by_path(&v, "data.missing").is_none());
    assert!(get_by_path(&v, "data.configuration.sections").unwrap().is_array());
}

#[test]
fn unwrap_configuration_handles_envelope_variants() {
    let full = json!({"ok": true, "data": {"configuration": {"sections": []}}});
    let cfg = unwrap_configuration(&full).unwrap();
    assert!(cfg.is_some());

    // Success envelope with nothing stored yet.
    let empty = json!({"ok": true, "data": {}});
    assert!(unwrap_configuration(&empty).unwrap().is_none());
    let null_cfg = json!({"ok": true, "data": {"configuration": null}});
    assert!(unwrap_configuration(&null_cfg).unwrap().is_none());

    // Bare payload without an envelope.
    let bare = json!({"configuration": {"sections": []}});
    assert!(unwrap_configuration(&bare).unwrap().is_some());

    // Error envelope surfaces the message.
    let err = json!({"ok": false, "data": {"message": "template not found"}});
    assert_eq!(unwrap_configuration(&err).unwrap_err(), "template not found");
    let err_plain = json!({"ok": false});
    assert_eq!(unwrap_configuration(&err_plain).unwrap_err(), "store call failed");
}
