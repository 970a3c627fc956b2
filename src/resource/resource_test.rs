use bytes::Bytes;

use super::*;

fn vacuum_with_map(namespace: &str, name: &str) -> Vacuum {
    Vacuum {
        metadata: ObjectMeta {
            namespace: namespace.to_string(),
            name: name.to_string(),
            resource_version: Some("12".to_string()),
        },
        status: VacuumStatus {
            state: "cleaning".to_string(),
            battery: 87,
            map: Some(MapArtifact {
                data: Bytes::from_static(b"\x89PNG\r\n"),
            }),
            path: vec![Position { x: 1, y: 2 }, Position { x: 3, y: 4 }],
            ..Default::default()
        },
    }
}

#[test]
fn key_derives_from_namespace_and_name() {
    let vacuum = vacuum_with_map("default", "robot-1");
    assert_eq!(vacuum.key(), ObjectKey::new("default", "robot-1"));
    assert_eq!(vacuum.key().as_str(), "default/robot-1");
}

#[test]
fn key_stays_valid_for_torn_down_objects() {
    // Delete events may deliver an object whose status is already gone.
    let vacuum = Vacuum {
        metadata: ObjectMeta {
            namespace: "default".to_string(),
            name: "robot-1".to_string(),
            resource_version: None,
        },
        status: VacuumStatus::default(),
    };
    assert_eq!(vacuum.key().as_str(), "default/robot-1");
}

#[test]
fn strip_payload_removes_map_and_path_only() {
    let stripped = vacuum_with_map("default", "robot-1").strip_payload();
    assert!(stripped.status.map.is_none());
    assert!(stripped.status.path.is_empty());
    assert_eq!(stripped.status.state, "cleaning");
    assert_eq!(stripped.status.battery, 87);
    assert_eq!(stripped.metadata.name, "robot-1");
}

#[test]
fn map_artifact_round_trips_as_base64() {
    let vacuum = vacuum_with_map("default", "robot-1");
    let json = serde_json::to_string(&vacuum).unwrap();
    assert!(json.contains("iVBORw0K"), "expected base64 map data in {}", json);

    let decoded: Vacuum = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.map_data().unwrap(), &Bytes::from_static(b"\x89PNG\r\n"));
}

#[test]
fn partial_status_deserializes_with_defaults() {
    let decoded: Cleaning = serde_json::from_str(
        r#"{"metadata":{"namespace":"default","name":"run-7"},"status":{"state":"done"}}"#,
    )
    .unwrap();
    assert_eq!(decoded.status.state, "done");
    assert_eq!(decoded.status.area, 0);
    assert!(decoded.status.map.is_none());
}

#[test]
fn resource_kind_parses_known_kinds_only() {
    assert_eq!("vacuums".parse::<ResourceKind>().unwrap(), ResourceKind::Vacuums);
    assert_eq!("cleanings".parse::<ResourceKind>().unwrap(), ResourceKind::Cleanings);
    assert!("pods".parse::<ResourceKind>().is_err());
}
