use domain::{EventRecord, VariableValue};

#[test]
fn variable_value_numeric_views() {
    assert_eq!(VariableValue::Bool(true).as_f64(), Some(1.0));
    assert_eq!(VariableValue::Int(-7).as_i64(), Some(-7));
    assert_eq!(VariableValue::Float(12.9).as_i64(), Some(12));
    assert_eq!(VariableValue::Float(f64::NAN).as_i64(), None);
    assert_eq!(VariableValue::Bytes(vec![1, 2]).as_f64(), None);
}

#[test]
fn variable_value_json_is_untagged() {
    let values: Vec<VariableValue> =
        serde_json::from_str("[true, 12, 1.5, [0, 1]]").expect("parse");
    assert_eq!(
        values,
        vec![
            VariableValue::Bool(true),
            VariableValue::Int(12),
            VariableValue::Float(1.5),
            VariableValue::Bytes(vec![0, 1]),
        ]
    );
}

#[test]
fn event_record_uses_camel_case() {
    let record = EventRecord {
        event_id: 1,
        tick_id: 12346,
        value: 2,
    };
    let json = serde_json::to_string(&record).expect("json");
    assert_eq!(json, r#"{"eventId":1,"tickId":12346,"value":2}"#);
}
