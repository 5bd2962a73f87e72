use shared::domain::{ExecutionMode, Message};

#[test]
fn message_uses_tagged_snake_case_encoding() {
    let encoded = serde_json::to_value(Message::Increment(803)).expect("encode");
    assert_eq!(
        encoded,
        serde_json::json!({ "type": "increment", "payload": 803 })
    );

    let print: Message = serde_json::from_str(r#"{"type":"print"}"#).expect("decode print");
    assert_eq!(print, Message::Print);
}

#[test]
fn execution_mode_parses_case_insensitively() {
    assert_eq!("Actor".parse::<ExecutionMode>(), Ok(ExecutionMode::Actor));
    assert_eq!(" worker ".parse::<ExecutionMode>(), Ok(ExecutionMode::Worker));
    assert!("threads".parse::<ExecutionMode>().is_err());
    assert_eq!(ExecutionMode::default(), ExecutionMode::Sync);
}
