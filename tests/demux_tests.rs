// Tests for the inbound event demultiplexer: classification must be total
// over everything the channel can deliver and never panic.

use base64::Engine;
use legado_voice::{classify, InboundEvent};

#[test]
fn test_classifies_user_partial() {
    let event = classify(r#"{"inputTranscription":{"text":"ho"}}"#);
    assert_eq!(event, InboundEvent::UserPartial("ho".to_string()));
}

#[test]
fn test_classifies_assistant_partial() {
    let event = classify(r#"{"outputTranscription":{"text":"¿Cómo"}}"#);
    assert_eq!(event, InboundEvent::AssistantPartial("¿Cómo".to_string()));
}

#[test]
fn test_classifies_turn_complete_with_optional_texts() {
    let event = classify(r#"{"turnComplete":{"assistantText":"¿Cómo estás?"}}"#);
    assert_eq!(
        event,
        InboundEvent::TurnComplete {
            user: None,
            assistant: Some("¿Cómo estás?".to_string()),
        }
    );

    let event = classify(r#"{"turnComplete":{}}"#);
    assert_eq!(
        event,
        InboundEvent::TurnComplete {
            user: None,
            assistant: None,
        }
    );
}

#[test]
fn test_classifies_service_error() {
    let event = classify(r#"{"error":{"message":"quota exceeded"}}"#);
    assert_eq!(event, InboundEvent::ServiceError("quota exceeded".to_string()));
}

#[test]
fn test_audio_passthrough_decodes_base64() {
    let payload = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
    let raw = format!(r#"{{"audio":{{"data":"{}"}}}}"#, payload);

    assert_eq!(classify(&raw), InboundEvent::Audio(vec![1, 2, 3, 4]));
}

#[test]
fn test_undecodable_audio_is_ignored() {
    assert_eq!(
        classify(r#"{"audio":{"data":"not base64!!"}}"#),
        InboundEvent::Ignored
    );
}

#[test]
fn test_unknown_shape_maps_to_ignored() {
    assert_eq!(
        classify(r#"{"usageMetadata":{"totalTokens":412}}"#),
        InboundEvent::Ignored
    );
    assert_eq!(classify(r#"{}"#), InboundEvent::Ignored);
}

#[test]
fn test_malformed_json_maps_to_service_error() {
    match classify("{not json") {
        InboundEvent::ServiceError(msg) => assert!(msg.contains("malformed")),
        other => panic!("expected ServiceError, got {:?}", other),
    }
}

#[test]
fn test_totality_over_message_corpus() {
    // Every shape the channel can deliver, plus one deliberately unknown
    // one, classifies without panicking.
    let corpus = [
        r#"{"inputTranscription":{"text":"bien"}}"#.to_string(),
        r#"{"outputTranscription":{"text":"¿Cómo estás?"}}"#.to_string(),
        r#"{"turnComplete":{"userText":"bien","assistantText":"¿Cómo estás?"}}"#.to_string(),
        format!(
            r#"{{"audio":{{"data":"{}"}}}}"#,
            base64::engine::general_purpose::STANDARD.encode([0u8; 16])
        ),
        r#"{"error":{"message":"internal"}}"#.to_string(),
        r#"{"somethingNew":{"version":2,"blob":[1,2,3]}}"#.to_string(),
        "".to_string(),
    ];

    for raw in &corpus {
        let _ = classify(raw);
    }

    assert_eq!(
        classify(r#"{"somethingNew":{"version":2,"blob":[1,2,3]}}"#),
        InboundEvent::Ignored
    );
}

#[test]
fn test_error_takes_precedence_over_other_fields() {
    // A message carrying both an error and a transcript is a failure report
    let event =
        classify(r#"{"error":{"message":"stream reset"},"inputTranscription":{"text":"x"}}"#);
    assert_eq!(event, InboundEvent::ServiceError("stream reset".to_string()));
}
