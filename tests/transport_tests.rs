// Tests for the transport wire format and connection bookkeeping

use anyhow::Result;
use chrono::Utc;
use loqa_voice::transport::ws::ConnectionSessions;
use loqa_voice::{AudioRef, InboundEvent, OutboundMessage, Transport, Turn};
use uuid::Uuid;

#[test]
fn test_parse_start_event() -> Result<()> {
    let event = InboundEvent::parse(r#"{"event":"start","sessionId":"call-1","sampleRate":16000}"#)?;
    assert_eq!(
        event,
        InboundEvent::Start {
            session_id: "call-1".to_string(),
            sample_rate: Some(16000),
        }
    );

    // Sample rate is optional
    let event = InboundEvent::parse(r#"{"event":"start","sessionId":"call-2"}"#)?;
    assert_eq!(
        event,
        InboundEvent::Start {
            session_id: "call-2".to_string(),
            sample_rate: None,
        }
    );
    Ok(())
}

#[test]
fn test_parse_media_decodes_base64_payload() -> Result<()> {
    // "AQIDBA==" is [1, 2, 3, 4]
    let event = InboundEvent::parse(r#"{"event":"media","sessionId":"call-1","payload":"AQIDBA=="}"#)?;
    assert_eq!(event.session_id(), "call-1");
    match event {
        InboundEvent::Media { payload, .. } => assert_eq!(payload, vec![1, 2, 3, 4]),
        other => panic!("expected media, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_parse_stop_event() -> Result<()> {
    let event = InboundEvent::parse(r#"{"event":"stop","sessionId":"call-1"}"#)?;
    assert_eq!(
        event,
        InboundEvent::Stop {
            session_id: "call-1".to_string()
        }
    );
    Ok(())
}

#[test]
fn test_malformed_events_are_rejected() {
    assert!(InboundEvent::parse("not json").is_err());
    assert!(InboundEvent::parse(r#"{"event":"dance","sessionId":"x"}"#).is_err());
    assert!(InboundEvent::parse(r#"{"event":"media","sessionId":"x","payload":"%%%"}"#).is_err());
    assert!(InboundEvent::parse(r#"{"event":"stop"}"#).is_err());
}

#[test]
fn test_reply_serializes_with_type_tag() -> Result<()> {
    let turn = Turn {
        transcript: "hello".to_string(),
        reply_text: "hi there".to_string(),
        reply_audio_ref: Some(AudioRef::new("https://cdn.example/a.mp3")),
        started_at: Utc::now(),
        completed_at: Utc::now(),
    };

    let json = serde_json::to_value(OutboundMessage::reply("call-1", &turn))?;
    assert_eq!(json["type"], "reply");
    assert_eq!(json["sessionId"], "call-1");
    assert_eq!(json["transcript"], "hello");
    assert_eq!(json["text"], "hi there");
    assert_eq!(json["audioRef"], "https://cdn.example/a.mp3");
    Ok(())
}

#[tokio::test]
async fn test_transport_delivers_until_receiver_drops() -> Result<()> {
    let (transport, mut rx) = Transport::channel(Uuid::new_v4());
    let message = OutboundMessage::Reply {
        session_id: "call-1".to_string(),
        transcript: "a".to_string(),
        text: "b".to_string(),
        audio_ref: None,
    };

    transport.deliver(message.clone())?;
    assert_eq!(rx.recv().await, Some(message.clone()));

    // Verify: a closed connection surfaces as a delivery error
    drop(rx);
    assert!(transport.deliver(message).is_err());
    Ok(())
}

#[test]
fn test_connection_tracks_current_and_owned_sessions() {
    let mut sessions = ConnectionSessions::default();
    assert_eq!(sessions.current(), None);

    sessions.track(&InboundEvent::Start {
        session_id: "a".to_string(),
        sample_rate: None,
    });
    sessions.track(&InboundEvent::Start {
        session_id: "b".to_string(),
        sample_rate: None,
    });
    assert_eq!(sessions.current(), Some("b"));

    sessions.track(&InboundEvent::Stop {
        session_id: "b".to_string(),
    });
    assert_eq!(sessions.current(), None);

    let owned = sessions.into_owned();
    assert_eq!(owned, vec!["a".to_string()]);
}
