//! Wire frames for the push channel.
//!
//! Outbound frames are plain serde structs. Inbound frames are classified by
//! their `action` tag into the three cases the client cares about; everything
//! else stays an opaque [`PushMessage`] whose payload shape is channel-defined
//! and not interpreted here.

use serde::Serialize;
use serde_json::Value;

/// Parameter block of the auth request. Field order matches the wire format.
#[derive(Debug, Serialize)]
pub struct AuthParams {
    #[serde(rename = "authType")]
    pub auth_type: &'static str,
    #[serde(rename = "accessKey")]
    pub access_key: String,
    #[serde(rename = "signatureMethod")]
    pub signature_method: &'static str,
    #[serde(rename = "signatureVersion")]
    pub signature_version: &'static str,
    pub timestamp: String,
    pub signature: String,
}

/// `{"action":"req","ch":"auth","params":{..}}`
#[derive(Debug, Serialize)]
pub struct AuthRequest {
    action: &'static str,
    ch: &'static str,
    pub params: AuthParams,
}

impl AuthRequest {
    pub fn new(params: AuthParams) -> Self {
        Self {
            action: "req",
            ch: "auth",
            params,
        }
    }
}

/// `{"action":"sub","ch":"<channel>"}`
#[derive(Debug, Serialize)]
pub struct SubRequest {
    action: &'static str,
    ch: String,
}

impl SubRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            action: "sub",
            ch: channel.into(),
        }
    }
}

/// Keepalive answer. The `ts` is echoed verbatim from the ping and omitted
/// entirely when the ping carried none.
#[derive(Debug, Serialize)]
pub struct Pong {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<Value>,
}

impl Pong {
    pub fn new(ts: Option<Value>) -> Self {
        Self { action: "pong", ts }
    }
}

/// An inbound frame forwarded to the caller. The raw JSON is kept intact;
/// the accessors only read the routing-relevant fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    value: Value,
}

impl PushMessage {
    pub fn action(&self) -> Option<&str> {
        self.value.get("action").and_then(Value::as_str)
    }

    pub fn channel(&self) -> Option<&str> {
        self.value.get("ch").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.value.get("data")
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }
}

impl From<Value> for PushMessage {
    fn from(value: Value) -> Self {
        Self { value }
    }
}

/// Result of the authentication handshake, delivered to the caller once per
/// connection.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: PushMessage,
}

/// Inbound frame classified by its `action` tag.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Server keepalive; answered with a [`Pong`], never forwarded.
    Ping { ts: Option<Value> },
    /// Response to the auth request; `code == 200` means success.
    AuthReply {
        code: Option<i64>,
        message: PushMessage,
    },
    /// Anything else: sub acks, push events, unknown actions. Forwarded
    /// verbatim to the caller's message handler.
    Other(PushMessage),
}

impl Inbound {
    /// Parse one text frame. A non-JSON frame is an error for that frame
    /// only; the caller logs and drops it.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::classify(value))
    }

    fn classify(value: Value) -> Self {
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let channel = value.get("ch").and_then(Value::as_str).map(str::to_owned);

        match action.as_deref() {
            Some("ping") => Inbound::Ping {
                ts: value.get("data").and_then(|data| data.get("ts")).cloned(),
            },
            Some("req") if channel.as_deref() == Some("auth") => Inbound::AuthReply {
                code: value.get("code").and_then(Value::as_i64),
                message: PushMessage::from(value),
            },
            _ => Inbound::Other(PushMessage::from(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_request_wire_shape() {
        let request = AuthRequest::new(AuthParams {
            auth_type: "api",
            access_key: "ak".to_string(),
            signature_method: crate::signer::SIGNATURE_METHOD,
            signature_version: crate::signer::SIGNATURE_VERSION,
            timestamp: "2019-09-01T18:16:16".to_string(),
            signature: "sig==".to_string(),
        });

        let value: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "req",
                "ch": "auth",
                "params": {
                    "authType": "api",
                    "accessKey": "ak",
                    "signatureMethod": "HmacSHA256",
                    "signatureVersion": "2.1",
                    "timestamp": "2019-09-01T18:16:16",
                    "signature": "sig==",
                }
            })
        );
    }

    #[test]
    fn test_sub_request_wire_shape() {
        let text = serde_json::to_string(&SubRequest::new("accounts.update#1")).unwrap();
        assert_eq!(text, r#"{"action":"sub","ch":"accounts.update#1"}"#);
    }

    #[test]
    fn test_pong_echoes_ts() {
        let text = serde_json::to_string(&Pong::new(Some(json!(1700000000000u64)))).unwrap();
        assert_eq!(text, r#"{"action":"pong","ts":1700000000000}"#);
    }

    #[test]
    fn test_pong_without_ts_omits_field() {
        let text = serde_json::to_string(&Pong::new(None)).unwrap();
        assert_eq!(text, r#"{"action":"pong"}"#);
    }

    #[test]
    fn test_classifies_ping() {
        let inbound = Inbound::parse(r#"{"action":"ping","data":{"ts":1700000000000}}"#).unwrap();
        match inbound {
            Inbound::Ping { ts } => assert_eq!(ts, Some(json!(1700000000000u64))),
            other => panic!("expected ping, got {:?}", other),
        }
    }

    #[test]
    fn test_classifies_auth_reply() {
        let inbound = Inbound::parse(r#"{"action":"req","ch":"auth","code":200}"#).unwrap();
        match inbound {
            Inbound::AuthReply { code, message } => {
                assert_eq!(code, Some(200));
                assert_eq!(message.channel(), Some("auth"));
            }
            other => panic!("expected auth reply, got {:?}", other),
        }
    }

    #[test]
    fn test_non_auth_req_is_forwarded() {
        let inbound = Inbound::parse(r#"{"action":"req","ch":"orders","code":200}"#).unwrap();
        assert!(matches!(inbound, Inbound::Other(_)));
    }

    #[test]
    fn test_push_keeps_payload_intact() {
        let raw = json!({
            "action": "push",
            "ch": "accounts.update#1",
            "data": {
                "currency": "btc",
                "accountId": 33385,
                "available": "2028.699426619837209087",
                "changeType": "order.match",
            }
        });
        let inbound = Inbound::parse(&raw.to_string()).unwrap();
        match inbound {
            Inbound::Other(message) => {
                assert_eq!(message.action(), Some("push"));
                assert_eq!(message.channel(), Some("accounts.update#1"));
                assert_eq!(message.data(), Some(&raw["data"]));
                assert_eq!(message.raw(), &raw);
            }
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(Inbound::parse("not json").is_err());
    }
}
