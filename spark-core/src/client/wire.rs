//! Wire-level request and response envelopes
//!
//! Field names, nesting and status-code semantics are an exact contract
//! with the remote service; everything here serializes snake_case and
//! omits absent optional fields instead of emitting `null`.

use crate::error::{SparkError, SparkResult};
use crate::protocol::types::{
    ChatMessage, ChatRequestParameters, FunctionCall, FunctionDef, StreamedChatResponse,
    TokensUsage,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `header.status` value of the terminal frame; no further frames follow
pub(crate) const STATUS_TERMINAL: i32 = 2;

// ============================================================================
// Outbound request
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatApiRequest {
    header: RequestHeader,
    parameter: RequestParameter,
    payload: RequestPayload,
}

#[derive(Debug, Serialize)]
struct RequestHeader {
    app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
}

#[derive(Debug, Serialize)]
struct RequestParameter {
    chat: ChatParameter,
}

#[derive(Debug, Serialize)]
struct ChatParameter {
    domain: String,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RequestPayload {
    message: MessageList,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<FunctionList>,
}

#[derive(Debug, Serialize)]
struct MessageList {
    text: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct FunctionList {
    text: Vec<WireFunction>,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: WireFunctionParameters,
}

#[derive(Debug, Serialize)]
struct WireFunctionParameters {
    #[serde(rename = "type")]
    schema_type: String,
    properties: BTreeMap<String, WireProperty>,
    required: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WireProperty {
    #[serde(rename = "type")]
    property_type: String,
    description: String,
}

/// Serialize one request frame.
///
/// `domain` comes from the model version registry unless the caller
/// overrode it in `parameters`. The `functions` key is omitted entirely
/// when no definitions are supplied; `required` lists exactly the
/// parameter names marked required, in declaration order.
pub(crate) fn encode_request(
    app_id: &str,
    uid: Option<&str>,
    domain: &str,
    parameters: &ChatRequestParameters,
    messages: &[ChatMessage],
    functions: &[FunctionDef],
) -> SparkResult<String> {
    let request = ChatApiRequest {
        header: RequestHeader {
            app_id: app_id.to_string(),
            uid: uid.map(str::to_string),
        },
        parameter: RequestParameter {
            chat: ChatParameter {
                domain: parameters
                    .domain
                    .clone()
                    .unwrap_or_else(|| domain.to_string()),
                temperature: parameters.temperature,
                max_tokens: parameters.max_tokens,
                chat_id: parameters.chat_id.clone(),
                top_k: parameters.top_k,
            },
        },
        payload: RequestPayload {
            message: MessageList {
                text: messages.to_vec(),
            },
            functions: if functions.is_empty() {
                None
            } else {
                Some(FunctionList {
                    text: functions.iter().map(to_wire_function).collect(),
                })
            },
        },
    };

    serde_json::to_string(&request)
        .map_err(|e| SparkError::protocol(format!("failed to encode request frame: {}", e)))
}

fn to_wire_function(def: &FunctionDef) -> WireFunction {
    WireFunction {
        name: def.name.clone(),
        description: def.description.clone(),
        parameters: WireFunctionParameters {
            schema_type: "object".to_string(),
            properties: def
                .parameters
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        WireProperty {
                            property_type: p.param_type.clone(),
                            description: p.description.clone(),
                        },
                    )
                })
                .collect(),
            required: def
                .parameters
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.clone())
                .collect(),
        },
    }
}

// ============================================================================
// Inbound response
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    header: ResponseHeader,
    #[serde(default)]
    payload: Option<ResponsePayload>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    sid: String,
    #[serde(default)]
    status: i32,
}

#[derive(Debug, Deserialize)]
struct ResponsePayload {
    choices: ResponseChoices,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoices {
    #[serde(default)]
    seq: i64,
    #[serde(default)]
    text: Vec<ResponseText>,
}

#[derive(Debug, Deserialize)]
struct ResponseText {
    #[serde(default)]
    content: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    text: TokensUsage,
}

/// One successfully decoded response frame
#[derive(Debug)]
pub(crate) struct DecodedFrame {
    /// The partial result carried by the frame
    pub response: StreamedChatResponse,
    /// `header.status`; [`STATUS_TERMINAL`] means no further frames follow
    pub status: i32,
    /// Service-assigned sequence number
    pub seq: i64,
}

/// Decode one inbound text frame.
///
/// A non-zero `header.code` surfaces as [`SparkError::Remote`] with the
/// frame's code/sid/message verbatim. An unparseable body surfaces as
/// [`SparkError::Protocol`] carrying the raw frame. A frame without
/// choices (or with an empty `choices.text`) decodes to an empty-text
/// partial; that is valid and can still terminate the stream.
pub(crate) fn decode_frame(raw: &str) -> SparkResult<DecodedFrame> {
    let parsed: ChatApiResponse = serde_json::from_str(raw).map_err(|e| {
        SparkError::protocol_with_raw(format!("unparseable response frame: {}", e), raw)
    })?;

    if parsed.header.code != 0 {
        return Err(SparkError::Remote {
            code: parsed.header.code,
            sid: parsed.header.sid,
            message: parsed.header.message,
        });
    }

    let mut text = String::new();
    let mut content_type = None;
    let mut function_call = None;
    let mut usage = None;
    let mut seq = 0;

    if let Some(payload) = parsed.payload {
        seq = payload.choices.seq;
        usage = payload.usage.map(|u| u.text);
        // The protocol sends one element per frame when function calling is
        // active, but the array length is not guaranteed; concatenate all.
        for item in payload.choices.text {
            text.push_str(&item.content);
            if content_type.is_none() {
                content_type = item.content_type;
            }
            if function_call.is_none() {
                function_call = item.function_call;
            }
        }
    }

    Ok(DecodedFrame {
        response: StreamedChatResponse {
            text,
            usage,
            content_type,
            function_call,
        },
        status: parsed.header.status,
        seq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::FunctionParameter;
    use serde_json::Value;

    fn encode_to_value(
        uid: Option<&str>,
        parameters: &ChatRequestParameters,
        messages: &[ChatMessage],
        functions: &[FunctionDef],
    ) -> Value {
        let raw = encode_request("app-1", uid, "general", parameters, messages, functions)
            .expect("encoding failed");
        serde_json::from_str(&raw).expect("encoded request is not valid JSON")
    }

    #[test]
    fn test_request_shape() {
        let parameters = ChatRequestParameters::default()
            .with_max_tokens(1024)
            .with_chat_id("chat-9");
        let messages = vec![ChatMessage::user("你是谁"), ChatMessage::assistant("...")];
        let value = encode_to_value(Some("user-1"), &parameters, &messages, &[]);

        assert_eq!(value["header"]["app_id"], "app-1");
        assert_eq!(value["header"]["uid"], "user-1");
        assert_eq!(value["parameter"]["chat"]["domain"], "general");
        assert_eq!(value["parameter"]["chat"]["max_tokens"], 1024);
        assert_eq!(value["parameter"]["chat"]["chat_id"], "chat-9");
        assert_eq!(value["payload"]["message"]["text"][0]["role"], "user");
        assert_eq!(value["payload"]["message"]["text"][0]["content"], "你是谁");
    }

    #[test]
    fn test_absent_optionals_are_omitted_not_null() {
        let value = encode_to_value(
            None,
            &ChatRequestParameters::default(),
            &[ChatMessage::user("hi")],
            &[],
        );
        let header = value["header"].as_object().unwrap();
        assert!(!header.contains_key("uid"));

        let chat = value["parameter"]["chat"].as_object().unwrap();
        assert!(!chat.contains_key("chat_id"));
        assert!(!chat.contains_key("top_k"));

        let payload = value["payload"].as_object().unwrap();
        assert!(!payload.contains_key("functions"));
    }

    #[test]
    fn test_domain_override_wins_over_model_domain() {
        let parameters = ChatRequestParameters::default().with_domain("generalv3");
        let value = encode_to_value(None, &parameters, &[ChatMessage::user("hi")], &[]);
        assert_eq!(value["parameter"]["chat"]["domain"], "generalv3");
    }

    #[test]
    fn test_function_defs_encode_required_in_declaration_order() {
        let functions = vec![FunctionDef::new(
            "queryWeather",
            "查询天气",
            vec![
                FunctionParameter::new("city", "string", "城市名"),
                FunctionParameter::new("unit", "enum", "温度单位").optional(),
                FunctionParameter::new("date", "string", "日期"),
            ],
        )];
        let value = encode_to_value(
            None,
            &ChatRequestParameters::default(),
            &[ChatMessage::user("天气")],
            &functions,
        );

        let function = &value["payload"]["functions"]["text"][0];
        assert_eq!(function["name"], "queryWeather");
        assert_eq!(function["parameters"]["type"], "object");
        assert_eq!(
            function["parameters"]["required"],
            serde_json::json!(["city", "date"])
        );
        assert_eq!(
            function["parameters"]["properties"]["city"]["type"],
            "string"
        );
        assert_eq!(
            function["parameters"]["properties"]["unit"]["description"],
            "温度单位"
        );
    }

    #[test]
    fn test_encoded_messages_round_trip() {
        let messages = vec![
            ChatMessage::user("1+1=?"),
            ChatMessage::assistant("1+1=3"),
            ChatMessage::user("不对啊，请再想想？"),
        ];
        let value = encode_to_value(None, &ChatRequestParameters::default(), &messages, &[]);
        let round_tripped: Vec<ChatMessage> =
            serde_json::from_value(value["payload"]["message"]["text"].clone()).unwrap();
        assert_eq!(round_tripped, messages);
    }

    #[test]
    fn test_decode_terminal_frame_with_usage() {
        let raw = r#"{
            "header": {"code": 0, "message": "Success", "sid": "cht000cb087", "status": 2},
            "payload": {
                "choices": {"status": 2, "seq": 5, "text": [
                    {"content": "我可以帮助你的吗？", "role": "assistant", "index": 0}
                ]},
                "usage": {"text": {
                    "question_tokens": 4, "prompt_tokens": 5,
                    "completion_tokens": 9, "total_tokens": 14
                }}
            }
        }"#;
        let frame = decode_frame(raw).unwrap();
        assert_eq!(frame.status, STATUS_TERMINAL);
        assert_eq!(frame.seq, 5);
        assert_eq!(frame.response.text, "我可以帮助你的吗？");
        let usage = frame.response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 5);
        assert_eq!(usage.total_tokens, 14);
    }

    #[test]
    fn test_decode_concatenates_all_text_elements() {
        let raw = r#"{
            "header": {"code": 0, "message": "", "sid": "s", "status": 1},
            "payload": {"choices": {"status": 1, "seq": 1, "text": [
                {"content": "a", "role": "assistant", "index": 0},
                {"content": "b", "role": "assistant", "index": 1}
            ]}}
        }"#;
        let frame = decode_frame(raw).unwrap();
        assert_eq!(frame.response.text, "ab");
    }

    #[test]
    fn test_decode_function_call_is_verbatim() {
        let raw = r#"{
            "header": {"code": 0, "message": "", "sid": "s", "status": 2},
            "payload": {"choices": {"status": 2, "seq": 0, "text": [{
                "content": "", "role": "assistant", "index": 0,
                "content_type": "text",
                "function_call": {"name": "queryWeather", "arguments": "{\"city\":\"长沙\"}"}
            }]}}
        }"#;
        let frame = decode_frame(raw).unwrap();
        let call = frame.response.function_call.unwrap();
        assert_eq!(call.name, "queryWeather");
        assert_eq!(call.arguments, "{\"city\":\"长沙\"}");
        assert_eq!(frame.response.content_type.as_deref(), Some("text"));
    }

    #[test]
    fn test_decode_error_frame_surfaces_remote_error() {
        let raw = r#"{"header": {"code": 10013, "message": "input is invalid", "sid": "cht-err", "status": 2}}"#;
        match decode_frame(raw) {
            Err(SparkError::Remote { code, sid, message }) => {
                assert_eq!(code, 10013);
                assert_eq!(sid, "cht-err");
                assert_eq!(message, "input is invalid");
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unparseable_frame_keeps_raw_payload() {
        let raw = "not json at all";
        match decode_frame(raw) {
            Err(SparkError::Protocol { raw: Some(kept), .. }) => assert_eq!(kept, raw),
            other => panic!("expected protocol error with raw frame, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_terminal_frame_with_empty_choices() {
        let raw = r#"{
            "header": {"code": 0, "message": "", "sid": "s", "status": 2},
            "payload": {"choices": {"status": 2, "seq": 3, "text": []}}
        }"#;
        let frame = decode_frame(raw).unwrap();
        assert_eq!(frame.status, STATUS_TERMINAL);
        assert_eq!(frame.response.text, "");
        assert!(frame.response.usage.is_none());
    }
}
