//! Property-based tests for the chat-completions translation layer
//!
//! - Text content survives translation unchanged
//! - Tool calls with empty names never reach the agent
//! - Tool call order is preserved

use super::openai::{
    OpenAIChoice, OpenAIFunctionCall, OpenAIMessage, OpenAIResponse, OpenAIService, OpenAIToolCall,
};
use super::types::{LlmMessage, MessageRole};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = MessageRole> {
    prop_oneof![Just(MessageRole::User), Just(MessageRole::Assistant)]
}

fn arb_tool_call() -> impl Strategy<Value = (String, String)> {
    (
        "[a-z0-9_]{5,20}", // id
        prop_oneof![Just(String::new()), "[a-z_]{3,20}"],
    )
}

fn response_with_calls(calls: &[(String, String)]) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(
                    calls
                        .iter()
                        .map(|(id, name)| OpenAIToolCall {
                            id: id.clone(),
                            r#type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: name.clone(),
                                arguments: "{}".to_string(),
                            },
                        })
                        .collect(),
                ),
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
        usage: None,
    }
}

proptest! {
    #[test]
    fn text_survives_translation(role in arb_role(), text in "[a-zA-Z0-9 _.!?,]{0,200}") {
        let msg = match role {
            MessageRole::User => LlmMessage::user(text.clone()),
            MessageRole::Assistant => LlmMessage::assistant(text.clone()),
        };
        let wire = OpenAIService::translate_message(&msg);
        let expected_role = match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        prop_assert_eq!(wire.role.as_str(), expected_role);
        prop_assert_eq!(wire.content, Some(text));
    }

    #[test]
    fn empty_tool_names_are_dropped_and_order_kept(calls in proptest::collection::vec(arb_tool_call(), 0..8)) {
        let named: Vec<&str> = calls
            .iter()
            .filter(|(_, name)| !name.is_empty())
            .map(|(_, name)| name.as_str())
            .collect();

        match OpenAIService::normalize_response(response_with_calls(&calls)) {
            Ok(response) => {
                let names: Vec<&str> = response.tool_uses().iter().map(|(_, n, _)| *n).collect();
                prop_assert_eq!(names, named);
            }
            // Nothing usable in the reply at all
            Err(_) => prop_assert!(named.is_empty()),
        }
    }
}
