#[cfg(test)]
mod tests {
    use herald_core::{HeraldError, RiskTier, ToolCall, ToolSpec, Turn, Role};
    use herald_llm::*;
    use serde_json::json;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            description: "test tool".into(),
            parameters: json!({"type": "object", "properties": {}}),
            risk_tier: RiskTier::Safe,
        }
    }

    fn act_request(tools: &[&str]) -> DecisionRequest {
        DecisionRequest {
            mode: DecisionMode::Act,
            model: "gpt-4.1".into(),
            system_context: "system".into(),
            conversation: vec![Turn::text(Role::User, "email")],
            tools: tools.iter().map(|t| spec(t)).collect(),
            max_tokens: 512,
            temperature: 0.0,
        }
    }

    // ── Contract validation ────────────────────────────────────

    mod contract {
        use super::*;

        #[test]
        fn test_act_requires_at_least_one_call() {
            let req = act_request(&["Done"]);
            let err = validate_act(
                &req,
                Decision::Act {
                    text: "I think we are done".into(),
                    tool_calls: vec![],
                },
            )
            .unwrap_err();
            assert!(matches!(err, HeraldError::DecisionContractViolation(_)));
        }

        #[test]
        fn test_act_rejects_unoffered_tool() {
            let req = act_request(&["Done"]);
            let err = validate_act(
                &req,
                Decision::Act {
                    text: String::new(),
                    tool_calls: vec![ToolCall::new("c1", "delete_inbox", json!({}))],
                },
            )
            .unwrap_err();
            assert!(err.to_string().contains("delete_inbox"));
        }

        #[test]
        fn test_act_rejects_classification() {
            let req = act_request(&["Done"]);
            let err = validate_act(
                &req,
                Decision::Classify(RawClassification {
                    reasoning: "x".into(),
                    category: "respond".into(),
                }),
            )
            .unwrap_err();
            assert!(matches!(err, HeraldError::DecisionContractViolation(_)));
        }

        #[test]
        fn test_act_accepts_valid_calls_in_order() {
            let req = act_request(&["check_calendar_availability", "Done"]);
            let (_, calls) = validate_act(
                &req,
                Decision::Act {
                    text: String::new(),
                    tool_calls: vec![
                        ToolCall::new("a", "check_calendar_availability", json!({})),
                        ToolCall::new("b", "Done", json!({})),
                    ],
                },
            )
            .unwrap();
            assert_eq!(calls[0].id, "a");
            assert_eq!(calls[1].id, "b");
        }

        #[test]
        fn test_classify_maps_enum() {
            let c = validate_classify(Decision::Classify(RawClassification {
                reasoning: "direct question".into(),
                category: "respond".into(),
            }))
            .unwrap();
            assert_eq!(c.category, herald_core::Category::Respond);
            assert_eq!(c.reasoning, "direct question");
        }

        #[test]
        fn test_classify_rejects_unknown_category() {
            let err = validate_classify(Decision::Classify(RawClassification {
                reasoning: "?".into(),
                category: "escalate".into(),
            }))
            .unwrap_err();
            assert!(matches!(err, HeraldError::DecisionContractViolation(_)));
        }
    }

    // ── OpenAI wire mapping ────────────────────────────────────

    mod openai {
        use super::*;

        #[test]
        fn test_act_body_requires_tool_choice() {
            let body = OpenAiDecider::build_body(&act_request(&["Done"]));
            assert_eq!(body["tool_choice"], json!("required"));
            assert_eq!(body["tools"][0]["function"]["name"], json!("Done"));
            assert_eq!(body["messages"][0]["role"], json!("system"));
            assert_eq!(body["messages"][1]["content"], json!("email"));
        }

        #[test]
        fn test_classify_body_forces_router_function() {
            let mut req = act_request(&[]);
            req.mode = DecisionMode::Classify;
            let body = OpenAiDecider::build_body(&req);
            assert_eq!(
                body["tool_choice"]["function"]["name"],
                json!("classify_email")
            );
        }

        #[test]
        fn test_tool_results_map_to_tool_messages() {
            let mut conv = herald_core::Conversation::new();
            conv.push_user("email");
            conv.push_assistant("", vec![ToolCall::new("c1", "Done", json!({"done": true}))])
                .unwrap();
            conv.push_tool_result(herald_core::ToolResult::ok("c1", "ok"))
                .unwrap();
            let mut req = act_request(&["Done"]);
            req.conversation = conv.dialogue();
            let body = OpenAiDecider::build_body(&req);
            let messages = body["messages"].as_array().unwrap();
            assert_eq!(messages[2]["tool_calls"][0]["id"], json!("c1"));
            assert_eq!(messages[3]["role"], json!("tool"));
            assert_eq!(messages[3]["tool_call_id"], json!("c1"));
        }

        #[test]
        fn test_parse_act_response() {
            let data = json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "check_calendar_availability", "arguments": "{\"day\":\"Tuesday\"}"}
                        }]
                    }
                }]
            });
            match OpenAiDecider::parse_response(DecisionMode::Act, &data).unwrap() {
                Decision::Act { tool_calls, .. } => {
                    assert_eq!(tool_calls[0].arguments["day"], json!("Tuesday"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_parse_malformed_arguments_is_violation() {
            let data = json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "Done", "arguments": "{not json"}
                }]}}]
            });
            let err = OpenAiDecider::parse_response(DecisionMode::Act, &data).unwrap_err();
            assert!(matches!(err, HeraldError::DecisionContractViolation(_)));
        }

        #[test]
        fn test_parse_classification() {
            let data = json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {
                        "name": "classify_email",
                        "arguments": "{\"reasoning\":\"maintenance notice\",\"classification\":\"notify\"}"
                    }
                }]}}]
            });
            match OpenAiDecider::parse_response(DecisionMode::Classify, &data).unwrap() {
                Decision::Classify(raw) => assert_eq!(raw.category, "notify"),
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_parse_classification_missing_field() {
            let data = json!({
                "choices": [{"message": {"tool_calls": [{
                    "id": "call_1",
                    "function": {"name": "classify_email", "arguments": "{\"reasoning\":\"x\"}"}
                }]}}]
            });
            assert!(OpenAiDecider::parse_response(DecisionMode::Classify, &data).is_err());
        }
    }

    // ── Throttling ─────────────────────────────────────────────

    mod throttle {
        use super::*;
        use std::sync::Arc;
        use std::time::Duration;

        #[tokio::test]
        async fn test_limits_concurrent_decisions() {
            let mock = Arc::new(
                MockDecider::new("m")
                    .with_latency(Duration::from_millis(20))
                    .with_fallback(MockDecision::tool_call("Done", json!({}))),
            );
            let throttled = Arc::new(ThrottledDecider::new(mock.clone(), 2));
            assert_eq!(throttled.limit(), 2);

            let mut handles = Vec::new();
            for _ in 0..6 {
                let t = Arc::clone(&throttled);
                handles.push(tokio::spawn(async move {
                    t.decide(&act_request(&["Done"])).await
                }));
            }
            for h in handles {
                assert!(h.await.unwrap().is_ok());
            }
            assert!(mock.peak_in_flight() <= 2);
            assert_eq!(mock.requests.lock().len(), 6);
            assert_eq!(throttled.available(), 2);
        }

        #[test]
        fn test_zero_limit_clamped() {
            let mock = Arc::new(MockDecider::new("m"));
            let throttled = ThrottledDecider::new(mock, 0);
            assert_eq!(throttled.limit(), 1);
        }
    }
}
