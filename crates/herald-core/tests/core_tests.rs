#[cfg(test)]
mod tests {
    use herald_core::*;
    use serde_json::json;

    // ── Conversation tests ─────────────────────────────────────

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, json!({}))
    }

    #[test]
    fn test_turn_text_constructor() {
        let turn = Turn::text(Role::User, "hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text_content(), "hello");
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn test_tool_result_requires_known_call() {
        let mut conv = Conversation::new();
        conv.push_user("hi");
        let err = conv
            .push_tool_result(ToolResult::ok("missing", "x"))
            .unwrap_err();
        assert!(matches!(err, HeraldError::ConversationInvariant(_)));
    }

    #[test]
    fn test_at_most_one_result_per_call() {
        let mut conv = Conversation::new();
        conv.push_assistant("", vec![call("c1", "check_calendar_availability")])
            .unwrap();
        conv.push_tool_result(ToolResult::ok("c1", "free at 9")).unwrap();
        let err = conv.push_tool_result(ToolResult::ok("c1", "again")).unwrap_err();
        assert!(matches!(err, HeraldError::ConversationInvariant(_)));
        assert_eq!(conv.tool_results().count(), 1);
    }

    #[test]
    fn test_duplicate_call_ids_rejected() {
        let mut conv = Conversation::new();
        let err = conv
            .push_assistant("", vec![call("c1", "a"), call("c1", "b")])
            .unwrap_err();
        assert!(matches!(err, HeraldError::DecisionContractViolation(_)));

        conv.push_assistant("", vec![call("c1", "a")]).unwrap();
        let err = conv.push_assistant("", vec![call("c1", "b")]).unwrap_err();
        assert!(matches!(err, HeraldError::DecisionContractViolation(_)));
    }

    #[test]
    fn test_unanswered_calls_preserve_order() {
        let mut conv = Conversation::new();
        conv.push_assistant("", vec![call("a", "x"), call("b", "y"), call("c", "z")])
            .unwrap();
        conv.push_tool_result(ToolResult::ok("a", "done")).unwrap();
        let ids: Vec<String> = conv.unanswered_calls().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_system_text_and_dialogue() {
        let mut conv = Conversation::new();
        conv.push_system("you are an assistant");
        conv.push_user("email body");
        assert_eq!(conv.system_text(), "you are an assistant");
        let dialogue = conv.dialogue();
        assert_eq!(dialogue.len(), 1);
        assert_eq!(dialogue[0].role, Role::User);
    }

    #[test]
    fn test_final_text_for_response() {
        let mut conv = Conversation::new();
        conv.push_user("email");
        conv.push_final_response("Thanks, I'll be there.");
        assert_eq!(conv.final_text().as_deref(), Some("Thanks, I'll be there."));
    }

    #[test]
    fn test_edited_result_flag_survives_serde() {
        let mut conv = Conversation::new();
        conv.push_assistant("", vec![call("c1", "schedule_meeting")]).unwrap();
        conv.push_tool_result(ToolResult::ok("c1", "scheduled").edited())
            .unwrap();
        let json = serde_json::to_string(&conv).unwrap();
        let restored: Conversation = serde_json::from_str(&json).unwrap();
        let result = restored.tool_results().next().unwrap();
        assert!(result.is_edited_result());
        assert!(restored.has_result("c1"));
    }

    // ── Type tests ─────────────────────────────────────────────

    #[test]
    fn test_category_parse_is_strict() {
        assert_eq!("respond".parse::<Category>().unwrap(), Category::Respond);
        assert_eq!(" Notify ".parse::<Category>().unwrap(), Category::Notify);
        assert!("reply".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
        assert!(matches!(
            "maybe".parse::<Category>().unwrap_err(),
            HeraldError::DecisionContractViolation(_)
        ));
    }

    #[test]
    fn test_category_terminality() {
        assert!(Category::Ignore.is_terminal());
        assert!(Category::Notify.is_terminal());
        assert!(!Category::Respond.is_terminal());
    }

    #[test]
    fn test_namespace_aliases() {
        assert_eq!("calendar".parse::<Namespace>().unwrap(), Namespace::Calendar);
        assert_eq!(
            "cal_preferences".parse::<Namespace>().unwrap(),
            Namespace::Calendar
        );
        assert_eq!("triage".parse::<Namespace>().unwrap(), Namespace::Triage);
        assert!("nope".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_email_accepts_dataset_field_names() {
        let email: Email = serde_json::from_value(json!({
            "author": "Alice <alice@example.com>",
            "to": "Lance <lance@example.com>",
            "subject": "Quick question",
            "email_thread": "Can we meet?"
        }))
        .unwrap();
        assert_eq!(email.recipients, "Lance <lance@example.com>");
        assert_eq!(email.thread_text, "Can we meet?");
        assert!(email.to_markdown().contains("**Subject**: Quick question"));
    }

    // ── Verdict tests ──────────────────────────────────────────

    #[test]
    fn test_verdict_tagging() {
        let v: Verdict = serde_json::from_value(json!({
            "kind": "edit",
            "arguments": {"duration_minutes": 15}
        }))
        .unwrap();
        assert_eq!(v.kind(), VerdictKind::Edit);
        assert!(v.implies_correction());

        let v: Verdict = serde_json::from_value(json!({"kind": "respond_instead", "text": "hi"}))
            .unwrap();
        assert_eq!(v.kind(), VerdictKind::RespondInstead);
        assert!(!v.implies_correction());
    }

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_run_failed_root() {
        let run_id = uuid::Uuid::new_v4();
        let err = HeraldError::run_failed(run_id, HeraldError::BoundedLoopExceeded { rounds: 3 });
        assert!(matches!(
            err.root(),
            HeraldError::BoundedLoopExceeded { rounds: 3 }
        ));
        // Wrapping twice does not nest.
        let again = HeraldError::run_failed(run_id, err);
        assert!(matches!(again, HeraldError::RunFailed { ref source, .. } if !matches!(**source, HeraldError::RunFailed { .. })));
    }

    #[test]
    fn test_tool_local_errors() {
        let err = HeraldError::ToolExecution {
            tool: "write_email".into(),
            reason: "smtp down".into(),
        };
        assert!(err.is_tool_local());
        assert!(!HeraldError::DecisionPort("x".into()).is_tool_local());
    }

    // ── EventBus tests ─────────────────────────────────────────

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = uuid::Uuid::new_v4();
        bus.publish(Event::RunCompleted { run_id });
        match rx.recv().await.unwrap() {
            Event::RunCompleted { run_id: got } => assert_eq!(got, run_id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::default();
        bus.publish(Event::RunFailed {
            run_id: uuid::Uuid::new_v4(),
            error: "x".into(),
        });
    }
}
