#[cfg(test)]
mod tests {
    use clap::Parser;
    use herald_cli::Cli;
    use herald_cli::input::*;
    use herald_core::{HeraldError, Namespace, RunStatus};
    use herald_memory::Rule;
    use serde_json::json;

    // ── Email input ────────────────────────────────────────────

    mod emails {
        use super::*;

        #[test]
        fn test_dataset_field_names() {
            let emails = parse_emails(
                r#"{
                    "author": "Alice Smith <alice.smith@company.com>",
                    "to": "Lance Martin <lance@company.com>",
                    "subject": "Quick question about API documentation",
                    "email_thread": "Hi Lance, ..."
                }"#,
            )
            .unwrap();
            assert_eq!(emails.len(), 1);
            assert_eq!(emails[0].recipients, "Lance Martin <lance@company.com>");
            assert_eq!(emails[0].thread_text, "Hi Lance, ...");
        }

        #[test]
        fn test_array_input() {
            let emails = parse_emails(
                r#"[
                    {"author": "a", "recipients": "b", "subject": "one", "thread_text": "x"},
                    {"author": "c", "recipients": "d", "subject": "two", "thread_text": "y"}
                ]"#,
            )
            .unwrap();
            let subjects: Vec<&str> = emails.iter().map(|e| e.subject.as_str()).collect();
            assert_eq!(subjects, vec!["one", "two"]);
        }

        #[test]
        fn test_empty_or_malformed_input() {
            assert!(parse_emails("[]").is_err());
            assert!(parse_emails(r#"{"author": "a"}"#).is_err());
            assert!(parse_emails("not json").is_err());
        }

        #[test]
        fn test_inline_fields_default_recipient() {
            let args = EmailArgs {
                from: Some("pm@client.com".into()),
                subject: Some("Tax season".into()),
                body: Some("Can we meet?".into()),
                ..Default::default()
            };
            let emails = args.emails("lance@company.com").unwrap();
            assert_eq!(emails[0].recipients, "lance@company.com");
            assert_eq!(emails[0].author, "pm@client.com");
        }

        #[test]
        fn test_inline_fields_incomplete() {
            let args = EmailArgs {
                from: Some("pm@client.com".into()),
                ..Default::default()
            };
            assert!(matches!(
                args.emails("lance@company.com"),
                Err(HeraldError::Config(_))
            ));
        }

        #[test]
        fn test_file_input() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("email.json");
            std::fs::write(
                &path,
                r#"{"author": "a", "to": "b", "subject": "s", "email_thread": "t"}"#,
            )
            .unwrap();
            let args = EmailArgs {
                file: Some(path),
                ..Default::default()
            };
            assert_eq!(args.emails("ignored").unwrap()[0].subject, "s");
        }
    }

    // ── Verdict input ──────────────────────────────────────────

    mod edits {
        use super::*;

        #[test]
        fn test_set_overrides_proposed_values() {
            let proposed = json!({"subject": "Sync", "duration_minutes": 30});
            let sets = vec![
                ("duration_minutes".to_string(), "15".to_string()),
                ("start_time".to_string(), "2:00 PM".to_string()),
            ];
            let edited = apply_edits(&proposed, None, &sets).unwrap();
            assert_eq!(
                edited,
                json!({"subject": "Sync", "duration_minutes": 15, "start_time": "2:00 PM"})
            );
        }

        #[test]
        fn test_args_replace_proposed() {
            let proposed = json!({"to": "a", "subject": "s", "content": "old"});
            let edited = apply_edits(
                &proposed,
                Some(r#"{"to": "a", "subject": "s", "content": "new"}"#),
                &[],
            )
            .unwrap();
            assert_eq!(edited["content"], "new");
        }

        #[test]
        fn test_empty_edit_rejected() {
            let err = apply_edits(&json!({}), None, &[]).unwrap_err();
            assert!(matches!(err, HeraldError::InvalidVerdict(_)));
        }

        #[test]
        fn test_non_object_args_rejected() {
            let err = apply_edits(&json!({}), Some("[1, 2]"), &[]).unwrap_err();
            assert!(matches!(err, HeraldError::InvalidVerdict(_)));
        }

        #[test]
        fn test_parse_key_val() {
            assert_eq!(
                parse_key_val("a=b=c").unwrap(),
                ("a".to_string(), "b=c".to_string())
            );
            assert!(parse_key_val("novalue").is_err());
        }
    }

    // ── Preferences input ──────────────────────────────────────

    mod prefs {
        use super::*;

        #[test]
        fn test_rules_from_json() {
            let rules = parse_rules(
                r#"[{"key": "schedule_meeting.duration_minutes", "text": "15 minutes"}, {"text": "Be brief"}]"#,
            )
            .unwrap();
            assert_eq!(
                rules,
                vec![
                    Rule::keyed("schedule_meeting.duration_minutes", "15 minutes"),
                    Rule::unkeyed("Be brief"),
                ]
            );
        }

        #[test]
        fn test_rules_from_text() {
            let rules = parse_rules("- Be brief\n\nSign off as Lance\n").unwrap();
            assert_eq!(
                rules,
                vec![Rule::unkeyed("Be brief"), Rule::unkeyed("Sign off as Lance")]
            );
        }

        #[test]
        fn test_namespace_aliases() {
            assert_eq!(parse_namespace("calendar").unwrap(), Namespace::Calendar);
            assert_eq!(parse_namespace("cal_preferences").unwrap(), Namespace::Calendar);
            assert_eq!(parse_namespace("response").unwrap(), Namespace::ResponseStyle);
            assert!(parse_namespace("inbox").is_err());
        }

        #[test]
        fn test_status_parse() {
            assert_eq!(parse_status("Suspended").unwrap(), RunStatus::Suspended);
            assert!(parse_status("paused").is_err());
        }
    }

    // ── Command surface ────────────────────────────────────────

    mod surface {
        use super::*;

        const RUN_ID: &str = "6f1c2a7e-7d7b-4a45-9a39-2b8f0b1f4c11";

        #[test]
        fn test_run_inline() {
            assert!(
                Cli::try_parse_from([
                    "herald", "run", "--from", "a@b.c", "--subject", "s", "--body", "b"
                ])
                .is_ok()
            );
        }

        #[test]
        fn test_file_conflicts_with_inline_fields() {
            assert!(
                Cli::try_parse_from(["herald", "run", "--file", "x.json", "--from", "a@b.c"])
                    .is_err()
            );
        }

        #[test]
        fn test_verdict_commands() {
            assert!(Cli::try_parse_from(["herald", "approve", RUN_ID]).is_ok());
            assert!(
                Cli::try_parse_from(["herald", "edit", RUN_ID, "--set", "duration_minutes=15"])
                    .is_ok()
            );
            assert!(Cli::try_parse_from(["herald", "edit", RUN_ID, "--set", "bad"]).is_err());
            assert!(Cli::try_parse_from(["herald", "reject", RUN_ID, "-r", "not now"]).is_ok());
            assert!(Cli::try_parse_from(["herald", "respond", RUN_ID, "I'll handle it"]).is_ok());
            assert!(Cli::try_parse_from(["herald", "approve", "not-a-uuid"]).is_err());
        }

        #[test]
        fn test_cancel_and_abandon() {
            assert!(Cli::try_parse_from(["herald", "cancel", RUN_ID]).is_ok());
            assert!(Cli::try_parse_from(["herald", "cancel", RUN_ID, "--abandon"]).is_ok());
        }

        #[test]
        fn test_listing_and_prefs() {
            assert!(Cli::try_parse_from(["herald", "runs", "--status", "failed", "-n", "5"]).is_ok());
            assert!(Cli::try_parse_from(["herald", "runs", "--status", "paused"]).is_err());
            assert!(Cli::try_parse_from(["herald", "prefs", "show", "calendar"]).is_ok());
            assert!(Cli::try_parse_from(["herald", "prefs", "history", "triage", "-n", "3"]).is_ok());
            assert!(Cli::try_parse_from(["herald", "prefs", "show", "inbox"]).is_err());
        }

        #[test]
        fn test_verbose_conflicts_with_quiet() {
            assert!(Cli::try_parse_from(["herald", "-v", "-q", "pending"]).is_err());
        }
    }
}
