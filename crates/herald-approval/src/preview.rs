use herald_core::ToolCall;
use serde_json::Value;

/// Human-readable rendering of a proposed call, shown in the interrupt request.
pub fn render_preview(call: &ToolCall) -> String {
    match call.tool_name.as_str() {
        "write_email" => email_draft(&call.arguments),
        "schedule_meeting" => calendar_invite(&call.arguments),
        _ => generic(call),
    }
}

fn field<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("(missing)")
}

fn email_draft(args: &Value) -> String {
    format!(
        "# Email Draft\n\n**To**: {}\n**Subject**: {}\n\n{}",
        field(args, "to"),
        field(args, "subject"),
        field(args, "content"),
    )
}

fn calendar_invite(args: &Value) -> String {
    let attendees = match args.get("attendees") {
        Some(Value::Array(list)) => list
            .iter()
            .map(|a| a.as_str().map(String::from).unwrap_or_else(|| a.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
        None => "(missing)".into(),
    };
    let duration = args
        .get("duration_minutes")
        .map(|d| match d {
            Value::Number(n) => format!("{n} minutes"),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "(missing)".into());

    format!(
        "# Calendar Invite\n\n**Meeting**: {}\n**Attendees**: {}\n**Day**: {}\n**Start**: {}\n**Duration**: {}",
        field(args, "subject"),
        attendees,
        field(args, "preferred_day"),
        field(args, "start_time"),
        duration,
    )
}

fn generic(call: &ToolCall) -> String {
    let pretty = serde_json::to_string_pretty(&call.arguments)
        .unwrap_or_else(|_| call.arguments.to_string());
    format!("# Tool Call\n\n**Tool**: {}\n**Arguments**:\n{}", call.tool_name, pretty)
}
