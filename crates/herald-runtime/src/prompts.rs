//! Decision contexts. Wording is deliberately plain; the preference
//! documents carry everything user-specific.

use chrono::Utc;
use herald_config::UserConfig;
use herald_core::{Email, Namespace, ToolSpec};
use herald_memory::PreferenceSnapshot;

/// System context for classifying one email.
pub fn triage_system_context(user: &UserConfig, prefs: &PreferenceSnapshot) -> String {
    format!(
        "You are {name}'s executive assistant. You help {name} manage their inbox.\n\n\
         < Background >\n{background}\n</ Background >\n\n\
         < Instructions >\n\
         {name} gets lots of emails. Categorize each email into one of three categories:\n\
         1. ignore - emails that are not worth responding to or tracking\n\
         2. notify - important information that {name} should know about but that doesn't require a response\n\
         3. respond - emails that need a direct response from {name}\n\
         Classify the email below into one of these categories.\n\
         </ Instructions >\n\n\
         < Rules >\n{triage}\n</ Rules >",
        name = user.name,
        background = prefs.render(Namespace::Background),
        triage = prefs.render(Namespace::Triage),
    )
}

/// System context for the tool-calling loop. Captured once when the run starts.
pub fn agent_system_context(user: &UserConfig, prefs: &PreferenceSnapshot, tools: &[ToolSpec]) -> String {
    let tool_lines = tools
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} - {}", i + 1, t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "< Role >\nYou are {full_name}'s executive assistant ({email}). You are a top-notch \
         executive assistant who cares about {name} performing as well as possible.\n</ Role >\n\n\
         < Background >\n{background}\n</ Background >\n\n\
         < Tools >\nYou have access to the following tools to help manage {name}'s communications and schedule:\n\
         {tool_lines}\n</ Tools >\n\n\
         < Instructions >\n\
         When handling emails, follow these steps:\n\
         1. Carefully analyze the email content and purpose.\n\
         2. Always call a tool. Never answer with text alone.\n\
         3. For responding to the email, draft a response with write_email.\n\
         4. For meeting requests, check availability with check_calendar_availability, \
            then schedule with schedule_meeting.\n\
         5. If scheduling a meeting, then draft a short response with write_email.\n\
         6. After sending the email, call Done.\n\
         Today's date is {today}. Use it for scheduling.\n\
         </ Instructions >\n\n\
         < Response Preferences >\n{response}\n</ Response Preferences >\n\n\
         < Calendar Preferences >\n{calendar}\n</ Calendar Preferences >",
        full_name = user.full_name,
        email = user.email,
        name = user.name,
        background = prefs.render(Namespace::Background),
        response = prefs.render(Namespace::ResponseStyle),
        calendar = prefs.render(Namespace::Calendar),
        today = Utc::now().format("%Y-%m-%d"),
    )
}

/// The user turn handed to triage.
pub fn triage_user_turn(email: &Email) -> String {
    format!(
        "Please determine how to handle the below email thread:\n\n\
         From: {}\nTo: {}\nSubject: {}\n{}",
        email.author, email.recipients, email.subject, email.thread_text
    )
}

/// The user turn that seeds the tool loop.
pub fn respond_user_turn(email: &Email) -> String {
    format!("Respond to the email:\n\n{}", email.to_markdown())
}
