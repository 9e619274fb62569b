//! Rules seeded into empty namespaces on first use.

use herald_core::Namespace;

use crate::preferences::Rule;

/// Key of the calendar rule holding the default meeting length.
pub const MEETING_DURATION_KEY: &str = "schedule_meeting.duration_minutes";

/// Default rules for a namespace. `background` replaces the generic profile line.
pub fn default_rules(namespace: Namespace, background: Option<&str>) -> Vec<Rule> {
    match namespace {
        Namespace::Background => vec![Rule::keyed(
            "profile",
            background.unwrap_or(
                "I'm a software engineer. I work on product and infrastructure and \
                 spend a lot of time coordinating with teammates and customers over email.",
            ),
        )],
        Namespace::ResponseStyle => vec![
            Rule::keyed("tone", "Use professional and concise language."),
            Rule::keyed(
                "deadlines",
                "If the email mentions a deadline, explicitly acknowledge and reference it in the reply.",
            ),
            Rule::keyed(
                "technical_questions",
                "When answering technical questions, state what was investigated and what the expected next step is.",
            ),
            Rule::keyed(
                "event_invitations",
                "For conference or event invitations, do not commit to attending; ask clarifying questions about the agenda or logistics.",
            ),
            Rule::keyed(
                "meeting_requests",
                "When a meeting is requested, verify availability first, then propose or book a time and confirm it in the reply.",
            ),
        ],
        Namespace::Calendar => vec![
            Rule::keyed(
                MEETING_DURATION_KEY,
                "Meetings default to 30 minutes; 15 minute meetings are also acceptable.",
            ),
            Rule::keyed(
                "schedule_meeting.working_hours",
                "Only book meetings between 9:00 AM and 5:00 PM on weekdays.",
            ),
        ],
        Namespace::Triage => vec![
            Rule::keyed(
                "ignore",
                "Ignore marketing newsletters, promotional emails, spam, and mass announcements that do not concern you.",
            ),
            Rule::keyed(
                "notify",
                "Notify for team member out sick or on vacation, build system notifications, deployments, \
                 project status updates without action items, and scheduled maintenance notices.",
            ),
            Rule::keyed(
                "respond",
                "Respond to direct questions from team members, meeting requests requiring confirmation, \
                 critical bug reports, and requests from management that need acknowledgment.",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_namespace_has_defaults() {
        for ns in Namespace::ALL {
            assert!(!default_rules(ns, None).is_empty(), "{ns} has no defaults");
        }
    }

    #[test]
    fn background_override() {
        let rules = default_rules(Namespace::Background, Some("I'm Ada, CTO."));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text, "I'm Ada, CTO.");
    }
}
