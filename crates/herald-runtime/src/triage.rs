use std::sync::Arc;
use tracing::info;

use herald_config::UserConfig;
use herald_core::{Classification, Email, Result, Role, Turn};
use herald_llm::{DecisionMode, DecisionPort, DecisionRequest, validate_classify};
use herald_memory::PreferenceSnapshot;

use crate::agent_loop::LoopSettings;
use crate::prompts;

/// Classifies one email into ignore / notify / respond with exactly one decision.
pub struct TriageStage {
    decider: Arc<dyn DecisionPort>,
    settings: LoopSettings,
}

impl TriageStage {
    pub fn new(decider: Arc<dyn DecisionPort>, settings: LoopSettings) -> Self {
        Self { decider, settings }
    }

    pub fn request(&self, email: &Email, user: &UserConfig, prefs: &PreferenceSnapshot) -> DecisionRequest {
        DecisionRequest {
            mode: DecisionMode::Classify,
            model: self.settings.model.clone(),
            system_context: prompts::triage_system_context(user, prefs),
            conversation: vec![Turn::text(Role::User, prompts::triage_user_turn(email))],
            tools: vec![],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// A category outside the fixed enum is a contract violation, never a guess.
    pub async fn classify(&self, email: &Email, user: &UserConfig, prefs: &PreferenceSnapshot) -> Result<Classification> {
        let request = self.request(email, user, prefs);
        let decision = self.decider.decide(&request).await?;
        let classification = validate_classify(decision)?;
        info!(
            subject = %email.subject,
            category = %classification.category,
            "email triaged"
        );
        Ok(classification)
    }
}
