use async_trait::async_trait;
use herald_core::{DONE_TOOL, HeraldError, Result, RiskTier, ToolCall, ToolExecutor, ToolSpec};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::calendar::{Calendar, CheckCalendarAvailability, ScheduleMeeting};
use crate::mail::{Outbox, WriteEmail};
use crate::schema::{validate_arguments, validate_schema};

/// One executable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Run with already-validated arguments and return the textual result.
    async fn invoke(&self, args: &Value) -> Result<String>;
}

/// Schema of the completion signal.
pub fn done_spec() -> ToolSpec {
    ToolSpec {
        name: DONE_TOOL.into(),
        description: "Call when the email has been fully handled and no further action is needed.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "done": { "type": "boolean", "description": "Always true." }
            },
            "required": ["done"]
        }),
        risk_tier: RiskTier::Safe,
    }
}

/// Name → handler map. Registration order is the advertised order; `Done` is always last.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the simulated email and calendar tools.
    pub fn with_builtins(outbox: Arc<Outbox>, calendar: Arc<Calendar>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WriteEmail::new(outbox)))?;
        registry.register(Arc::new(ScheduleMeeting::new(Arc::clone(&calendar))))?;
        registry.register(Arc::new(CheckCalendarAvailability::new(calendar)))?;
        Ok(registry)
    }

    /// Add a tool. Its schema is validated here, not at call time.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let spec = handler.spec();
        if spec.name.trim().is_empty() {
            return Err(HeraldError::InvalidToolSchema {
                tool: spec.name,
                reason: "tool name is empty".into(),
            });
        }
        if spec.is_completion_signal() {
            return Err(HeraldError::InvalidToolSchema {
                tool: spec.name,
                reason: "name is reserved for the completion signal".into(),
            });
        }
        if self.handlers.contains_key(&spec.name) {
            return Err(HeraldError::InvalidToolSchema {
                tool: spec.name,
                reason: "a tool with this name is already registered".into(),
            });
        }
        validate_schema(&spec.name, &spec.parameters)?;

        info!(tool = %spec.name, tier = spec.risk_tier.as_str(), "tool registered");
        self.order.push(spec.name.clone());
        self.handlers.insert(spec.name, handler);
        Ok(())
    }

    pub fn has_tool(&self, name: &str) -> bool {
        name == DONE_TOOL || self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|h| h.spec())
            .collect();
        specs.push(done_spec());
        specs
    }

    fn spec(&self, name: &str) -> Option<ToolSpec> {
        if name == DONE_TOOL {
            return Some(done_spec());
        }
        self.handlers.get(name).map(|h| h.spec())
    }

    fn validate(&self, call: &ToolCall) -> Result<()> {
        let spec = self
            .spec(&call.tool_name)
            .ok_or_else(|| HeraldError::ToolNotFound(call.tool_name.clone()))?;
        validate_arguments(&spec.name, &spec.parameters, &call.arguments)
    }

    async fn invoke(&self, call: &ToolCall) -> Result<String> {
        if call.is_done() {
            return Err(HeraldError::ToolExecution {
                tool: call.tool_name.clone(),
                reason: "the completion signal is never executed".into(),
            });
        }
        let handler = self
            .handlers
            .get(&call.tool_name)
            .ok_or_else(|| HeraldError::ToolNotFound(call.tool_name.clone()))?;
        self.validate(call)?;
        debug!(tool = %call.tool_name, call_id = %call.id, "invoking tool");
        handler.invoke(&call.arguments).await
    }
}
