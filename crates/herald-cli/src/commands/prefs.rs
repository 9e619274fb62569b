use tracing::info;

use herald_config::HeraldConfig;
use herald_core::{HeraldError, Namespace, Result};
use herald_memory::{MemoryStore, PreferenceDocument};

use super::{PrefsAction, open_memory};
use crate::input::parse_rules;
use crate::style;

pub(super) fn cmd_prefs(config: &HeraldConfig, action: PrefsAction) -> Result<()> {
    let memory = open_memory(config)?;
    match action {
        PrefsAction::Show { namespace, json } => show(&memory, namespace, json),
        PrefsAction::Set {
            namespace,
            key,
            text,
        } => {
            let doc = memory.preferences.set_rule(namespace, &key, &text)?;
            info!(%namespace, %key, version = doc.version, "preference rule set by operator");
            println!(
                "{} {namespace}.{key} (v{})",
                style::success("updated"),
                doc.version
            );
            Ok(())
        }
        PrefsAction::History { namespace, limit } => history(&memory, namespace, limit),
        PrefsAction::Replace { namespace, file } => {
            let raw = std::fs::read_to_string(&file).map_err(|e| {
                HeraldError::Config(format!("cannot read {}: {e}", file.display()))
            })?;
            let rules = parse_rules(&raw)?;
            let doc = memory.preferences.replace(namespace, rules)?;
            info!(%namespace, rules = doc.rules.len(), version = doc.version, "preferences replaced by operator");
            println!(
                "{} {namespace}: {} rule(s) (v{})",
                style::success("replaced"),
                doc.rules.len(),
                doc.version
            );
            Ok(())
        }
        PrefsAction::Seed => {
            let seeded = memory
                .preferences
                .seed_defaults(config.user.background.as_deref())?;
            println!("Seeded {seeded} namespace(s).");
            Ok(())
        }
    }
}

fn show(memory: &MemoryStore, namespace: Option<Namespace>, json: bool) -> Result<()> {
    let docs: Vec<PreferenceDocument> = match namespace {
        Some(ns) => vec![memory.preferences.read(ns)?],
        None => {
            let snapshot = memory.preferences.snapshot()?;
            Namespace::ALL.into_iter().map(|ns| snapshot.get(ns)).collect()
        }
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }
    for doc in &docs {
        println!(
            "{} {}",
            style::header(doc.namespace.title()),
            style::dim(format!("({}, v{})", doc.namespace, doc.version))
        );
        if doc.rules.is_empty() {
            println!("  {}", style::dim("(none)"));
        }
        for rule in &doc.rules {
            match &rule.key {
                Some(key) => println!("  - {} {}", style::label(format!("[{key}]")), rule.text),
                None => println!("  - {}", rule.text),
            }
        }
        println!();
    }
    Ok(())
}

fn history(memory: &MemoryStore, namespace: Namespace, limit: usize) -> Result<()> {
    let records = memory.preferences.history(namespace, limit)?;
    if records.is_empty() {
        println!("No corrections recorded for {namespace}.");
        return Ok(());
    }
    for record in &records {
        let source = match (&record.verdict, record.run_id) {
            (Some(verdict), Some(run_id)) => format!("{verdict} in {run_id}"),
            _ => "operator".into(),
        };
        println!(
            "{} v{:<3} {}",
            style::dim(record.created_at.format("%Y-%m-%d %H:%M")),
            record.version,
            style::label(source)
        );
        match &record.rule_key {
            Some(key) => println!("   [{key}] {}", record.text),
            None => println!("   {}", record.text),
        }
    }
    Ok(())
}
