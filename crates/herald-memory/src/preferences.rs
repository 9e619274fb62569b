use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use herald_core::{HeraldError, Namespace, Result, RunId, VerdictKind};

use crate::defaults::default_rules;

/// Attempts before a contended merge gives up.
const MAX_MERGE_ATTEMPTS: usize = 64;

/// One preference rule. Rules sharing a key supersede each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub text: String,
}

impl Rule {
    pub fn keyed(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            text: text.into(),
        }
    }

    pub fn unkeyed(text: impl Into<String>) -> Self {
        Self {
            key: None,
            text: text.into(),
        }
    }
}

/// The ordered rule list of one namespace at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceDocument {
    pub namespace: Namespace,
    /// 0 until the namespace is first written.
    pub version: i64,
    pub rules: Vec<Rule>,
}

impl PreferenceDocument {
    pub fn empty(namespace: Namespace) -> Self {
        Self {
            namespace,
            version: 0,
            rules: vec![],
        }
    }

    pub fn rule(&self, key: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.key.as_deref() == Some(key))
    }

    /// Append-with-supersede: a keyed correction replaces the rule with the same key in place.
    pub fn apply(&mut self, correction: &Correction) {
        let rule = Rule {
            key: correction.rule_key.clone(),
            text: correction.text.clone(),
        };
        if let Some(key) = &correction.rule_key
            && let Some(existing) = self
                .rules
                .iter_mut()
                .find(|r| r.key.as_deref() == Some(key.as_str()))
        {
            *existing = rule;
            return;
        }
        self.rules.push(rule);
    }

    /// Markdown bullet list used in decision contexts.
    pub fn render(&self) -> String {
        if self.rules.is_empty() {
            return "(none)".into();
        }
        self.rules
            .iter()
            .map(|r| format!("- {}", r.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A requested change to one namespace, as produced by the feedback adapter or an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub namespace: Namespace,
    pub rule_key: Option<String>,
    pub text: String,
    /// Run whose verdict produced this correction, if any.
    pub run_id: Option<RunId>,
    pub verdict: Option<VerdictKind>,
}

impl Correction {
    /// A keyed correction that supersedes any earlier rule with the same key.
    pub fn rule(namespace: Namespace, key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            namespace,
            rule_key: Some(key.into()),
            text: text.into(),
            run_id: None,
            verdict: None,
        }
    }

    /// An unkeyed correction, always appended.
    pub fn note(namespace: Namespace, text: impl Into<String>) -> Self {
        Self {
            namespace,
            rule_key: None,
            text: text.into(),
            run_id: None,
            verdict: None,
        }
    }

    pub fn from_verdict(mut self, run_id: RunId, verdict: VerdictKind) -> Self {
        self.run_id = Some(run_id);
        self.verdict = Some(verdict);
        self
    }
}

/// One row of the correction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub id: i64,
    pub namespace: Namespace,
    pub rule_key: Option<String>,
    pub text: String,
    pub run_id: Option<RunId>,
    pub verdict: Option<String>,
    /// Namespace version this correction produced.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// All namespaces read together, once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    docs: BTreeMap<Namespace, PreferenceDocument>,
}

impl PreferenceSnapshot {
    pub fn get(&self, namespace: Namespace) -> PreferenceDocument {
        self.docs
            .get(&namespace)
            .cloned()
            .unwrap_or_else(|| PreferenceDocument::empty(namespace))
    }

    pub fn render(&self, namespace: Namespace) -> String {
        self.get(namespace).render()
    }

    pub fn documents(&self) -> impl Iterator<Item = &PreferenceDocument> {
        self.docs.values()
    }
}

/// Namespaced preference documents with compare-and-swap merges.
pub struct PreferenceStore {
    db: Arc<Mutex<Connection>>,
}

fn mem_err(e: rusqlite::Error) -> HeraldError {
    HeraldError::Memory(e.to_string())
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| HeraldError::Persistence(format!("bad timestamp '{raw}': {e}")))
}

impl PreferenceStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Current document for a namespace. Unwritten namespaces read as empty, version 0.
    pub fn read(&self, namespace: Namespace) -> Result<PreferenceDocument> {
        let db = self.db.lock();
        Self::read_row(&db, namespace)
    }

    fn read_row(conn: &Connection, namespace: Namespace) -> Result<PreferenceDocument> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT version, rules FROM preferences WHERE namespace = ?1",
                rusqlite::params![namespace.key()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(mem_err)?;
        match row {
            None => Ok(PreferenceDocument::empty(namespace)),
            Some((version, rules)) => Ok(PreferenceDocument {
                namespace,
                version,
                rules: serde_json::from_str(&rules)?,
            }),
        }
    }

    /// Every namespace under one lock, so the set is mutually consistent.
    pub fn snapshot(&self) -> Result<PreferenceSnapshot> {
        let db = self.db.lock();
        let mut docs = BTreeMap::new();
        for ns in Namespace::ALL {
            docs.insert(ns, Self::read_row(&db, ns)?);
        }
        Ok(PreferenceSnapshot { docs })
    }

    /// Write `rules` only if the namespace is still at `expected` version.
    /// Returns the new version, or `MergeConflict` if another writer got there first.
    fn compare_and_swap(
        &self,
        namespace: Namespace,
        expected: i64,
        rules: &[Rule],
        history: Option<&Correction>,
    ) -> Result<i64> {
        let rules_json = serde_json::to_string(rules)?;
        let now = Utc::now().to_rfc3339();
        let next = expected + 1;

        let mut db = self.db.lock();
        let tx = db.transaction().map_err(mem_err)?;
        let written = if expected == 0 {
            tx.execute(
                "INSERT INTO preferences (namespace, version, rules, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace) DO NOTHING",
                rusqlite::params![namespace.key(), next, rules_json, now],
            )
        } else {
            tx.execute(
                "UPDATE preferences SET version = ?2, rules = ?3, updated_at = ?4
                 WHERE namespace = ?1 AND version = ?5",
                rusqlite::params![namespace.key(), next, rules_json, now, expected],
            )
        }
        .map_err(mem_err)?;

        if written == 0 {
            return Err(HeraldError::MergeConflict {
                namespace: namespace.key().into(),
            });
        }

        if let Some(c) = history {
            tx.execute(
                "INSERT INTO corrections (namespace, rule_key, text, run_id, verdict, version, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    namespace.key(),
                    c.rule_key,
                    c.text,
                    c.run_id.map(|id| id.to_string()),
                    c.verdict.map(|v| v.as_str()),
                    next,
                    now,
                ],
            )
            .map_err(mem_err)?;
        }

        tx.commit().map_err(mem_err)?;
        Ok(next)
    }

    /// Read-modify-write with retry until the swap lands.
    fn update_with<F>(&self, namespace: Namespace, history: Option<&Correction>, f: F) -> Result<PreferenceDocument>
    where
        F: Fn(&mut PreferenceDocument),
    {
        for attempt in 1..=MAX_MERGE_ATTEMPTS {
            let mut doc = self.read(namespace)?;
            let expected = doc.version;
            f(&mut doc);
            match self.compare_and_swap(namespace, expected, &doc.rules, history) {
                Ok(version) => {
                    doc.version = version;
                    return Ok(doc);
                }
                Err(HeraldError::MergeConflict { .. }) => {
                    debug!(%namespace, attempt, "preference merge conflict, retrying");
                    std::thread::yield_now();
                }
                Err(e) => return Err(e),
            }
        }
        Err(HeraldError::MergeConflict {
            namespace: namespace.key().into(),
        })
    }

    /// Apply a correction (append-with-supersede) and record it in the history.
    pub fn merge(&self, correction: &Correction) -> Result<PreferenceDocument> {
        let doc = self.update_with(correction.namespace, Some(correction), |doc| {
            doc.apply(correction)
        })?;
        info!(
            namespace = %correction.namespace,
            rule_key = ?correction.rule_key,
            version = doc.version,
            "preference merged"
        );
        Ok(doc)
    }

    /// Operator edit: set one keyed rule.
    pub fn set_rule(&self, namespace: Namespace, key: &str, text: &str) -> Result<PreferenceDocument> {
        self.merge(&Correction::rule(namespace, key, text))
    }

    /// Operator edit: replace the whole rule list.
    pub fn replace(&self, namespace: Namespace, rules: Vec<Rule>) -> Result<PreferenceDocument> {
        let note = Correction::note(namespace, format!("replaced with {} rule(s)", rules.len()));
        let doc = self.update_with(namespace, Some(&note), |doc| doc.rules = rules.clone())?;
        info!(%namespace, version = doc.version, "preferences replaced");
        Ok(doc)
    }

    /// Seed default rules into namespaces that were never written. Returns how many were seeded.
    pub fn seed_defaults(&self, background: Option<&str>) -> Result<usize> {
        let mut seeded = 0;
        for ns in Namespace::ALL {
            if self.read(ns)?.version > 0 {
                continue;
            }
            match self.compare_and_swap(ns, 0, &default_rules(ns, background), None) {
                Ok(_) => seeded += 1,
                // Someone else wrote it first; theirs wins.
                Err(HeraldError::MergeConflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if seeded > 0 {
            info!(seeded, "seeded default preferences");
        }
        Ok(seeded)
    }

    /// Most recent corrections for a namespace, oldest first.
    pub fn history(&self, namespace: Namespace, limit: usize) -> Result<Vec<CorrectionRecord>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, rule_key, text, run_id, verdict, version, created_at
                 FROM corrections WHERE namespace = ?1
                 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(mem_err)?;
        let rows = stmt
            .query_map(rusqlite::params![namespace.key(), limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(mem_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(mem_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, rule_key, text, run_id, verdict, version, created_at) in rows.into_iter().rev() {
            let run_id = run_id
                .map(|s| s.parse::<RunId>())
                .transpose()
                .map_err(|e| HeraldError::Persistence(e.to_string()))?;
            records.push(CorrectionRecord {
                id,
                namespace,
                rule_key,
                text,
                run_id,
                verdict,
                version,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(records)
    }
}
