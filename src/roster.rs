//! Optional local class list with per-student saved barriers and adjustments.
//!
//! Storage sits behind [`RosterStore`]. Callers go through
//! [`load_or_default`], so an unreadable store looks like an empty roster and
//! never reaches the catalog or renderer.

use crate::catalog::Catalog;
use crate::db;
use crate::error::{AssistError, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const PREFS_KEY: &str = "roster.prefs";
const BARRIER_KEY_PREFIX: &str = "barrier:";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAdjustment {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub barrier_id: String,
    #[serde(default)]
    pub note_text: String,
    #[serde(default)]
    pub plan_text: String,
}

impl SavedAdjustment {
    /// Barrier id, taken from the `adj:<barrierId>:<index>` key when unset.
    pub fn barrier_id(&self) -> &str {
        if !self.barrier_id.is_empty() {
            return &self.barrier_id;
        }
        self.key.split(':').nth(1).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default)]
    pub barriers: Vec<String>,
    #[serde(default)]
    pub adjustments: Vec<SavedAdjustment>,
}

/// One row of a student's saved list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedItem {
    pub key: String,
    pub title: String,
    pub meta: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default)]
    pub assignments: BTreeMap<String, Assignment>,
}

impl Roster {
    pub fn has_student(&self, name: &str) -> bool {
        self.students.iter().any(|s| s == name)
    }

    /// Case-insensitive alphabetical order for display.
    pub fn sorted_students(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.students.iter().map(String::as_str).collect();
        out.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        out
    }

    /// Returns false when the trimmed name is empty or already present.
    pub fn add_student(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.has_student(name) {
            return false;
        }
        self.students.push(name.to_string());
        true
    }

    /// Removes the student and everything saved for them.
    pub fn remove_student(&mut self, name: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s != name);
        self.assignments.remove(name);
        self.students.len() != before
    }

    pub fn assignment(&self, student: &str) -> Option<&Assignment> {
        self.assignments.get(student)
    }

    fn assignment_mut(&mut self, student: &str) -> &mut Assignment {
        self.assignments.entry(student.to_string()).or_default()
    }

    pub fn save_barrier(&mut self, student: &str, barrier_id: &str) -> bool {
        let a = self.assignment_mut(student);
        if a.barriers.iter().any(|b| b == barrier_id) {
            return false;
        }
        a.barriers.push(barrier_id.to_string());
        true
    }

    /// Stores `adj`, replacing any entry with the same key and moving it last.
    pub fn save_adjustment(&mut self, student: &str, adj: SavedAdjustment) {
        let a = self.assignment_mut(student);
        a.adjustments.retain(|x| x.key != adj.key);
        a.adjustments.push(adj);
    }

    /// `key` is `barrier:<barrierId>` or a saved adjustment key.
    pub fn remove_item(&mut self, student: &str, key: &str) -> bool {
        let Some(a) = self.assignments.get_mut(student) else {
            return false;
        };
        let before = a.barriers.len() + a.adjustments.len();
        if let Some(bid) = key.strip_prefix(BARRIER_KEY_PREFIX) {
            a.barriers.retain(|b| b != bid);
        }
        a.adjustments.retain(|x| x.key != key);
        a.barriers.len() + a.adjustments.len() != before
    }

    pub fn assigned_adjustments(
        &self,
        student: &str,
        barrier_filter: Option<&str>,
    ) -> Vec<&SavedAdjustment> {
        let barrier_filter = barrier_filter.map(str::trim).filter(|b| !b.is_empty());
        self.assignment(student)
            .map(|a| {
                a.adjustments
                    .iter()
                    .filter(|x| barrier_filter.map(|f| x.barrier_id() == f).unwrap_or(true))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Barriers first (skipping ids the catalog no longer has), then adjustments.
    pub fn saved_items(&self, catalog: &Catalog, student: &str) -> Vec<SavedItem> {
        let Some(a) = self.assignment(student) else {
            return Vec::new();
        };
        let barriers = a.barriers.iter().filter_map(|bid| {
            catalog.barrier(bid).map(|b| SavedItem {
                key: format!("{BARRIER_KEY_PREFIX}{bid}"),
                title: format!("barrier — {}", b.label),
                meta: b.description.clone(),
            })
        });
        let adjustments = a.adjustments.iter().map(|adj| SavedItem {
            key: adj.key.clone(),
            title: format!("adjustment — {}", adj.title),
            meta: if !adj.plan_text.is_empty() {
                adj.plan_text.clone()
            } else {
                adj.note_text.clone()
            },
        });
        barriers.chain(adjustments).collect()
    }

    /// Lenient read of the browser storage shape
    /// `{enabled, teacherName, students, assignments}`. Wrong-typed fields
    /// fall back to their defaults; assignments for unlisted students are
    /// dropped.
    pub fn from_browser_state(raw: &Value) -> Roster {
        let parsed;
        let raw = match raw {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(v) => {
                    parsed = v;
                    &parsed
                }
                Err(_) => return Roster::default(),
            },
            other => other,
        };
        let Some(obj) = raw.as_object() else {
            return Roster::default();
        };

        let mut roster = Roster {
            enabled: obj.get("enabled").map(truthy).unwrap_or(false),
            teacher_name: obj
                .get("teacherName")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            ..Roster::default()
        };

        for name in obj
            .get("students")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            roster.add_student(name);
        }

        for (student, entry) in obj
            .get("assignments")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
        {
            if !roster.has_student(student) {
                continue;
            }
            let barriers = entry
                .get("barriers")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str);
            for bid in barriers {
                roster.save_barrier(student, bid);
            }
            let adjustments = entry
                .get("adjustments")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|v| serde_json::from_value::<SavedAdjustment>(v.clone()).ok())
                .filter(|adj| !adj.key.is_empty());
            for adj in adjustments {
                roster.save_adjustment(student, adj);
            }
        }

        roster
    }

    pub fn to_browser_state(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub trait RosterStore {
    fn load(&self) -> Result<Roster>;
    fn save(&mut self, roster: &Roster) -> Result<()>;
}

/// Any load failure reads as an empty roster.
pub fn load_or_default(store: &dyn RosterStore) -> Roster {
    match store.load() {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("roster unavailable, using an empty one: {e}");
            Roster::default()
        }
    }
}

/// Session-only roster, used while no workspace is selected.
#[derive(Debug, Default)]
pub struct MemoryRosterStore {
    roster: Roster,
}

impl RosterStore for MemoryRosterStore {
    fn load(&self) -> Result<Roster> {
        Ok(self.roster.clone())
    }

    fn save(&mut self, roster: &Roster) -> Result<()> {
        self.roster = roster.clone();
        Ok(())
    }
}

pub struct SqliteRosterStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRosterStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterPrefs {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    teacher_name: String,
}

impl RosterStore for SqliteRosterStore<'_> {
    fn load(&self) -> Result<Roster> {
        // Prefs are two scalars; a damaged row must not hide the tables.
        let prefs: RosterPrefs = db::settings_get_json(self.conn, PREFS_KEY)
            .unwrap_or_else(|e| {
                tracing::warn!("roster prefs unreadable, using defaults: {e:#}");
                None
            })
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut roster = Roster {
            enabled: prefs.enabled,
            teacher_name: prefs.teacher_name,
            ..Roster::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM roster_students ORDER BY sort_order, rowid")?;
        roster.students = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT student_name, barrier_id FROM roster_barriers ORDER BY student_name, sort_order",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (student, barrier_id) = row?;
            roster
                .assignment_mut(&student)
                .barriers
                .push(barrier_id);
        }

        let mut stmt = self.conn.prepare(
            "SELECT student_name, adj_key, title, barrier_id, note_text, plan_text
             FROM roster_adjustments
             ORDER BY student_name, sort_order",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SavedAdjustment {
                    key: row.get(1)?,
                    title: row.get(2)?,
                    barrier_id: row.get(3)?,
                    note_text: row.get(4)?,
                    plan_text: row.get(5)?,
                },
            ))
        })?;
        for row in rows {
            let (student, adj) = row?;
            roster.assignment_mut(&student).adjustments.push(adj);
        }

        Ok(roster)
    }

    fn save(&mut self, roster: &Roster) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM roster_adjustments", [])?;
        tx.execute("DELETE FROM roster_barriers", [])?;
        tx.execute("DELETE FROM roster_students", [])?;

        for (i, name) in roster.students.iter().enumerate() {
            tx.execute(
                "INSERT INTO roster_students(name, sort_order) VALUES(?, ?)",
                (name, i as i64),
            )?;
        }
        for (student, a) in &roster.assignments {
            if !roster.has_student(student) {
                continue;
            }
            for (i, bid) in a.barriers.iter().enumerate() {
                tx.execute(
                    "INSERT INTO roster_barriers(student_name, barrier_id, sort_order) VALUES(?, ?, ?)",
                    (student, bid, i as i64),
                )?;
            }
            for (i, adj) in a.adjustments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO roster_adjustments(
                        student_name, adj_key, title, barrier_id, note_text, plan_text, sort_order
                    ) VALUES(?, ?, ?, ?, ?, ?, ?)",
                    (
                        student,
                        &adj.key,
                        &adj.title,
                        adj.barrier_id(),
                        &adj.note_text,
                        &adj.plan_text,
                        i as i64,
                    ),
                )?;
            }
        }

        let prefs = RosterPrefs {
            enabled: roster.enabled,
            teacher_name: roster.teacher_name.clone(),
        };
        let prefs = serde_json::to_value(&prefs)
            .map_err(|e| AssistError::StorageUnavailable(e.to_string()))?;
        db::settings_set_json(&tx, PREFS_KEY, &prefs)
            .map_err(|e| AssistError::StorageUnavailable(e.to_string()))?;

        tx.commit()?;
        Ok(())
    }
}
