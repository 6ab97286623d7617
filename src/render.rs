//! Comment and plan sentence rendering.

use crate::catalog::Catalog;
use crate::error::{AssistError, Result};
use chrono::NaiveDate;
use regex::{NoExpand, Regex};
use serde::Deserialize;
use std::sync::OnceLock;

pub const STUDENT_PLACEHOLDER: &str = "{studentName}";
pub const TEACHER_FALLBACK: &str = "The teacher ";
pub const ENGAGEMENT_SUFFIX: &str = " during these activities.";
pub const DEFAULT_PLAN_STUDENT: &str = "the student";

/// Future-tense modal phrases and their past-tense forms, applied in order.
/// Phrases missing from this table stay as written.
pub const PAST_TENSE_TABLE: &[(&str, &str)] = &[
    ("will provide", "provided"),
    ("will implement", "implemented"),
    ("will use", "used"),
    ("will teach", "taught"),
    ("will create", "created"),
    ("will arrange", "arranged"),
    ("will break", "broke"),
    ("will build", "built"),
    ("will adjust", "adjusted"),
    ("will ensure", "ensured"),
    ("will support", "supported"),
    ("will reduce", "reduced"),
    ("will optimise", "optimised"),
    ("will differentiate", "differentiated"),
    ("will explicitly teach", "explicitly taught"),
    ("will gradually extend", "gradually extended"),
    ("will simplify", "simplified"),
    ("will model", "modelled"),
    ("will pre-teach", "pre-taught"),
    ("will explore", "explored"),
    ("will integrate", "integrated"),
];

fn past_tense_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        PAST_TENSE_TABLE
            .iter()
            .filter_map(|(phrase, past)| {
                // Table entries are plain phrases; escaping keeps them literal.
                let pattern = format!(r"(?i)\b{}\b", regex::escape(phrase));
                Regex::new(&pattern).ok().map(|re| (re, *past))
            })
            .collect()
    })
}

pub fn to_past_tense(text: &str) -> String {
    past_tense_rules()
        .iter()
        .fold(text.to_string(), |acc, (re, past)| {
            re.replace_all(&acc, NoExpand(*past)).into_owned()
        })
}

pub fn substitute_student(text: &str, student_name: &str) -> String {
    text.replace(STUDENT_PLACEHOLDER, student_name)
}

/// `YYYY-MM-DD` -> `DD/MM/YYYY`.
pub fn format_date(iso: &str) -> Result<String> {
    let iso = iso.trim();
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .map_err(|_| AssistError::InvalidDate(iso.to_string()))
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentParams {
    pub student_name: Option<String>,
    pub date: Option<String>,
    pub teacher_name: Option<String>,
    pub engagement_level: Option<String>,
    pub outcome_kind: Option<String>,
}

/// Progress-note comment in past tense.
///
/// `adjustment_text` is the template text of the selected adjustment; `None`
/// means nothing was selected.
pub fn render_comment(
    catalog: &Catalog,
    adjustment_text: Option<&str>,
    params: &CommentParams,
) -> Result<String> {
    let student_name = non_blank(params.student_name.as_deref())
        .ok_or(AssistError::MissingInput("studentName"))?;
    let Some(adjustment_text) = adjustment_text else {
        return Err(AssistError::MissingInput("adjustment"));
    };

    let mut comment = String::new();

    if let Some(date) = non_blank(params.date.as_deref()) {
        comment.push_str(&format!("On {}, ", format_date(date)?));
    }

    match non_blank(params.teacher_name.as_deref()) {
        Some(teacher) => {
            comment.push_str(teacher);
            comment.push(' ');
        }
        None => comment.push_str(TEACHER_FALLBACK),
    }

    comment.push_str(&to_past_tense(&substitute_student(
        adjustment_text,
        student_name,
    )));

    if let Some(desc) = non_blank(params.engagement_level.as_deref())
        .and_then(|level| catalog.engagement_descriptors.get(level))
    {
        comment.push(' ');
        comment.push_str(desc);
        comment.push_str(ENGAGEMENT_SUFFIX);
    }

    if let Some(desc) = non_blank(params.outcome_kind.as_deref())
        .and_then(|kind| catalog.outcome_descriptors.get(kind))
    {
        comment.push(' ');
        comment.push_str(&substitute_student(desc, student_name));
    }

    Ok(comment)
}

// Choices offered by the plan view's selectors.
pub const FREQUENCY_OPTIONS: &[&str] = &[
    "daily",
    "3x per week",
    "weekly",
    "fortnightly",
    "as needed",
];
pub const RESPONSIBLE_OPTIONS: &[&str] = &[
    "classroom teacher",
    "intervention teacher",
    "learning support teacher",
    "teaching assistant",
    "specialist teacher",
    "ED support staff",
];
pub const DURATION_OPTIONS: &[&str] = &[
    "ongoing",
    "1 term",
    "2 terms",
    "1 semester",
    "1 year",
    "6 weeks",
];
pub const DEFAULT_FREQUENCY: &str = "weekly";
pub const DEFAULT_RESPONSIBLE: &str = "classroom teacher";
pub const DEFAULT_DURATION: &str = "ongoing";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tense {
    #[default]
    Future,
    Past,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanParams {
    pub student_name: Option<String>,
    pub responsible: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    #[serde(default)]
    pub tense: Tense,
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Learning-plan sentence:
/// `<Responsible> <text>[ This adjustment will be implemented <frequency>.][ This adjustment will continue for <duration>.]`
pub fn render_plan(adjustment_text: &str, params: &PlanParams, student_fallback: &str) -> String {
    let student_name = non_blank(params.student_name.as_deref()).unwrap_or(student_fallback);

    let mut base = substitute_student(adjustment_text, student_name);
    if params.tense == Tense::Past {
        base = to_past_tense(&base);
    }

    let responsible = params.responsible.as_deref().unwrap_or("");
    let mut text = format!("{} {}", capitalize_first(responsible), base);

    if let Some(frequency) = non_blank(params.frequency.as_deref()) {
        text.push_str(&format!(" This adjustment will be implemented {frequency}."));
    }
    if let Some(duration) = non_blank(params.duration.as_deref()) {
        text.push_str(&format!(" This adjustment will continue for {duration}."));
    }
    text
}
