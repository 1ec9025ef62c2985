//! Entity resolution: who is this question about?
//!
//! Extracts explicit employee references (id or name), maintains the
//! per-session active-entity context, and substitutes pronouns with the
//! active entity. Underspecified questions are blocked here, before any
//! pipeline runs.

use crate::error::{AssistantError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Strict id extraction: an id-like keyword followed by digits.
    /// A bare number is never treated as an employee id.
    static ref EMP_ID_PATTERN: Regex =
        Regex::new(r"(?i)\b(?:employee\s*id|emp\s*id|id)\s*(?:is|=)?\s*(\d{2,10})\b").unwrap();

    /// Two capitalized tokens; validated further before acceptance.
    static ref EMP_NAME_PATTERN: Regex =
        Regex::new(r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b").unwrap();

    /// Back-references resolved against the active entity. Longer
    /// alternatives first so "this employee" wins over "this".
    static ref PRONOUN_PATTERN: Regex =
        Regex::new(r"(?i)\b(this employee|that employee|her|him|his|this|that|it)\b").unwrap();

    /// Bare attribute request with no subject at all.
    static ref EMPTY_ENTITY_PATTERN: Regex = Regex::new(
        r"(?i)^\s*(what\s+is|give\s+me|show)\s+(the\s+)?(name|id|employee\s*id|joining\s+date|salary)\s*\??\s*$"
    )
    .unwrap();
}

/// Tokens that mark a capitalized pair as a company, not a person.
const COMPANY_SUFFIXES: &[&str] = &[
    "pharma", "ltd", "limited", "inc", "corp", "corporation", "bank", "company", "co", "pvt",
    "llc", "group", "ppl",
];

/// Known metric/column phrases that regex-match the name pattern but are
/// never employee names.
const METRIC_NAME_BLACKLIST: &[&str] = &[
    "overtime hours",
    "work hours",
    "sick leaves",
    "sick leave",
    "leave balance",
    "years at company",
    "years in role",
    "monthly salary",
    "annual salary",
    "date of joining",
    "joining date",
    "manager code",
    "compliance risk",
    "performance rating",
    "hours last month",
    "per week",
    "last month",
];

/// The employee currently implied by the conversation. At most one;
/// last write wins per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEntityContext {
    pub employee_id: Option<String>,
    pub employee_name: Option<String>,
}

impl ActiveEntityContext {
    pub fn is_empty(&self) -> bool {
        self.employee_id.is_none() && self.employee_name.is_none()
    }

    pub fn clear(&mut self) {
        self.employee_id = None;
        self.employee_name = None;
    }

    fn update(&mut self, resolved: &ResolvedEntity) {
        if resolved.employee_id.is_some() {
            self.employee_id = resolved.employee_id.clone();
        }
        if resolved.employee_name.is_some() {
            self.employee_name = resolved.employee_name.clone();
        }
    }

    /// Textual form used when substituting a pronoun.
    fn reference_text(&self) -> Option<String> {
        if let Some(ref id) = self.employee_id {
            Some(format!("employee id {}", id))
        } else {
            self.employee_name.clone()
        }
    }
}

/// Entity fields newly resolved from the question text itself
/// (inherited context fields are not echoed back here).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub employee_id: Option<String>,
    pub employee_name: Option<String>,
}

impl ResolvedEntity {
    pub fn is_empty(&self) -> bool {
        self.employee_id.is_none() && self.employee_name.is_none()
    }
}

/// Explicit employee id mention in `question`, if any.
pub fn extract_employee_id(question: &str) -> Option<String> {
    EMP_ID_PATTERN
        .captures(question)
        .map(|caps| caps[1].to_string())
}

fn is_valid_employee_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() < 2 {
        return false;
    }
    // All caps reads as an acronym, not a person.
    if name.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase()) {
        return false;
    }
    for part in &parts {
        if part.chars().count() < 3 {
            return false;
        }
        if COMPANY_SUFFIXES.contains(&part.to_lowercase().as_str()) {
            return false;
        }
    }
    let name_lower = name.to_lowercase();
    if METRIC_NAME_BLACKLIST.iter().any(|m| name_lower.contains(m)) {
        return false;
    }
    true
}

/// Resolve the entity in `question` against the session context.
///
/// Returns the newly resolved fields and the question with any pronoun
/// substituted. Fails with `Underspecified` when the question needs an
/// entity but neither the text nor the context supplies one.
///
/// Side effect: overwrites the active entity when an explicit mention is
/// found (last-write-wins per field).
pub fn resolve_entity(
    question: &str,
    context: &mut ActiveEntityContext,
) -> Result<(ResolvedEntity, String)> {
    let mut resolved = ResolvedEntity::default();
    let mut sanitized = question.trim().to_string();

    // Bare attribute request with no subject and no remembered entity.
    if EMPTY_ENTITY_PATTERN.is_match(&sanitized) && context.is_empty() {
        return Err(AssistantError::Underspecified(
            "This question is incomplete. Please specify which employee you are asking about."
                .to_string(),
        ));
    }

    if let Some(caps) = EMP_ID_PATTERN.captures(&sanitized) {
        resolved.employee_id = Some(caps[1].to_string());
    }

    if let Some(caps) = EMP_NAME_PATTERN.captures(&sanitized) {
        let candidate = format!("{} {}", &caps[1], &caps[2]);
        if is_valid_employee_name(&candidate) {
            resolved.employee_name = Some(candidate);
        }
        // Company names and metric phrases are rejected silently.
    }

    if !resolved.is_empty() {
        context.update(&resolved);
    }

    if PRONOUN_PATTERN.is_match(&sanitized) {
        let replacement = context.reference_text().ok_or_else(|| {
            AssistantError::Underspecified(
                "Pronoun used but no active employee context exists. Please specify the employee explicitly."
                    .to_string(),
            )
        })?;
        sanitized = PRONOUN_PATTERN
            .replace(&sanitized, replacement.as_str())
            .to_string();
    }

    Ok((resolved, sanitized))
}
