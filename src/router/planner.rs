//! Question planning: split compound questions into atomic sub-questions.
//!
//! A single-entity multi-attribute ask ("name and id of X") stays one
//! question; only genuinely distinct asks get split.

use lazy_static::lazy_static;
use regex::Regex;

/// Attribute vocabulary at planner level (not SQL columns).
const ATTRIBUTE_KEYWORDS: &[&str] = &[
    "name",
    "id",
    "employee id",
    "employeeid",
    "joining date",
    "date of joining",
    "salary",
    "monthly salary",
    "manager",
    "manager code",
    "years at company",
    "years in current role",
    "sick leaves",
    "leave balance",
];

/// Distinct ranking metrics; two or more of these is two questions.
const RANKING_METRICS: &[&str] = &[
    "highest years at company",
    "highest years in current role",
    "highest years in role",
    "highest sick leaves",
    "most sick leaves",
    "maximum salary",
    "highest salary",
];

lazy_static! {
    static ref CONJUNCTION_SPLIT: Regex =
        Regex::new(r"(?i)\balso give me\b|\balso what is\b|\band also\b").unwrap();
    static ref BOUNDARY_SPLIT: Regex =
        Regex::new(r"(?i)\?\s+|\.\s+|\band then\b|\balso tell me\b").unwrap();
}

const QUESTION_PREFIXES: &[&str] = &["what", "how", "give", "show", "list", "who"];

fn polish_fragments<'a, I>(parts: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut planned = Vec::new();
    for part in parts {
        let part = part.trim();
        // Too short to be a question on its own.
        if part.split_whitespace().count() < 3 {
            continue;
        }
        let lowered = part.to_lowercase();
        let question = if QUESTION_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            format!("{}?", part)
        } else {
            format!("Give me {}?", part)
        };
        planned.push(question);
    }
    planned
}

/// Plan a question into an ordered, non-empty list of atomic sub-questions.
pub fn split_multi_part_question(question: &str) -> Vec<String> {
    let q = question.trim().trim_end_matches('?');
    let lowered = q.to_lowercase();

    // Multiple attributes of one entity is still a single request.
    let attribute_hits = ATTRIBUTE_KEYWORDS
        .iter()
        .filter(|attr| lowered.contains(*attr))
        .count();
    if attribute_hits >= 2 && !lowered.contains("also") {
        return vec![question.to_string()];
    }

    // Two distinct ranking metrics must split.
    let metric_hits = RANKING_METRICS
        .iter()
        .filter(|m| lowered.contains(*m))
        .count();
    if metric_hits >= 2 {
        let parts: Vec<&str> = CONJUNCTION_SPLIT.split(q).collect();
        if parts.len() > 1 {
            let planned = polish_fragments(parts.into_iter());
            if !planned.is_empty() {
                return planned;
            }
        }
    }

    // Otherwise split only on true question boundaries.
    let planned = polish_fragments(BOUNDARY_SPLIT.split(q));
    if planned.is_empty() {
        vec![question.to_string()]
    } else {
        planned
    }
}
