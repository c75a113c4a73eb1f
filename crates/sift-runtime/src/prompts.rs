//! Prompt templates for screening and criteria refinement.
//!
//! Templates use `{placeholder}` slots filled by the `render_*` functions.
//! Format instructions from the response schema always come last.

use sift_core::{CriteriaSet, LabeledExamples};

/// Per-document screening prompt.
pub const SCREENING_TEMPLATE: &str = r#"[INST]
Answer the question based only on the following context:

{context}

With the following criteria:

{criteria}

---

Answer the question based on the above context: {question}
{format_instructions}
[/INST]"#;

/// The fixed screening question.
pub const SCREENING_QUESTION: &str = "Which of the criteria are true for this document and why?";

/// Rewrite of a criterion without retrieved context.
pub const BLIND_REWRITE_TEMPLATE: &str = r#"[INST]
A criterion is a sentence describing when a document should be included in or excluded from a literature review.
This criterion does not separate relevant from irrelevant documents well:

{criterion}

Write a better criterion. Take these expert annotations into account, if there are any: {annotations}

---

{format_instructions}
[/INST]"#;

/// Rewrite of a criterion grounded in one document's context.
pub const GROUNDED_REWRITE_TEMPLATE: &str = r#"[INST]
Answer the question based only on the following context:

{context}

With the following criterion: {criterion}

And the following expert annotations: {annotations}

---

Answer the question based on the above context: What is a better criterion?
{format_instructions}
[/INST]"#;

/// Rewrite contrasting documents that should match with ones that should not.
pub const DISCRIMINATIVE_TEMPLATE: &str = r#"[INST]
A criterion is a sentence describing when a document should be included in or excluded from a literature review.
The current criterion is:

{criterion}

The criterion should evaluate to true for documents with the following contexts:

{positive_context}

The criterion should evaluate to false for documents with the following contexts:

{negative_context}

---

Write a criterion that separates the first group of contexts from the second as sharply as possible.
{format_instructions}
[/INST]"#;

/// Synthesis of one criterion from several candidates.
pub const AVERAGING_TEMPLATE: &str = r#"[INST]
A criterion is a sentence describing when a document should be included in or excluded from a literature review.
The following candidates might all work better for the review at hand.
Write the single best criterion based on these candidates:

{candidates}

{format_instructions}
[/INST]"#;

/// Placeholder used when there is nothing to put in a slot.
const NONE: &str = "none";

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        NONE
    } else {
        text
    }
}

/// Criteria rendered one per line as `- name: text`.
pub fn render_criteria(criteria: &CriteriaSet) -> String {
    criteria
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_screening(context: &str, criteria: &CriteriaSet, format_instructions: &str) -> String {
    SCREENING_TEMPLATE
        .replace("{context}", context)
        .replace("{criteria}", &render_criteria(criteria))
        .replace("{question}", SCREENING_QUESTION)
        .replace("{format_instructions}", format_instructions)
}

pub fn render_blind_rewrite(
    criterion: &str,
    annotations: Option<&str>,
    format_instructions: &str,
) -> String {
    BLIND_REWRITE_TEMPLATE
        .replace("{criterion}", criterion)
        .replace("{annotations}", or_none(annotations.unwrap_or_default()))
        .replace("{format_instructions}", format_instructions)
}

pub fn render_grounded_rewrite(
    context: &str,
    criterion: &str,
    annotations: Option<&str>,
    format_instructions: &str,
) -> String {
    GROUNDED_REWRITE_TEMPLATE
        .replace("{context}", context)
        .replace("{criterion}", criterion)
        .replace("{annotations}", or_none(annotations.unwrap_or_default()))
        .replace("{format_instructions}", format_instructions)
}

pub fn render_discriminative(
    criterion: &str,
    positive_context: &str,
    negative_context: &str,
    format_instructions: &str,
) -> String {
    DISCRIMINATIVE_TEMPLATE
        .replace("{criterion}", criterion)
        .replace("{positive_context}", or_none(positive_context))
        .replace("{negative_context}", or_none(negative_context))
        .replace("{format_instructions}", format_instructions)
}

pub fn render_averaging(candidates: &[String], format_instructions: &str) -> String {
    let listed = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    AVERAGING_TEMPLATE
        .replace("{candidates}", &listed)
        .replace("{format_instructions}", format_instructions)
}

/// Titles of the example documents, for log lines.
pub fn describe_examples(examples: &LabeledExamples) -> String {
    format!(
        "{} positive ({}), {} negative ({})",
        examples.positive.len(),
        examples.positive.join(", "),
        examples.negative.len(),
        examples.negative.join(", ")
    )
}
