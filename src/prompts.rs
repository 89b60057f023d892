//! Prompt builders and output contracts for every generation call.

use std::collections::BTreeMap;

use serde_json::json;

use crate::document::ExperienceEntry;
use crate::generator::OutputContract;
use crate::preprocess::{PreprocessContext, TargetHints};

pub const MIN_BULLETS: usize = 6;
pub const MAX_BULLETS: usize = 8;

pub fn hints_contract() -> OutputContract {
    OutputContract {
        name: "target_hints",
        description: "Keywords, phrases and requirements extracted from a job description",
        schema: json!({
            "type": "object",
            "properties": {
                "job_title": {"type": "string"},
                "seniority": {"type": "string"},
                "requirements": {"type": "array", "items": {"type": "string"}},
                "technical_keywords": {"type": "array", "items": {"type": "string"}},
                "soft_skills": {"type": "array", "items": {"type": "string"}},
                "phrases": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["technical_keywords", "soft_skills", "phrases"]
        }),
    }
}

pub fn hints_prompt(text: &str, ctx: &PreprocessContext) -> String {
    let mut context = String::new();
    if let Some(title) = &ctx.job_title {
        context.push_str(&format!("Job title given by the candidate: {title}\n"));
    }
    if let Some(company) = &ctx.company_name {
        context.push_str(&format!("Company: {company}\n"));
    }

    format!(
        r#"You analyse job descriptions for technical and analytical roles.

Extract only what is explicitly present in the job description below:
- job_title and seniority (Junior, Mid-level, Senior, Lead, Principal)
- requirements: the must-have qualifications, as short statements
- technical_keywords: up to 15 tools, languages, platforms and domain technologies
- soft_skills: up to 7 behaviours or action verbs shown in context
- phrases: the 10 most valuable exact multi-word phrases, not paraphrased

Do not invent skills that are not in the text. Deduplicate synonyms.
{context}
Job description:
<<<
{text}
>>>"#
    )
}

pub fn summary_contract() -> OutputContract {
    OutputContract {
        name: "summary",
        description: "Professional summary tailored to the target role",
        schema: json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"]
        }),
    }
}

pub fn summary_prompt(hints: &TargetHints, original_summary: &str) -> String {
    format!(
        r#"Write a 3-4 sentence professional summary (70-90 words) positioning the candidate for the role below.

Rules:
- Open with years of experience, the target job title and the top technical skills.
- Use 8-12 technical keywords and 3-5 soft skills from the hints, with exact wording.
- Third person without pronouns, present tense, no buzzwords or filler.
- Take years of experience and domain only from the original summary.

Target role hints:
{hints}
Original summary:
<<<
{original_summary}
>>>"#,
        hints = hints.render(),
    )
}

pub fn experience_contract() -> OutputContract {
    OutputContract {
        name: "experience",
        description: "Experience entries with rewritten bullet points",
        schema: json!({
            "type": "object",
            "properties": {
                "experience": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "company": {"type": "string"},
                            "role": {"type": "string"},
                            "period": {"type": "string"},
                            "points": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["company", "role", "period", "points"]
                    }
                }
            },
            "required": ["experience"]
        }),
    }
}

/// Fresh bullets from the role headers only.
pub fn experience_fresh_prompt(hints: &TargetHints, headers: &[ExperienceEntry]) -> String {
    format!(
        r#"Write {MIN_BULLETS}-{MAX_BULLETS} achievement bullets for every role below so the experience section targets this job.

Rules:
- Keep company, role and period exactly as given, in the same order.
- Roughly 80% of bullets use the technical keywords and phrases from the hints.
- Start with a strong past-tense verb; include realistic metrics.
- One technology stack per role; never list competing tools together.
- Plain text only, each bullet ends with a period.

Target role: {title} ({seniority})
Requirements:
{requirements}
Hints:
{hints}
Roles:
{roles}"#,
        title = hints.title,
        seniority = hints.seniority,
        requirements = bullet_list(&hints.requirements),
        hints = hints.render(),
        roles = to_json(headers),
    )
}

/// Light edit of existing bullets.
pub fn experience_light_prompt(hints: &TargetHints, items: &[ExperienceEntry]) -> String {
    format!(
        r#"Lightly edit the experience entries below for the target role. Keep every fact; do not invent projects, employers or metrics.

Rules:
- Keep company, role and period exactly as given, in the same order.
- Reword existing bullets to use the exact keywords and phrases from the hints where they truthfully apply.
- Keep {MIN_BULLETS}-{MAX_BULLETS} bullets per role, merging duplicates.
- Plain text only, each bullet ends with a period.

Target role: {title} ({seniority})
Requirements:
{requirements}
Hints:
{hints}
Entries:
{entries}"#,
        title = hints.title,
        seniority = hints.seniority,
        requirements = bullet_list(&hints.requirements),
        hints = hints.render(),
        entries = to_json(items),
    )
}

pub fn skills_contract() -> OutputContract {
    OutputContract {
        name: "technical_skills",
        description: "Technical skills grouped by category",
        schema: json!({
            "type": "object",
            "properties": {
                "technical_skills": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "array",
                        "items": {"type": "string"}
                    }
                }
            },
            "required": ["technical_skills"]
        }),
    }
}

pub fn skills_prompt(hints: &TargetHints, existing: &BTreeMap<String, String>) -> String {
    format!(
        r#"Organise a technical skills section for the target role.

Rules:
- Include every technical keyword from the job description.
- Keep existing skills only when they fit the role's domain.
- 5-8 categories ordered Languages, Frameworks, Databases, Cloud, DevOps, Other.
- Official names, no duplicates, no category with fewer than three items.

Job description keywords: {keywords}
Existing skills:
{existing}"#,
        keywords = hints.technical_keywords.join(", "),
        existing = to_json(existing),
    )
}

/// Free-text reply, one `- ` line per bullet.
pub fn balance_prompt(hints: &TargetHints, entry: &ExperienceEntry) -> String {
    format!(
        r#"Rewrite the bullets of this role into {MIN_BULLETS}-{MAX_BULLETS} concise, metric-driven bullets.

Most bullets should use keywords from the target role; keep the remaining ones close to the current content. Merge duplicates and keep claims realistic.

Output only the bullets, each on its own line starting with "- ". No headers, numbering or markdown.

Target role hints:
{hints}
Role: {label} ({period})
Current bullets:
{bullets}"#,
        hints = hints.render(),
        label = entry.label(),
        period = entry.period,
        bullets = bullet_list(&entry.points),
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
