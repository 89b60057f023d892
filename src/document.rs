//! Structured resume documents: the job's input snapshot and its output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// A resume as submitted, and the shape of the tailored result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeDocument {
    #[serde(default)]
    pub name: String,
    /// Either a single display line or an object of links (`email`, `phone`, ...).
    #[serde(default)]
    pub contact: Value,
    #[serde(default)]
    pub summary: String,
    /// Skills grouped by category, e.g. `"Languages" -> "Python, SQL"`.
    #[serde(default)]
    pub technical_skills: BTreeMap<String, String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certifications: Vec<Certification>,
}

/// One role in the experience list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    /// Grouping key: the organization.
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub period: String,
    #[serde(default, alias = "bullets")]
    pub points: Vec<String>,
}

impl ExperienceEntry {
    /// Company/role/period without bullets.
    pub fn header(&self) -> ExperienceEntry {
        ExperienceEntry {
            company: self.company.clone(),
            role: self.role.clone(),
            period: self.period.clone(),
            points: Vec::new(),
        }
    }

    /// Neither company nor role is set.
    pub fn is_ungrouped(&self) -> bool {
        self.company.trim().is_empty() && self.role.trim().is_empty()
    }

    pub fn label(&self) -> String {
        match (self.company.trim(), self.role.trim()) {
            ("", role) => role.to_string(),
            (company, "") => company.to_string(),
            (company, role) => format!("{role} @ {company}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("generated experience entry {index} has neither company nor role")]
    UngroupedExperience { index: usize },
}

/// The three regenerated fields, one per branch.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSections {
    pub summary: String,
    pub experience: Vec<ExperienceEntry>,
    pub technical_skills: BTreeMap<String, String>,
}

impl ResumeDocument {
    /// Merge branch outputs with the pass-through fields of `source`.
    ///
    /// Projects without a title or bullets and certifications without a
    /// name are dropped. Ungrouped experience entries are accepted only when
    /// they come unchanged from `source`, which is what a branch fallback
    /// returns.
    pub fn assemble(
        source: &ResumeDocument,
        sections: GeneratedSections,
    ) -> Result<ResumeDocument, AssemblyError> {
        for (index, entry) in sections.experience.iter().enumerate() {
            if !entry.is_ungrouped() {
                continue;
            }
            if !source.experience.contains(entry) {
                return Err(AssemblyError::UngroupedExperience { index });
            }
            warn!(index, period = %entry.period, "keeping source experience entry without company or role");
        }

        let projects = source
            .projects
            .iter()
            .filter(|p| !p.title.trim().is_empty() && !p.bullets.is_empty())
            .cloned()
            .collect();
        let certifications = source
            .certifications
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .cloned()
            .collect();

        Ok(ResumeDocument {
            name: source.name.clone(),
            contact: source.contact.clone(),
            summary: sections.summary,
            technical_skills: sections.technical_skills,
            experience: sections.experience,
            education: source.education.clone(),
            projects,
            certifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResumeDocument {
        serde_json::from_value(serde_json::json!({
            "name": "Ana Silva",
            "contact": {"email": "ana@example.com"},
            "summary": "5 years in data.",
            "technical_skills": {"Languages": "Python, SQL"},
            "experience": [
                {"company": "Acme", "role": "Data Engineer", "period": "2020-2024",
                 "bullets": ["Built pipelines", "Cut costs"]}
            ],
            "education": [{"degree": "BSc", "institution": "USP", "year": "2019"}],
            "projects": [
                {"title": "ETL kit", "bullets": ["Open source"], "link": "https://x.dev"},
                {"title": "", "bullets": ["orphan"]},
                {"title": "Empty", "bullets": []}
            ],
            "certifications": [{"name": "AWS SAA", "year": "2022"}, {"name": "  "}]
        }))
        .unwrap()
    }

    #[test]
    fn bullets_alias_maps_to_points() {
        let doc = sample();
        assert_eq!(doc.experience[0].points.len(), 2);
    }

    #[test]
    fn assemble_filters_pass_through_lists() {
        let source = sample();
        let doc = ResumeDocument::assemble(
            &source,
            GeneratedSections {
                summary: "New summary".into(),
                experience: source.experience.clone(),
                technical_skills: source.technical_skills.clone(),
            },
        )
        .unwrap();

        assert_eq!(doc.name, "Ana Silva");
        assert_eq!(doc.summary, "New summary");
        assert_eq!(doc.education, source.education);
        assert_eq!(doc.projects.len(), 1);
        assert_eq!(doc.projects[0].title, "ETL kit");
        assert_eq!(doc.projects[0].extra["link"], "https://x.dev");
        assert_eq!(doc.certifications.len(), 1);
        assert_eq!(doc.certifications[0].name, "AWS SAA");
    }

    #[test]
    fn assemble_keeps_ungrouped_entries_from_source() {
        let mut source = sample();
        let ungrouped = ExperienceEntry {
            period: "2019".into(),
            points: vec!["Freelance work".into()],
            ..Default::default()
        };
        source.experience.push(ungrouped.clone());

        let doc = ResumeDocument::assemble(
            &source,
            GeneratedSections {
                summary: source.summary.clone(),
                experience: source.experience.clone(),
                technical_skills: source.technical_skills.clone(),
            },
        )
        .unwrap();
        assert_eq!(doc.experience[1], ungrouped);
    }

    #[test]
    fn assemble_rejects_ungrouped_experience() {
        let source = sample();
        let err = ResumeDocument::assemble(
            &source,
            GeneratedSections {
                summary: String::new(),
                experience: vec![ExperienceEntry {
                    points: vec!["x".into()],
                    ..Default::default()
                }],
                technical_skills: BTreeMap::new(),
            },
        )
        .unwrap_err();
        assert_eq!(err, AssemblyError::UngroupedExperience { index: 0 });
    }

    #[test]
    fn empty_lists_are_omitted_on_output() {
        let json = serde_json::to_value(ResumeDocument::default()).unwrap();
        assert!(json.get("projects").is_none());
        assert!(json.get("certifications").is_none());
    }

    #[test]
    fn entry_label_and_header() {
        let entry = &sample().experience[0];
        assert_eq!(entry.label(), "Data Engineer @ Acme");
        assert!(entry.header().points.is_empty());
    }
}
