//! Rules for `build_model`, `gapfill_model` and `run_fba`.

use super::pipeline::Pipeline;
use super::rules::{duplicates, exactly_one, nonconforming, Entries, OneOf, Presence};
use crate::error::{AppError, Result};
use crate::external::{Template, TemplateCache};
use crate::store::ResourceStore;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FASTA_EXTENSIONS: &[&str] = &["fa", "faa", "fasta"];

/// Number of available ids quoted in an existence violation.
const AVAILABLE_SAMPLE: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildModelInput {
    /// Protein id to amino-acid sequence, in request order.
    #[serde(default)]
    pub protein_sequences: Option<Entries<Value>>,
    #[serde(default)]
    pub fasta_path: Option<String>,
    pub template: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Where the genome for a reconstruction comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum GenomeSource {
    ProteinSequences(Vec<(String, String)>),
    FastaPath(PathBuf),
}

impl GenomeSource {
    pub fn describe(&self) -> String {
        match self {
            GenomeSource::ProteinSequences(proteins) => format!("{} proteins", proteins.len()),
            GenomeSource::FastaPath(path) => path.display().to_string(),
        }
    }
}

/// A build request that passed validation.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub genome: GenomeSource,
    pub template: Arc<Template>,
    pub display_name: Option<String>,
}

fn is_amino_acid_sequence(sequence: &str) -> bool {
    let body = sequence.strip_suffix('*').unwrap_or(sequence);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_alphabetic())
}

fn has_fasta_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FASTA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn build_rules(templates: &TemplateCache) -> Pipeline<'_, BuildModelInput> {
    Pipeline::new("build_model")
        .rule("genome.exactly_one", |input: &BuildModelInput, report| {
            match exactly_one(input.protein_sequences.as_ref(), input.fasta_path.as_ref()) {
                Ok(_) => {}
                Err(Presence::Both) => {
                    report.violation("provide either protein_sequences or fasta_path, not both")
                }
                Err(Presence::Neither) => {
                    report.violation("one of protein_sequences or fasta_path is required")
                }
            }
        })
        .rule("protein_sequences.non_empty", |input: &BuildModelInput, report| {
            if input.protein_sequences.as_ref().is_some_and(|p| p.is_empty()) {
                report.violation("protein_sequences must contain at least one protein");
            }
        })
        .rule("protein_sequences.ids", |input: &BuildModelInput, report| {
            let Some(proteins) = &input.protein_sequences else {
                return;
            };
            for id in nonconforming(proteins.keys(), |id: &str| !id.trim().is_empty()) {
                report.violation_with("protein ids must not be blank", id);
            }
        })
        .rule("protein_sequences.unique", |input: &BuildModelInput, report| {
            let Some(proteins) = &input.protein_sequences else {
                return;
            };
            for id in duplicates(proteins.keys()) {
                report.violation_with(format!("protein id '{}' appears more than once", id), id);
            }
        })
        .rule("protein_sequences.alphabet", |input: &BuildModelInput, report| {
            let Some(proteins) = &input.protein_sequences else {
                return;
            };
            for (id, sequence) in proteins.iter() {
                let valid = sequence.as_str().is_some_and(is_amino_acid_sequence);
                if !valid {
                    report.violation_with(
                        format!("sequence for protein '{}' is not an amino-acid string", id),
                        id,
                    );
                }
            }
        })
        .rule("fasta_path.extension", |input: &BuildModelInput, report| {
            if let Some(path) = &input.fasta_path {
                if !has_fasta_extension(path) {
                    report.violation_with(
                        format!(
                            "fasta_path must end in one of: {}",
                            FASTA_EXTENSIONS.join(", ")
                        ),
                        path.as_str(),
                    );
                }
            }
        })
        .rule("template.known", move |input: &BuildModelInput, report| {
            if !templates.contains(&input.template) {
                report.violation_with(
                    format!(
                        "unknown template '{}'; available: {}",
                        input.template,
                        templates.names().collect::<Vec<_>>().join(", ")
                    ),
                    input.template.as_str(),
                );
            }
        })
        .rule("model_name.non_blank", |input: &BuildModelInput, report| {
            if input
                .model_name
                .as_deref()
                .is_some_and(|name| name.trim().is_empty())
            {
                report.violation("model_name must not be blank when given");
            }
        })
}

pub fn validate_build(input: &BuildModelInput, templates: &TemplateCache) -> Result<BuildPlan> {
    build_rules(templates).evaluate(input).into_result()?;

    let genome = match exactly_one(input.protein_sequences.as_ref(), input.fasta_path.as_ref()) {
        Ok(OneOf::First(proteins)) => GenomeSource::ProteinSequences(
            proteins
                .iter()
                .filter_map(|(id, seq)| Some((id.to_string(), seq.as_str()?.to_string())))
                .collect(),
        ),
        Ok(OneOf::Second(path)) => GenomeSource::FastaPath(PathBuf::from(path)),
        Err(_) => {
            return Err(AppError::Internal(
                "genome source changed after validation".to_string(),
            ))
        }
    };

    Ok(BuildPlan {
        genome,
        template: templates.get(&input.template)?,
        display_name: input.model_name.clone(),
    })
}

/// Input shared by tools that pair an existing model with an existing medium.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisInput {
    pub model_id: String,
    pub media_id: String,
    #[serde(default)]
    pub objective: Option<String>,
}

pub fn analysis_rules<'a>(tool: &'static str, store: &'a ResourceStore) -> Pipeline<'a, AnalysisInput> {
    Pipeline::new(tool)
        .rule("model_id.exists", move |input: &AnalysisInput, report| {
            if !store.models().contains(&input.model_id) {
                report.violation_with(
                    format!(
                        "model '{}' does not exist; available: [{}]",
                        input.model_id,
                        store.models().sample_ids(AVAILABLE_SAMPLE).join(", ")
                    ),
                    input.model_id.as_str(),
                );
            }
        })
        .rule("media_id.exists", move |input: &AnalysisInput, report| {
            if !store.media().contains(&input.media_id) {
                report.violation_with(
                    format!(
                        "media '{}' does not exist; available: [{}]",
                        input.media_id,
                        store.media().sample_ids(AVAILABLE_SAMPLE).join(", ")
                    ),
                    input.media_id.as_str(),
                );
            }
        })
        .rule("objective.non_blank", |input: &AnalysisInput, report| {
            if input
                .objective
                .as_deref()
                .is_some_and(|objective| objective.trim().is_empty())
            {
                report.violation("objective must not be blank when given");
            }
        })
}

pub fn validate_analysis(tool: &'static str, input: &AnalysisInput, store: &ResourceStore) -> Result<()> {
    analysis_rules(tool, store).evaluate(input).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::Template;
    use serde_json::json;

    fn templates() -> TemplateCache {
        TemplateCache::from_templates([
            Template::new("GramNegative", ["c0", "e0"], 120),
            Template::new("Core", ["c0"], 40),
        ])
    }

    fn input(value: Value) -> BuildModelInput {
        serde_json::from_value(value).unwrap()
    }

    fn rules_of(err: &AppError) -> Vec<&'static str> {
        err.violations().iter().map(|v| v.rule).collect()
    }

    #[test]
    fn test_protein_sequences_accepted() {
        let cache = templates();
        let plan = validate_build(
            &input(json!({
                "protein_sequences": { "p1": "MKTAYIAKQR", "p2": "MSLNV*" },
                "template": "GramNegative",
                "model_name": "E. coli draft"
            })),
            &cache,
        )
        .unwrap();

        assert_eq!(
            plan.genome,
            GenomeSource::ProteinSequences(vec![
                ("p1".to_string(), "MKTAYIAKQR".to_string()),
                ("p2".to_string(), "MSLNV*".to_string()),
            ])
        );
        assert_eq!(plan.template.name, "GramNegative");
        assert_eq!(plan.display_name.as_deref(), Some("E. coli draft"));
    }

    #[test]
    fn test_fasta_path_accepted() {
        let cache = templates();
        let plan = validate_build(
            &input(json!({ "fasta_path": "/data/genome.faa", "template": "Core" })),
            &cache,
        )
        .unwrap();
        assert_eq!(plan.genome, GenomeSource::FastaPath("/data/genome.faa".into()));
    }

    #[test]
    fn test_both_and_neither_are_distinct() {
        let cache = templates();
        let both = validate_build(
            &input(json!({
                "protein_sequences": { "p1": "MK" },
                "fasta_path": "g.faa",
                "template": "Core"
            })),
            &cache,
        )
        .unwrap_err();
        let neither = validate_build(&input(json!({ "template": "Core" })), &cache).unwrap_err();

        assert_eq!(rules_of(&both), vec!["genome.exactly_one"]);
        assert_eq!(rules_of(&neither), vec!["genome.exactly_one"]);
        assert_ne!(both.violations()[0].message, neither.violations()[0].message);
    }

    #[test]
    fn test_collects_all_build_violations() {
        let cache = templates();
        let err = validate_build(
            &input(json!({
                "protein_sequences": { " ": "MK", "p2": "MK-12", "p3": 7 },
                "template": "Unknown",
                "model_name": "  "
            })),
            &cache,
        )
        .unwrap_err();

        assert_eq!(
            rules_of(&err),
            vec![
                "protein_sequences.ids",
                "protein_sequences.alphabet",
                "protein_sequences.alphabet",
                "template.known",
                "model_name.non_blank",
            ]
        );
        assert!(err.violations()[3].message.contains("Core, GramNegative"));
    }

    #[test]
    fn test_repeated_protein_ids_are_reported() {
        let cache = templates();
        let request: BuildModelInput = serde_json::from_str(
            r#"{"protein_sequences": {"p1": "MK", "p2": "MA", "p1": "MSL"}, "template": "Core"}"#,
        )
        .unwrap();

        let err = validate_build(&request, &cache).unwrap_err();
        assert_eq!(rules_of(&err), vec!["protein_sequences.unique"]);
        assert_eq!(err.violations()[0].value, Some(json!("p1")));
    }

    #[test]
    fn test_empty_protein_map_and_bad_extension() {
        let cache = templates();
        let err = validate_build(
            &input(json!({ "protein_sequences": {}, "template": "Core" })),
            &cache,
        )
        .unwrap_err();
        assert_eq!(rules_of(&err), vec!["protein_sequences.non_empty"]);

        let err = validate_build(
            &input(json!({ "fasta_path": "genome.txt", "template": "Core" })),
            &cache,
        )
        .unwrap_err();
        assert_eq!(rules_of(&err), vec!["fasta_path.extension"]);
    }

    #[test]
    fn test_analysis_reports_both_missing_ids() {
        let store = ResourceStore::new();
        let input: AnalysisInput = serde_json::from_value(json!({
            "model_id": "model_missing.draft",
            "media_id": "media_missing",
            "objective": ""
        }))
        .unwrap();

        let err = validate_analysis("run_fba", &input, &store).unwrap_err();
        assert_eq!(
            rules_of(&err),
            vec!["model_id.exists", "media_id.exists", "objective.non_blank"]
        );
    }
}
