//! Run command implementation.

use crate::cli::{ExtractionArg, RelationsArg, RunArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use ledger_domain::{ExtractionOracle, RelationOracle};
use ledger_llm::{LlmExtractionOracle, LlmRelationOracle, LlmSummaryOracle, OllamaProvider};
use ledger_pipeline::{
    write_artifacts, HeuristicRelationOracle, Pipeline, PipelineConfig, RunBundle, RunInput,
    RunOutput,
};
use std::sync::Arc;
use tracing::info;

/// Run the pipeline with the chosen oracles.
async fn run_with<E, R>(
    config: PipelineConfig,
    input: RunInput,
    extraction: E,
    relations: R,
    summaries: Option<LlmSummaryOracle<OllamaProvider>>,
) -> Result<RunOutput>
where
    E: ExtractionOracle + Send + Sync + 'static,
    R: RelationOracle + Send + Sync + 'static,
{
    let pipeline = Pipeline::new(config, extraction, relations)?;
    let output = match summaries {
        Some(oracle) => pipeline.with_summaries(oracle).run(input).await?,
        None => pipeline.run(input).await?,
    };
    Ok(output)
}

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => config.clone(),
    };
    if args.no_summaries {
        config.pipeline.summarize_resolutions = false;
    }

    let bundle = RunBundle::load(&args.bundle)?;
    info!("Loaded bundle {}", args.bundle.display());
    let (input, recorded) = bundle.into_parts();

    let url = args
        .ollama_url
        .clone()
        .unwrap_or_else(|| config.settings.ollama_url.clone());
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.settings.model.clone());
    let llm = Arc::new(
        // One HTTP attempt per call; the oracle pool retries
        OllamaProvider::new(url, model)
            .with_timeout(config.pipeline.oracle_timeout())
            .with_max_retries(1),
    );

    // Summaries need a model; the heuristic relation path runs fully offline
    let summaries = (args.relations == RelationsArg::Ollama && !args.no_summaries)
        .then(|| LlmSummaryOracle::new(Arc::clone(&llm)));
    let pipeline_config = config.pipeline.clone();

    let output = match (args.extraction, args.relations) {
        (ExtractionArg::Recorded, RelationsArg::Heuristic) => {
            run_with(pipeline_config, input, recorded, HeuristicRelationOracle, summaries).await?
        }
        (ExtractionArg::Recorded, RelationsArg::Ollama) => {
            let relations = LlmRelationOracle::new(Arc::clone(&llm));
            run_with(pipeline_config, input, recorded, relations, summaries).await?
        }
        (ExtractionArg::Ollama, RelationsArg::Heuristic) => {
            let extraction = LlmExtractionOracle::new(Arc::clone(&llm));
            run_with(pipeline_config, input, extraction, HeuristicRelationOracle, summaries)
                .await?
        }
        (ExtractionArg::Ollama, RelationsArg::Ollama) => {
            let extraction = LlmExtractionOracle::new(Arc::clone(&llm));
            let relations = LlmRelationOracle::new(Arc::clone(&llm));
            run_with(pipeline_config, input, extraction, relations, summaries).await?
        }
    };

    let paths = write_artifacts(&args.out, &output)?;
    println!("{}", formatter.format_run(&output.ledger, &output.trace, &paths)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const BUNDLE: &str = r#"{
        "prompt": "Does synthetic data help?",
        "search_results": [{"url": "https://arxiv.org/abs/2401.00001", "title": "Study"}],
        "documents": [{"url": "https://arxiv.org/abs/2401.00001", "text": "Synthetic data raised accuracy by four points."}],
        "extractions": [{"url": "https://arxiv.org/abs/2401.00001", "evidence": [
            {"snippet": "Synthetic data raised accuracy by four points.", "claim_types": ["evaluation"], "reliability": 4}
        ]}],
        "claims": [
            {"claim_type": "evaluation", "statement": "Synthetic data raises accuracy", "polarity": "pro", "supported_by": ["E1"], "confidence": 4}
        ]
    }"#;

    fn args(dir: &TempDir) -> RunArgs {
        let bundle = dir.path().join("bundle.json");
        std::fs::write(&bundle, BUNDLE).unwrap();
        RunArgs {
            bundle,
            out: dir.path().join("out"),
            config: None,
            relations: RelationsArg::Heuristic,
            extraction: ExtractionArg::Recorded,
            ollama_url: None,
            model: None,
            no_summaries: false,
        }
    }

    #[tokio::test]
    async fn test_offline_run_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        execute_run(args(&dir), &Config::default(), &formatter)
            .await
            .unwrap();

        for name in ["ledger.json", "report.md", "graph.mmd", "trace.json"] {
            assert!(dir.path().join("out").join(name).exists(), "{} missing", name);
        }
    }

    #[tokio::test]
    async fn test_missing_bundle() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir);
        args.bundle = PathBuf::from("/no/such/bundle.json");
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        assert!(execute_run(args, &Config::default(), &formatter)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unverifiable_bundle() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir);
        let broken = BUNDLE.replace(
            "\"snippet\": \"Synthetic data raised accuracy by four points.\"",
            "\"snippet\": \"Nothing like this is in the page.\"",
        );
        std::fs::write(&args.bundle, broken).unwrap();

        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let error = execute_run(args, &Config::default(), &formatter)
            .await
            .unwrap_err();
        assert!(error.is_insufficient_evidence());
    }
}
