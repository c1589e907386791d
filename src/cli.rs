//! CLI command implementations.
//!
//! Each `run_*` function performs one command and returns its response
//! struct; the binary only parses arguments, resolves configuration and
//! emits the result.

use std::fs;
use std::path::{Path, PathBuf};

use statesel_core::filter::{parse_filter_expr, parse_filter_json, Predicate};
use statesel_core::node::TypeRegistry;
use statesel_core::state::State;
use statesel_text::source::{DataSource, SourceConfig};

use crate::config::ResolvedConfig;
use crate::error::SelError;
use crate::output::{
    ExplainResponse, Partition, PrepareResponse, SelectResponse, SplitCounts, SplitResponse,
    SCHEMA_VERSION,
};

/// How filter arguments are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterSyntax {
    /// `tag:a and not path:bias`
    #[default]
    Expression,
    /// `["a", {"not": {"path_contains": "bias"}}]`
    Json,
}

/// Parse one filter argument.
pub fn parse_filter(
    input: &str,
    syntax: FilterSyntax,
    registry: &TypeRegistry,
) -> Result<Predicate, SelError> {
    let predicate = match syntax {
        FilterSyntax::Expression => parse_filter_expr(input, registry)?,
        FilterSyntax::Json => parse_filter_json(input, registry)?,
    };
    tracing::debug!(filter = %predicate, "parsed filter");
    Ok(predicate)
}

fn parse_filters(
    inputs: &[String],
    syntax: FilterSyntax,
    registry: &TypeRegistry,
) -> Result<Vec<Predicate>, SelError> {
    if inputs.is_empty() {
        return Err(SelError::invalid_args("at least one filter is required"));
    }
    inputs
        .iter()
        .map(|input| parse_filter(input, syntax, registry))
        .collect()
}

/// Read and decode a state file.
pub fn read_state(path: &Path, registry: &TypeRegistry) -> Result<State, SelError> {
    let content = fs::read_to_string(path).map_err(|e| SelError::FileError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    State::from_json_str(&content, registry).map_err(|err| match SelError::from(err) {
        SelError::DataError { message, path: None } => {
            SelError::data(message, Some(path.display().to_string()))
        }
        other => other,
    })
}

/// Show the canonical form of a filter.
pub fn run_explain(
    input: &str,
    syntax: FilterSyntax,
    registry: &TypeRegistry,
) -> Result<ExplainResponse, SelError> {
    let predicate = parse_filter(input, syntax, registry)?;
    Ok(ExplainResponse::new(
        predicate.to_string(),
        predicate.children().len(),
    ))
}

/// Keep the leaves of a state file matched by any filter.
pub fn run_select(
    state_path: &Path,
    filters: &[String],
    syntax: FilterSyntax,
    registry: &TypeRegistry,
) -> Result<SelectResponse, SelError> {
    let _span = tracing::info_span!("select", state = %state_path.display()).entered();

    let predicates = parse_filters(filters, syntax, registry)?;
    let state = read_state(state_path, registry)?;
    let selected = state.filter(&predicates);
    tracing::info!(selected = selected.len(), total = state.len(), "selected leaves");

    Ok(SelectResponse::new(
        predicates.iter().map(Predicate::to_string).collect(),
        selected.len(),
        selected.to_json()?,
    ))
}

/// Partition a state file by first-matching filter.
pub fn run_split(
    state_path: &Path,
    filters: &[String],
    syntax: FilterSyntax,
    registry: &TypeRegistry,
) -> Result<SplitResponse, SelError> {
    let _span = tracing::info_span!("split", state = %state_path.display()).entered();

    let predicates = parse_filters(filters, syntax, registry)?;
    let state = read_state(state_path, registry)?;
    let parts = state.split(&predicates)?;

    let partitions = predicates
        .iter()
        .zip(parts)
        .map(|(predicate, part)| {
            Ok(Partition {
                filter: predicate.to_string(),
                count: part.len(),
                state: part.to_json()?,
            })
        })
        .collect::<Result<Vec<_>, SelError>>()?;
    Ok(SplitResponse::new(partitions))
}

/// Inputs of the prepare command beyond the resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct PrepareArgs {
    pub data_dir: PathBuf,
    pub glove: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub vocab: Option<PathBuf>,
    pub embed: Option<PathBuf>,
}

/// Build or load the vocabulary and embeddings, then batch every split.
pub fn run_prepare(args: &PrepareArgs, config: &ResolvedConfig) -> Result<PrepareResponse, SelError> {
    let _span = tracing::info_span!("prepare", data_dir = %args.data_dir.display()).entered();

    let source = DataSource::open(SourceConfig {
        data_dir: args.data_dir.clone(),
        batch_size: config.batch_size.value,
        shuffle_seed: config.shuffle_seed.value,
        glove_path: args.glove.clone(),
        glove_dim: config.glove_dim.value,
        cache_dir: args.cache_dir.clone(),
        vocab_path: args.vocab.clone(),
        embed_path: args.embed.clone(),
    })?;

    let batches = SplitCounts {
        train: source.train_batches(0)?.len(),
        valid: source.valid_batches()?.len(),
        test: source.test_batches()?.len(),
    };

    Ok(PrepareResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        vocab_size: source.vocab_size(),
        embedding_dim: source.embeddings().dim(),
        examples: SplitCounts {
            train: source.train().len(),
            valid: source.valid().len(),
            test: source.test().len(),
        },
        batches,
        sample: source.train().first().cloned(),
        config: config.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    fn write_state(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{
                "params": {"dense": {"kernel": {"type": "Param", "value": [1.0]},
                                     "bias": {"type": "Param", "value": [0.0]}}},
                "batch_stats": {"mean": {"type": "BatchStat", "value": [0.5]}}
            }"#,
        )
        .unwrap();
        path
    }

    fn filters(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Explain Tests
    // =========================================================================

    #[test]
    fn test_explain_expression() {
        let response =
            run_explain("type:Param and not path:bias", FilterSyntax::Expression, &registry())
                .unwrap();
        assert_eq!(response.predicate, "All(OfType(Param), Not(PathContains('bias')))");
        assert_eq!(response.children, 2);
    }

    #[test]
    fn test_explain_json_rejects_number() {
        let err = run_explain("3", FilterSyntax::Json, &registry()).unwrap_err();
        assert!(matches!(err, SelError::InvalidFilter { .. }));
    }

    // =========================================================================
    // Select / Split Tests
    // =========================================================================

    #[test]
    fn test_select() {
        let dir = TempDir::new().unwrap();
        let path = write_state(&dir);
        let response = run_select(
            &path,
            &filters(&["path:bias", "type:BatchStat"]),
            FilterSyntax::Expression,
            &registry(),
        )
        .unwrap();
        assert_eq!(response.count, 2);
        assert!(response.state["params"]["dense"]["bias"].is_object());
        assert!(response.state["params"]["dense"].get("kernel").is_none());
    }

    #[test]
    fn test_split_non_exhaustive() {
        let dir = TempDir::new().unwrap();
        let path = write_state(&dir);
        let err = run_split(&path, &filters(&["type:Param"]), FilterSyntax::Expression, &registry())
            .unwrap_err();
        assert!(matches!(err, SelError::NonExhaustive { paths } if paths == vec!["batch_stats/mean"]));
    }

    #[test]
    fn test_split_with_wildcard() {
        let dir = TempDir::new().unwrap();
        let path = write_state(&dir);
        let response = run_split(
            &path,
            &filters(&["{\"type\": \"Param\"}", "\"...\""]),
            FilterSyntax::Json,
            &registry(),
        )
        .unwrap();
        assert_eq!(response.partitions.len(), 2);
        assert_eq!(response.partitions[0].count, 2);
        assert_eq!(response.partitions[1].filter, "Everything()");
        assert_eq!(response.partitions[1].count, 1);
    }

    #[test]
    fn test_missing_state_file() {
        let dir = TempDir::new().unwrap();
        let err = run_select(
            &dir.path().join("nope.json"),
            &filters(&["..."]),
            FilterSyntax::Expression,
            &registry(),
        )
        .unwrap_err();
        assert_eq!(err.error_code().code(), 3);
    }

    #[test]
    fn test_malformed_state_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"w": 1}"#).unwrap();
        let err = run_select(&path, &filters(&["..."]), FilterSyntax::Expression, &registry())
            .unwrap_err();
        assert!(matches!(err, SelError::DataError { path: Some(_), .. }));
    }

    #[test]
    fn test_no_filters() {
        let dir = TempDir::new().unwrap();
        let path = write_state(&dir);
        let err = run_select(&path, &[], FilterSyntax::Expression, &registry()).unwrap_err();
        assert_eq!(err.error_code().code(), 2);
    }

    // =========================================================================
    // Prepare Tests
    // =========================================================================

    #[test]
    fn test_prepare() {
        let dir = TempDir::new().unwrap();
        let data = dir.path();
        fs::write(data.join("train.tsv"), "sentence\tlabel\na film\t1\nthe film\t0\nbad\t0\n").unwrap();
        fs::write(data.join("dev.tsv"), "sentence\tlabel\na film\t1\n").unwrap();
        fs::write(data.join("test.tsv"), "index\tsentence\n0\tfilm\n").unwrap();
        fs::write(data.join("glove.txt"), "film 1 2\nthe 3 4\n").unwrap();

        let mut config = ResolvedConfig::default();
        config.batch_size.value = 2;
        config.glove_dim.value = 2;

        let args = PrepareArgs {
            data_dir: data.to_path_buf(),
            glove: Some(data.join("glove.txt")),
            ..PrepareArgs::default()
        };
        let response = run_prepare(&args, &config).unwrap();

        assert_eq!(response.vocab_size, 6);
        assert_eq!(response.embedding_dim, 2);
        assert_eq!(
            response.examples,
            SplitCounts {
                train: 3,
                valid: 1,
                test: 1
            }
        );
        assert_eq!(
            response.batches,
            SplitCounts {
                train: 1,
                valid: 1,
                test: 1
            }
        );
        assert_eq!(response.sample.unwrap().token_ids, vec![2, 1, 4, 3]);
    }
}
