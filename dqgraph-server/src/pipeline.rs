// Copyright 2025 DQGraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Conversion pipeline: canonical rules JSON -> RML mapping -> RDF.
//!
//! Both converters run as containerized subprocesses behind the
//! [`CommandRunner`] capability trait, so the orchestrator never
//! touches `std::process` directly and tests can substitute a mock.
//! Artifacts double as stage-completion markers: the compile stage is
//! skipped when its output already exists, the mapping stage always
//! runs. The service never deletes an artifact; cleanup is the
//! operator's job. Concurrent runs against the same artifact paths
//! race and must be serialized by the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use dqgraph_core::{rules::normalize_rules, DqError};

use crate::config::PipelineConfig;

/// Canonical rules document written by the upload handler.
pub const DATA_JSON: &str = "data.json";
/// YARRRML rules file, supplied by the operator.
pub const RULES_YML: &str = "rules.yml";
/// Compiled RML mapping document, produced by the compile stage.
pub const RULES_RML_TTL: &str = "rules.rml.ttl";
/// Generated RDF output, produced by the mapping stage.
pub const OUTPUT_TTL: &str = "output.ttl";

/// Captured result of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Narrow capability interface for invoking an external converter.
/// Swappable for an in-process library call or a remote execution
/// service without touching the orchestrator.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, DqError>;
}

/// Production runner: spawns the process and waits for it, capturing
/// both streams.
pub struct ProcessRunner;

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, DqError> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub skipped: bool,
    pub detail: String,
}

/// Outcome of a full pipeline run, with the artifact locations as
/// downstream-consumable paths.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub data_json: PathBuf,
    pub rules_rml_ttl: PathBuf,
    pub output_ttl: PathBuf,
}

/// Sequences the conversion stages over a shared artifact directory.
pub struct Pipeline {
    config: PipelineConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    /// Persist the canonical `{"rules": [...]}` document to
    /// `data.json`, creating parent directories as needed.
    pub fn write_rules(&self, raw: &str) -> Result<PathBuf, DqError> {
        let doc = normalize_rules(raw)?;
        std::fs::create_dir_all(&self.config.data_dir)?;
        let path = self.artifact_path(DATA_JSON);
        let pretty = serde_json::to_string_pretty(&doc)
            .map_err(|e| DqError::InvalidInput(format!("cannot serialize rules: {e}")))?;
        std::fs::write(&path, pretty)?;
        info!(path = %path.display(), "wrote canonical rules document");
        Ok(path)
    }

    /// Run the two conversion stages in order. The first failure
    /// aborts the remainder; no stage is ever retried here.
    pub async fn run(&self) -> Result<PipelineReport, DqError> {
        let mut stages = Vec::new();

        // Compile stage: YARRRML -> RML.
        let rules_yml = self.artifact_path(RULES_YML);
        if !rules_yml.exists() {
            return Err(DqError::MissingInput(rules_yml));
        }
        let rml_path = self.artifact_path(RULES_RML_TTL);
        if rml_path.exists() {
            info!("{RULES_RML_TTL} already exists; skipping YARRRML -> RML");
            stages.push(StageReport {
                stage: "compile",
                skipped: true,
                detail: format!("{RULES_RML_TTL} already exists; skipping YARRRML -> RML"),
            });
        } else {
            let stdout = self
                .invoke(
                    &self.config.yarrrml_image,
                    &["-i", "/data/rules.yml", "-o", "/data/rules.rml.ttl"],
                )
                .await?;
            if !rml_path.exists() {
                return Err(DqError::StageExecutionFailed {
                    command: self.config.yarrrml_image.clone(),
                    stdout,
                    stderr: format!("{RULES_RML_TTL} was not generated"),
                });
            }
            stages.push(StageReport {
                stage: "compile",
                skipped: false,
                detail: stdout,
            });
        }

        // Mapping stage: RML -> RDF, never skipped.
        let output_path = self.artifact_path(OUTPUT_TTL);
        let stdout = self
            .invoke(
                &self.config.rmlmapper_image,
                &["-m", "/data/rules.rml.ttl", "-o", "/data/output.ttl"],
            )
            .await?;
        // An exit-zero converter with no output is still a failure.
        if !output_path.exists() {
            return Err(DqError::StageExecutionFailed {
                command: self.config.rmlmapper_image.clone(),
                stdout,
                stderr: format!("{OUTPUT_TTL} was not generated"),
            });
        }
        stages.push(StageReport {
            stage: "map",
            skipped: false,
            detail: stdout,
        });

        Ok(PipelineReport {
            stages,
            data_json: self.artifact_path(DATA_JSON),
            rules_rml_ttl: rml_path,
            output_ttl: output_path,
        })
    }

    /// Invoke one containerized converter with the artifact directory
    /// mounted at /data. Non-zero exit surfaces the full command line
    /// and both streams verbatim.
    async fn invoke(&self, image: &str, tail: &[&str]) -> Result<String, DqError> {
        let mount = format!("{}:/data", self.config.data_dir.display());
        let mut args: Vec<String> = ["run", "--rm", "-i", "-v"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(mount);
        args.push(image.to_string());
        args.extend(tail.iter().map(|s| s.to_string()));

        info!(image, "invoking converter");
        let output = self.runner.run("docker", &args).await?;
        if !output.succeeded() {
            return Err(DqError::StageExecutionFailed {
                command: format!("docker {}", args.join(" ")),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and simulates converter side effects
    /// by touching the expected output file.
    struct MockRunner {
        calls: Mutex<Vec<Vec<String>>>,
        data_dir: PathBuf,
        exit_code: i32,
        stderr: String,
        create_outputs: bool,
    }

    impl MockRunner {
        fn succeeding(data_dir: &Path) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                data_dir: data_dir.to_path_buf(),
                exit_code: 0,
                stderr: String::new(),
                create_outputs: true,
            }
        }

        fn failing(data_dir: &Path, stderr: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                data_dir: data_dir.to_path_buf(),
                exit_code: 1,
                stderr: stderr.to_string(),
                create_outputs: false,
            }
        }

        fn calls_matching(&self, needle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|args| args.iter().any(|a| a.contains(needle)))
                .count()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput, DqError> {
            self.calls.lock().unwrap().push(args.to_vec());
            if self.create_outputs {
                if args.iter().any(|a| a.contains("yarrrml")) {
                    std::fs::write(self.data_dir.join(RULES_RML_TTL), "# rml").unwrap();
                }
                if args.iter().any(|a| a.contains("rmlmapper")) {
                    std::fs::write(self.data_dir.join(OUTPUT_TTL), "# ttl").unwrap();
                }
            }
            Ok(CommandOutput {
                exit_code: Some(self.exit_code),
                stdout: String::new(),
                stderr: self.stderr.clone(),
            })
        }
    }

    fn pipeline_with(dir: &Path, runner: Arc<dyn CommandRunner>) -> Pipeline {
        let config = PipelineConfig {
            data_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        };
        Pipeline::new(config, runner)
    }

    #[tokio::test]
    async fn full_run_invokes_both_converters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RULES_YML), "mappings: {}").unwrap();
        let runner = Arc::new(MockRunner::succeeding(dir.path()));
        let pipeline = pipeline_with(dir.path(), runner.clone());

        let report = pipeline.run().await.unwrap();
        assert_eq!(runner.calls_matching("yarrrml"), 1);
        assert_eq!(runner.calls_matching("rmlmapper"), 1);
        assert_eq!(report.stages.len(), 2);
        assert!(!report.stages[0].skipped);
        assert!(report.output_ttl.exists());
    }

    #[tokio::test]
    async fn compile_stage_skips_when_mapping_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RULES_YML), "mappings: {}").unwrap();
        std::fs::write(dir.path().join(RULES_RML_TTL), "# rml").unwrap();
        let runner = Arc::new(MockRunner::succeeding(dir.path()));
        let pipeline = pipeline_with(dir.path(), runner.clone());

        let report = pipeline.run().await.unwrap();
        assert_eq!(runner.calls_matching("yarrrml"), 0);
        assert_eq!(report.stages[0].stage, "compile");
        assert!(report.stages[0].skipped);
        assert!(report.stages[0].detail.contains("already exists"));
    }

    #[tokio::test]
    async fn mapping_stage_is_never_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RULES_YML), "mappings: {}").unwrap();
        let runner = Arc::new(MockRunner::succeeding(dir.path()));
        let pipeline = pipeline_with(dir.path(), runner.clone());

        pipeline.run().await.unwrap();
        pipeline.run().await.unwrap();
        // Second run skips compilation but still maps.
        assert_eq!(runner.calls_matching("yarrrml"), 1);
        assert_eq!(runner.calls_matching("rmlmapper"), 2);
    }

    #[tokio::test]
    async fn missing_rules_file_aborts_before_any_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::succeeding(dir.path()));
        let pipeline = pipeline_with(dir.path(), runner.clone());

        match pipeline.run().await {
            Err(DqError::MissingInput(path)) => {
                assert!(path.ends_with(RULES_YML));
            }
            other => panic!("expected MissingInput, got {other:?}"),
        }
        assert_eq!(runner.total_calls(), 0);
    }

    #[tokio::test]
    async fn failing_stage_surfaces_stderr_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RULES_YML), "mappings: {}").unwrap();
        let runner = Arc::new(MockRunner::failing(dir.path(), "bad mapping"));
        let pipeline = pipeline_with(dir.path(), runner);

        match pipeline.run().await {
            Err(DqError::StageExecutionFailed {
                command, stderr, ..
            }) => {
                assert!(command.starts_with("docker run"));
                assert_eq!(stderr, "bad mapping");
            }
            other => panic!("expected StageExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_exit_without_output_is_a_stage_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RULES_YML), "mappings: {}").unwrap();
        std::fs::write(dir.path().join(RULES_RML_TTL), "# rml").unwrap();
        // Succeeds but creates nothing.
        let runner = Arc::new(MockRunner {
            calls: Mutex::new(Vec::new()),
            data_dir: dir.path().to_path_buf(),
            exit_code: 0,
            stderr: String::new(),
            create_outputs: false,
        });
        let pipeline = pipeline_with(dir.path(), runner);

        match pipeline.run().await {
            Err(DqError::StageExecutionFailed { stderr, .. }) => {
                assert!(stderr.contains("was not generated"));
            }
            other => panic!("expected StageExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_rules_persists_canonical_document() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::succeeding(dir.path()));
        let pipeline = pipeline_with(dir.path(), runner);

        let path = pipeline.write_rules(r#"[{"a":1}]"#).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({"rules":[{"a":1}]}));
    }
}
