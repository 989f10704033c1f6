//! Intake pipeline coordinating extraction, summarization, and assembly.

use crate::{
    assembly::{AssemblyError, ProjectArchive, ProjectAssembler, StagedFile},
    config::{Config, ExtractionFailurePolicy},
    extraction::{ExtractionError, extract, extract_or_fallback},
    metrics::{IntakeMetrics, MetricsSnapshot},
    pipeline::{
        metadata::ProjectMetadata,
        types::{
            InputDocument, PipelineError, PipelineSettings, ProjectRequest, ValidatedProject,
        },
        validate::validate_request,
    },
    summarization::{DocumentSummarizer, SummarizationClientError},
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Runs one project from uploaded files to a finished archive.
///
/// Construct it once near process start and share it through an `Arc`.
pub struct IntakePipeline {
    summarizer: DocumentSummarizer,
    assembler: ProjectAssembler,
    settings: PipelineSettings,
    metrics: Arc<IntakeMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait IntakeApi: Send + Sync {
    /// Validate, summarize, and package a project.
    async fn package_project(
        &self,
        request: ProjectRequest,
    ) -> Result<ProjectArchive, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl IntakePipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        summarizer: DocumentSummarizer,
        assembler: ProjectAssembler,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            summarizer,
            assembler,
            settings,
            metrics: Arc::new(IntakeMetrics::new()),
        }
    }

    /// Build the summarizer, assembler, and settings described by configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let summarizer = DocumentSummarizer::from_config(config)?;
        tracing::info!(
            provider = ?config.summarization_provider,
            model = summarizer.model(),
            "Summarization client initialized"
        );
        let assembler = ProjectAssembler::new(&config.staging_dir, &config.export_dir);
        Ok(Self::new(summarizer, assembler, PipelineSettings::from(config)))
    }

    /// Run the whole pipeline for one request.
    ///
    /// Validation happens before any side effect. A summarization failure for any document aborts
    /// the run before the staging tree is touched, so no partial archive is ever produced.
    pub async fn run(&self, request: ProjectRequest) -> Result<ProjectArchive, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "intake_run",
            %run_id,
            project = %request.project_name.trim()
        );

        let result = self.execute(request).instrument(span.clone()).await;
        match &result {
            Ok(archive) => {
                span.in_scope(|| {
                    tracing::info!(
                        archive = %archive.path.display(),
                        sha256 = %archive.sha256,
                        "Project packaged"
                    )
                });
            }
            Err(error) => {
                self.metrics.record_failure();
                span.in_scope(|| {
                    tracing::error!(
                        stage = error.stage().as_str(),
                        error = %error,
                        "Project run failed"
                    )
                });
            }
        }
        result
    }

    async fn execute(&self, request: ProjectRequest) -> Result<ProjectArchive, PipelineError> {
        let project = validate_request(request)?;
        tracing::info!(
            inputs = project.inputs.len(),
            concurrency = self.settings.concurrency,
            "Request validated"
        );

        let summaries = self.summarize_inputs(&project.inputs).await?;
        let mut metadata = ProjectMetadata::new(&project.form);
        for (document, summary) in project.inputs.iter().zip(&summaries) {
            metadata.push_document(&document.name, summary);
        }

        let final_summary = self.summarize_document(&project.output).await?;
        let metadata = metadata.finish(&final_summary);

        let documents = project.inputs.len() as u64 + 1;
        let archive = self.assemble(project, metadata).await?;
        self.metrics.record_project(documents);
        Ok(archive)
    }

    /// Summarize inputs with at most `concurrency` in flight; results keep upload order.
    async fn summarize_inputs(
        &self,
        inputs: &[InputDocument],
    ) -> Result<Vec<String>, PipelineError> {
        let pending: Vec<_> = inputs
            .iter()
            .map(|document| self.summarize_document(document))
            .collect();
        stream::iter(pending)
            .buffered(self.settings.concurrency.max(1))
            .try_collect()
            .await
    }

    async fn summarize_document(&self, document: &InputDocument) -> Result<String, PipelineError> {
        let span = tracing::info_span!(
            "document",
            name = %document.name,
            kind = document.kind.as_str()
        );
        async {
            let text = self.extract_text(document).await?;
            tracing::debug!(chars = text.chars().count(), "Extracted document text");

            let summary = self
                .summarizer
                .summarize(&document.name, &text)
                .await
                .map_err(|source| PipelineError::Summarization {
                    document: document.name.clone(),
                    source,
                })?;
            tracing::info!("Document summarized");
            Ok::<_, PipelineError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Parse the document on the blocking pool and apply the extraction failure policy.
    async fn extract_text(&self, document: &InputDocument) -> Result<String, PipelineError> {
        let bytes = Arc::clone(&document.bytes);
        let kind = document.kind;
        let max_pages = self.settings.pdf_max_pages;
        let policy = self.settings.failure_policy;
        let span = tracing::Span::current();

        let extracted = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            match policy {
                ExtractionFailurePolicy::Fallback => {
                    Ok(extract_or_fallback(&bytes, kind, max_pages))
                }
                ExtractionFailurePolicy::Abort => extract(&bytes, kind, max_pages),
            }
        })
        .await
        .unwrap_or_else(|join_error| {
            Err(ExtractionError::for_kind(
                kind,
                format!("parser stopped unexpectedly: {join_error}"),
            ))
        });

        match (extracted, policy) {
            (Ok(text), _) => Ok(text),
            // Only a parser panic reaches here under the fallback policy.
            (Err(source), ExtractionFailurePolicy::Fallback) => {
                tracing::warn!(error = %source, "Extraction failed; continuing with fallback text");
                Ok(source.fallback_text().to_string())
            }
            (Err(source), ExtractionFailurePolicy::Abort) => Err(PipelineError::Extraction {
                document: document.name.clone(),
                source,
            }),
        }
    }

    /// Write the staging tree and archive on the blocking pool.
    async fn assemble(
        &self,
        project: ValidatedProject,
        metadata: String,
    ) -> Result<ProjectArchive, PipelineError> {
        let assembler = self.assembler.clone();
        let span = tracing::Span::current();
        let archive = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let staged: Vec<StagedFile<'_>> = project
                .inputs
                .iter()
                .map(|document| StagedFile {
                    name: &document.name,
                    bytes: &document.bytes,
                })
                .collect();
            assembler.assemble(
                &project.project_name,
                &staged,
                &project.output.bytes,
                &metadata,
            )
        })
        .await
        .map_err(|join_error| AssemblyError::Interrupted(join_error.to_string()))??;
        Ok(archive)
    }

    /// Return the current intake metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl IntakeApi for IntakePipeline {
    async fn package_project(
        &self,
        request: ProjectRequest,
    ) -> Result<ProjectArchive, PipelineError> {
        self.run(request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IntakePipeline::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{FINAL_DOCUMENT_NAME, METADATA_FILE_NAME};
    use crate::extraction::{DOCX_FAILURE_SENTINEL, fixtures};
    use crate::pipeline::types::{ProjectForm, Stage, UploadedFile, ValidationError};
    use crate::summarization::testing::ScriptedClient;
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;
    use tempfile::TempDir;

    struct Harness {
        root: TempDir,
        client: Arc<ScriptedClient>,
        pipeline: IntakePipeline,
    }

    fn harness_with(client: ScriptedClient, settings: PipelineSettings) -> Harness {
        let root = TempDir::new().expect("tempdir");
        let client = Arc::new(client);
        let summarizer = DocumentSummarizer::new(client.clone(), "test-model", 2000);
        let assembler =
            ProjectAssembler::new(root.path().join("staging"), root.path().join("exports"));
        Harness {
            pipeline: IntakePipeline::new(summarizer, assembler, settings),
            root,
            client,
        }
    }

    fn harness() -> Harness {
        harness_with(ScriptedClient::default(), PipelineSettings::default())
    }

    fn request(project: &str, inputs: Vec<UploadedFile>) -> ProjectRequest {
        ProjectRequest {
            project_name: project.into(),
            form: ProjectForm {
                client: "ACME".into(),
                project_type: "Oficinas".into(),
                location: "Madrid".into(),
                bim_level: 2,
                bim_uses: "coordinacion, mediciones".into(),
                page_count: 6,
            },
            inputs,
            output: Some(UploadedFile::new(
                "final.docx",
                fixtures::docx_with_paragraphs(&["Pre-BEP final"]),
            )),
        }
    }

    fn read_entry(path: &Path, name: &str) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(File::open(path).expect("open")).expect("zip");
        let mut entry = archive.by_name(name).expect("entry");
        let mut data = Vec::new();
        entry.read_to_end(&mut data).expect("read");
        data
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).expect("open")).expect("zip");
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn packages_single_pdf_project() {
        let harness = harness();
        let pdf = fixtures::pdf_with_pages(&["Memoria del proyecto"]);

        let archive = harness
            .pipeline
            .run(request("demo", vec![UploadedFile::new("a.pdf", pdf.clone())]))
            .await
            .expect("archive");

        assert_eq!(archive.file_name, "demo.zip");
        assert_eq!(
            entry_names(&archive.path),
            vec![
                "inputs/a.pdf".to_string(),
                FINAL_DOCUMENT_NAME.to_string(),
                METADATA_FILE_NAME.to_string(),
            ]
        );
        assert_eq!(read_entry(&archive.path, "inputs/a.pdf"), pdf);

        let metadata =
            String::from_utf8(read_entry(&archive.path, METADATA_FILE_NAME)).expect("utf8");
        assert!(metadata.starts_with("cliente: ACME\ntipo: Oficinas\n"));
        assert!(metadata.contains("  - a.pdf: summary of a.pdf\n"));
        assert!(metadata.ends_with("resumen_prebep_final:\nsummary of final.docx\n"));

        let prompts = harness.client.recorded_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Memoria del proyecto"));
        assert!(prompts[1].contains("Pre-BEP final"));
        assert_eq!(harness.pipeline.metrics_snapshot().projects_packaged, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn preserves_upload_order_with_concurrency() {
        let settings = PipelineSettings {
            concurrency: 3,
            ..PipelineSettings::default()
        };
        let harness = harness_with(ScriptedClient::default(), settings);
        let inputs = ["x.docx", "y.pdf", "z.docx"]
            .into_iter()
            .map(|name| {
                let bytes = if name.ends_with(".pdf") {
                    fixtures::pdf_with_pages(&[name])
                } else {
                    fixtures::docx_with_paragraphs(&[name])
                };
                UploadedFile::new(name, bytes)
            })
            .collect();

        let archive = harness
            .pipeline
            .run(request("ordered", inputs))
            .await
            .expect("archive");

        let metadata =
            String::from_utf8(read_entry(&archive.path, METADATA_FILE_NAME)).expect("utf8");
        let x = metadata.find("  - x.docx:").expect("x line");
        let y = metadata.find("  - y.pdf:").expect("y line");
        let z = metadata.find("  - z.docx:").expect("z line");
        let last = metadata.find("resumen_prebep_final:").expect("final label");
        assert!(x < y && y < z && z < last);
    }

    #[tokio::test]
    async fn validation_failure_has_no_side_effects() {
        let harness = harness();
        let mut missing_output =
            request("demo", vec![UploadedFile::new("a.pdf", b"%PDF".to_vec())]);
        missing_output.output = None;

        for bad in [
            request("", vec![UploadedFile::new("a.pdf", b"%PDF".to_vec())]),
            request("demo", Vec::new()),
            missing_output,
        ] {
            let error = harness.pipeline.run(bad).await.expect_err("invalid request");
            assert_eq!(error.stage(), Stage::Validation);
        }

        assert!(harness.client.recorded_prompts().is_empty());
        assert!(!harness.root.path().join("staging").exists());
        assert!(!harness.root.path().join("exports").exists());
        assert_eq!(harness.pipeline.metrics_snapshot().failed_runs, 3);
    }

    #[tokio::test]
    async fn summarization_failure_aborts_without_archive() {
        let harness =
            harness_with(ScriptedClient::failing_for("b.pdf"), PipelineSettings::default());
        let inputs = vec![
            UploadedFile::new("a.pdf", fixtures::pdf_with_pages(&["A"])),
            UploadedFile::new("b.pdf", fixtures::pdf_with_pages(&["B"])),
            UploadedFile::new("c.pdf", fixtures::pdf_with_pages(&["C"])),
        ];

        let error = harness
            .pipeline
            .run(request("demo", inputs))
            .await
            .expect_err("oracle outage");

        assert_eq!(error.stage(), Stage::Summarization);
        assert!(matches!(
            &error,
            PipelineError::Summarization { document, .. } if document == "b.pdf"
        ));
        assert_eq!(harness.client.recorded_prompts().len(), 2);
        assert!(!harness.root.path().join("staging").join("demo").exists());
        assert!(!harness.root.path().join("exports").join("demo.zip").exists());
    }

    #[tokio::test]
    async fn unreadable_docx_uses_sentinel_by_default() {
        let harness = harness();
        let broken = UploadedFile::new("roto.docx", b"garbage".to_vec());
        let archive = harness
            .pipeline
            .run(request("broken", vec![broken]))
            .await
            .expect("archive despite unreadable input");

        let prompts = harness.client.recorded_prompts();
        assert!(prompts[0].contains(DOCX_FAILURE_SENTINEL));
        assert_eq!(read_entry(&archive.path, "inputs/roto.docx"), b"garbage");
    }

    #[tokio::test]
    async fn unreadable_document_aborts_under_abort_policy() {
        let settings = PipelineSettings {
            failure_policy: ExtractionFailurePolicy::Abort,
            ..PipelineSettings::default()
        };
        let harness = harness_with(ScriptedClient::default(), settings);

        let broken = UploadedFile::new("roto.docx", b"garbage".to_vec());
        let error = harness
            .pipeline
            .run(request("strict", vec![broken]))
            .await
            .expect_err("abort policy");

        assert_eq!(error.stage(), Stage::Extraction);
        assert!(harness.client.recorded_prompts().is_empty());
        assert!(!harness.root.path().join("staging").exists());
    }

    #[tokio::test]
    async fn rerun_with_same_name_replaces_previous_archive() {
        let harness = harness();
        let first = UploadedFile::new("first.pdf", fixtures::pdf_with_pages(&["1"]));
        let second = UploadedFile::new("second.pdf", fixtures::pdf_with_pages(&["2"]));
        harness
            .pipeline
            .run(request("demo", vec![first]))
            .await
            .expect("first run");
        let archive = harness
            .pipeline
            .run(request("demo", vec![second]))
            .await
            .expect("second run");

        let names = entry_names(&archive.path);
        assert!(names.contains(&"inputs/second.pdf".to_string()));
        assert!(!names.contains(&"inputs/first.pdf".to_string()));
        let metadata =
            String::from_utf8(read_entry(&archive.path, METADATA_FILE_NAME)).expect("utf8");
        assert!(!metadata.contains("first.pdf"));
    }

    #[tokio::test]
    async fn duplicate_input_names_are_rejected() {
        let harness = harness();
        let error = harness
            .pipeline
            .run(request(
                "dupes",
                vec![
                    UploadedFile::new("a.pdf", b"1".to_vec()),
                    UploadedFile::new("a.pdf", b"2".to_vec()),
                ],
            ))
            .await
            .expect_err("duplicate names");

        assert!(matches!(
            error,
            PipelineError::Validation(ValidationError::DuplicateInputName(ref name))
                if name == "a.pdf"
        ));
    }
}
