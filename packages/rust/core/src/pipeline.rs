//! Batch runner: validate → relink → generate → publish → record, per task.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use pbnforge_generator::ArticleGenerator;
use pbnforge_shared::{
    AppConfig, PublishResult, PublishStatus, Result, Secrets, SiteTask, SkippedTask, TaskRecord,
    ValidTask,
};
use pbnforge_wordpress::WpClient;

use crate::manifest;

/// Outcome of a batch.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One entry per executed task, in input order.
    pub results: Vec<PublishResult>,
    /// Same tasks with generation details, for the per-task sinks.
    pub records: Vec<TaskRecord>,
    pub skipped: Vec<SkippedTask>,
}

impl RunReport {
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn links_inserted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.updated_old_post.is_some())
            .count()
    }
}

/// Progress callback for reporting batch status.
pub trait RunProgress: Send + Sync {
    /// Called before a task is validated. `index` is zero-based.
    fn task_started(&self, index: usize, total: usize, site: &str);
    /// Called when a task enters a new step.
    fn phase(&self, name: &str);
    /// Called when a task was skipped for missing fields.
    fn task_skipped(&self, skipped: &SkippedTask);
    /// Called after a task's result is recorded.
    fn task_finished(&self, record: &TaskRecord);
    /// Called once the manifest is written.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn task_started(&self, _index: usize, _total: usize, _site: &str) {}
    fn phase(&self, _name: &str) {}
    fn task_skipped(&self, _skipped: &SkippedTask) {}
    fn task_finished(&self, _record: &TaskRecord) {}
    fn done(&self, _report: &RunReport) {}
}

/// Runs tasks strictly in sequence against one shared generator and client.
pub struct TaskRunner {
    generator: ArticleGenerator,
    wordpress: WpClient,
    results_path: PathBuf,
}

impl TaskRunner {
    pub fn new(generator: ArticleGenerator, wordpress: WpClient, results_path: PathBuf) -> Self {
        Self {
            generator,
            wordpress,
            results_path,
        }
    }

    pub fn from_config(config: &AppConfig, secrets: &Secrets) -> Result<Self> {
        let generator =
            ArticleGenerator::from_config(&config.generation, secrets.gemini_api_key.as_deref())?;
        let wordpress = WpClient::new(&config.wordpress)?;
        Ok(Self::new(
            generator,
            wordpress,
            config.output.results_path.clone(),
        ))
    }

    /// Execute one validated task. Never fails: any publish error becomes
    /// an `error` result.
    #[instrument(skip_all, fields(index = index, site = %task.site_url))]
    pub async fn run_task(
        &self,
        index: usize,
        task: &ValidTask,
        progress: &dyn RunProgress,
    ) -> TaskRecord {
        // Relinking is best-effort and independent of the new post.
        progress.phase("Linking older post");
        let updated_old_post = match self
            .wordpress
            .try_insert_internal_link(
                &task.site_url,
                &task.credentials,
                &task.target_url,
                &task.anchor,
                &task.topic,
            )
            .await
        {
            Ok(outcome) => outcome.post_url().map(String::from),
            Err(e) => {
                warn!(error = %e, "internal linking failed, continuing");
                None
            }
        };

        progress.phase("Generating article");
        let article = self
            .generator
            .generate(&task.topic, &task.target_url, &task.anchor, task.style)
            .await;

        progress.phase("Publishing");
        let (status, new_post_url) = match self
            .wordpress
            .publish(
                &task.site_url,
                &task.credentials,
                &article.title,
                &article.body_html,
            )
            .await
        {
            Ok(post) => (PublishStatus::Success, Some(post.link)),
            Err(e) => {
                warn!(error = %e, "publish failed");
                (PublishStatus::Error, None)
            }
        };

        TaskRecord {
            index,
            topic: task.topic.clone(),
            style: task.style,
            model_used: article.model_used,
            result: PublishResult {
                site: task.site_url.clone(),
                status,
                new_post_url,
                updated_old_post,
            },
        }
    }

    /// Run every task without touching the manifest.
    pub async fn process(&self, tasks: &[SiteTask], progress: &dyn RunProgress) -> RunReport {
        let mut report = RunReport::default();
        let total = tasks.len();

        for (index, task) in tasks.iter().enumerate() {
            progress.task_started(index, total, task.site_url.as_deref().unwrap_or(""));

            let valid = match task.validate() {
                Ok(valid) => valid,
                Err(missing) => {
                    warn!(task = index + 1, ?missing, "skipping task with missing fields");
                    let skipped = SkippedTask { index, missing };
                    progress.task_skipped(&skipped);
                    report.skipped.push(skipped);
                    continue;
                }
            };

            let record = self.run_task(index, &valid, progress).await;
            progress.task_finished(&record);
            report.results.push(record.result.clone());
            report.records.push(record);
        }

        report
    }

    /// Run the batch and persist `results.json`.
    #[instrument(skip_all, fields(tasks = tasks.len(), out = %self.results_path.display()))]
    pub async fn run_tasks(
        &self,
        tasks: &[SiteTask],
        progress: &dyn RunProgress,
    ) -> Result<RunReport> {
        let report = self.process(tasks, progress).await;

        manifest::write_results(&self.results_path, &report.results)?;
        info!(
            executed = report.results.len(),
            successful = report.successful(),
            skipped = report.skipped.len(),
            "batch complete"
        );

        progress.done(&report);
        Ok(report)
    }
}
