use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::config::RunConfig;
use crate::core::extractor::{extract_sequence, FrameExtractor, SequenceOutcome};
use crate::core::failure_log::FailureLog;
use crate::core::fetcher::{SourceArtifacts, VideoFetcher};
use crate::core::layout::OutputLayout;
use crate::core::metadata::SourceRecord;
use crate::shared::constants;
use crate::utils::logger;
use crate::utils::time_utils::Timer;

/// Terminal state of one source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Every sequence directory already existed.
    Skipped,
    FetchFailed,
    Done,
    /// Stop was requested before the source started.
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTally {
    pub extracted: usize,
    pub frames: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SequenceTally {
    fn add(&mut self, outcome: SequenceOutcome) {
        match outcome {
            SequenceOutcome::Extracted { frames } => {
                self.extracted += 1;
                self.frames += frames;
            }
            SequenceOutcome::Skipped => self.skipped += 1,
            SequenceOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub url: String,
    pub state: SourceState,
    pub sequences: SequenceTally,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub done: usize,
    pub skipped: usize,
    pub fetch_failed: usize,
    pub cancelled: usize,
    pub sequences: SequenceTally,
    pub failed_urls: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn add(&mut self, report: &SourceReport) {
        match report.state {
            SourceState::Done => self.done += 1,
            SourceState::Skipped => self.skipped += 1,
            SourceState::FetchFailed => {
                self.fetch_failed += 1;
                self.failed_urls.push(report.url.clone());
            }
            SourceState::Cancelled => self.cancelled += 1,
        }
        self.sequences.extracted += report.sequences.extracted;
        self.sequences.frames += report.sequences.frames;
        self.sequences.skipped += report.sequences.skipped;
        self.sequences.failed += report.sequences.failed;
    }

    pub fn total(&self) -> usize {
        self.done + self.skipped + self.fetch_failed + self.cancelled
    }

    pub fn log(&self) {
        logger::info(&format!(
            "Sources: {} done, {} skipped, {} failed to download, {} cancelled",
            self.done, self.skipped, self.fetch_failed, self.cancelled
        ));
        logger::info(&format!(
            "Sequences: {} extracted ({} frames), {} skipped, {} failed",
            self.sequences.extracted,
            self.sequences.frames,
            self.sequences.skipped,
            self.sequences.failed
        ));
        for url in &self.failed_urls {
            logger::debug(&format!("Download failed: {}", url));
        }
        logger::info(&format!("Elapsed: {:.1}s", self.elapsed.as_secs_f64()));
    }
}

/// Directory and pool settings the coordinator needs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_root: PathBuf,
    pub cookies_dir: PathBuf,
    pub work_dir: PathBuf,
    pub failure_log_path: PathBuf,
    pub num_threads: usize,
    pub extract_threads: usize,
}

impl From<&RunConfig> for PipelineOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            output_root: config.output_root.clone(),
            cookies_dir: config.cookies_dir.clone(),
            work_dir: config.work_dir.clone(),
            failure_log_path: config.failure_log_path.clone(),
            num_threads: config.num_threads,
            extract_threads: config.extract_threads,
        }
    }
}

/// Drives fetch, extract and cleanup for every source video.
///
/// Sources run on a fixed set of `num_threads` workers, each taking one
/// source to completion before pulling the next. After a successful fetch the
/// source's sequences fan out over a pool of `extract_threads`.
pub struct Pipeline {
    fetcher: Arc<dyn VideoFetcher>,
    extractor: Arc<dyn FrameExtractor>,
    layout: OutputLayout,
    failure_log: FailureLog,
    cookies_dir: PathBuf,
    work_dir: PathBuf,
    num_threads: usize,
    extract_threads: usize,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        fetcher: Arc<dyn VideoFetcher>,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            layout: OutputLayout::new(options.output_root),
            failure_log: FailureLog::new(options.failure_log_path),
            cookies_dir: options.cookies_dir,
            work_dir: options.work_dir,
            num_threads: options.num_threads.max(1),
            extract_threads: options.extract_threads.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that, once set, keeps workers from starting further sources.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Processes every record. Per-source failures are recorded in the
    /// summary; only an unusable output root is an error.
    pub fn run(&self, records: &[SourceRecord]) -> Result<RunSummary> {
        self.layout.ensure_root()?;

        let timer = Timer::new();
        let total = records.len();
        logger::info(&format!("Start downloading {} movies", total));

        let (job_tx, job_rx) = unbounded::<(usize, &SourceRecord)>();
        for job in records.iter().enumerate() {
            // Receiver is alive until the scope below ends.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (report_tx, report_rx) = unbounded::<SourceReport>();
        let workers = self.num_threads.min(total.max(1));

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let report_tx = report_tx.clone();
                scope.spawn(move || self.worker(job_rx, report_tx, total));
            }
        });
        drop(report_tx);

        let mut summary = RunSummary::default();
        for report in report_rx.iter() {
            summary.add(&report);
        }
        summary.elapsed = timer.elapsed();
        Ok(summary)
    }

    fn worker(
        &self,
        jobs: Receiver<(usize, &SourceRecord)>,
        reports: Sender<SourceReport>,
        total: usize,
    ) {
        for (idx, record) in jobs.iter() {
            let report = if self.stop.load(Ordering::SeqCst) {
                SourceReport {
                    url: record.url().to_string(),
                    state: SourceState::Cancelled,
                    sequences: SequenceTally::default(),
                }
            } else {
                self.process_source(record, idx, total)
            };
            let _ = reports.send(report);
        }
    }

    /// Runs one source through skip check, fetch, fan-out and cleanup.
    pub fn process_source(
        &self,
        record: &SourceRecord,
        idx: usize,
        total: usize,
    ) -> SourceReport {
        let video_id = record.video_id();
        let mut report = SourceReport {
            url: record.url().to_string(),
            state: SourceState::Skipped,
            sequences: SequenceTally::default(),
        };

        if self.layout.source_done(record) {
            logger::info(&format!(
                "Skipping {} - all {} sequences already exist",
                video_id,
                record.len()
            ));
            return report;
        }

        logger::info(&format!("Downloading {}/{}: {} ...", idx + 1, total, video_id));
        let mut artifacts = SourceArtifacts::new(
            self.work_dir.join(&video_id),
            self.cookies_dir
                .join(format!("{}.{}", video_id, constants::COOKIE_EXTENSION)),
        );

        match self
            .fetcher
            .fetch(record.url(), &artifacts.credential, &artifacts.video)
        {
            Ok(video) => artifacts.video = video,
            Err(err) => {
                logger::error(&format!("Failed to download {}: {}", record.url(), err));
                if let Err(log_err) = self
                    .failure_log
                    .record(record.url(), || artifacts.remove_credential())
                {
                    logger::error(&format!(
                        "Failed to append to {}: {}",
                        self.failure_log.path().display(),
                        log_err
                    ));
                    artifacts.remove_credential();
                }
                artifacts.remove_video();
                report.state = SourceState::FetchFailed;
                return report;
            }
        }

        let outcomes = self.extract_all(record, &artifacts);
        artifacts.cleanup();

        let had_fatal = outcomes.iter().any(|outcome| outcome.is_fatal());
        for outcome in outcomes {
            report.sequences.add(outcome);
        }
        let log_line = format!(
            "Finished {}: {} extracted, {} skipped, {} failed",
            video_id,
            report.sequences.extracted,
            report.sequences.skipped,
            report.sequences.failed
        );
        if had_fatal {
            logger::warn(&log_line);
        } else {
            logger::info(&log_line);
        }
        report.state = SourceState::Done;
        report
    }

    fn extract_all(
        &self,
        record: &SourceRecord,
        artifacts: &SourceArtifacts,
    ) -> Vec<SequenceOutcome> {
        let extractor = self.extractor.as_ref();
        let video = artifacts.video.as_path();
        let layout = &self.layout;

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.extract_threads)
            .build()
        {
            Ok(pool) => pool.install(|| {
                record
                    .sequences()
                    .par_iter()
                    .map(|sequence| extract_sequence(extractor, video, sequence, layout))
                    .collect()
            }),
            Err(err) => {
                logger::warn(&format!(
                    "Failed to build extraction pool ({}); extracting {} sequentially",
                    err,
                    record.url()
                ));
                record
                    .sequences()
                    .iter()
                    .map(|sequence| extract_sequence(extractor, video, sequence, layout))
                    .collect()
            }
        }
    }
}
