//! Run-level pipeline: archive records in, package items out.
//!
//! A first pass over the archives collects the package path of every record
//! (URLs only) so links can tell captured pages from missing ones. Then
//! records are streamed from every input archive in bounded batches. Each
//! batch is planned sequentially (dedup, scope, revisits, redirects), its
//! records are rewritten in parallel on rayon, and the resulting items are
//! written in record order.

pub mod errors;
pub mod progress;

pub use errors::{ConvertError, ConvertResult};
pub use progress::{JsonProgressFile, NoOpProgress, ProgressReporter, ProgressSnapshot, SkipReason};

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::archive::{CapturedRecord, RecordKind, open_archive};
use crate::config::ConvertConfig;
use crate::content_rewriting::{ContentContext, ContentKind, RewrittenContent, rewrite_content};
use crate::package::{PackageItem, PackageWriter, static_items};
use crate::url_rewriting::{FuzzyRules, KnownUrls, RewriteContext, item_path, normalize};
use crate::utils::{CUSTOM_CSS_URL, NOTHING_PRODUCED_EXIT_CODE};
use progress::Tee;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionStatus {
    Completed,
    /// The archives held no response, resource or revisit record.
    NothingProduced,
}

impl ConversionStatus {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::NothingProduced => NOTHING_PRODUCED_EXIT_CODE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub status: ConversionStatus,
    /// Items written from archive records (static items not included).
    pub written: u64,
    /// Eligible records seen.
    pub total: u64,
    pub main_path: Option<String>,
}

/// A record accepted for rewriting, with its claimed package path.
struct Job {
    record: CapturedRecord,
    path: String,
}

/// Alias resolved once every record has been written.
struct PendingAlias {
    url: String,
    path: String,
    target: String,
}

/// Read-only inputs shared by every rewrite of a run.
#[derive(Clone, Copy)]
struct RewriteInputs<'a> {
    known_urls: &'a KnownUrls,
    custom_css_path: Option<&'a str>,
}

enum Plan {
    Rewrite(Job),
    Alias(PendingAlias),
    Skip(SkipReason),
}

#[derive(Default)]
struct RunState {
    /// Paths reserved by an accepted record; first record wins.
    claimed: HashSet<String>,
    /// Paths actually written.
    produced: HashSet<String>,
    aliases: HashMap<String, String>,
    pending_aliases: Vec<PendingAlias>,
    first_front_page: Option<String>,
    written: u64,
    total: u64,
}

/// Converts the archives named in a [`ConvertConfig`] into a package.
pub struct Converter {
    config: ConvertConfig,
    fuzzy_rules: &'static FuzzyRules,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            fuzzy_rules: FuzzyRules::builtin(),
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Run the conversion, persisting progress only to the configured file.
    pub fn run<W: PackageWriter>(&self, writer: &mut W) -> ConvertResult<ConversionSummary> {
        self.run_with_progress(writer, &NoOpProgress)
    }

    /// Run the conversion, reporting events to `progress` as well.
    ///
    /// # Errors
    ///
    /// Fails when an archive cannot be read, the package cannot be written,
    /// the custom stylesheet is unreadable, or the configured main page was
    /// not produced.
    pub fn run_with_progress<W: PackageWriter>(
        &self,
        writer: &mut W,
        progress: &dyn ProgressReporter,
    ) -> ConvertResult<ConversionSummary> {
        let progress_file = self.config.progress_file().map(JsonProgressFile::new);
        let tee;
        let progress: &dyn ProgressReporter = match &progress_file {
            Some(file) => {
                tee = Tee(progress, file);
                &tee
            }
            None => progress,
        };

        let custom_css = self.read_custom_css()?;
        for item in static_items(self.fuzzy_rules, self.config.static_dir())? {
            writer.add_item(item)?;
        }
        let custom_css_path = match custom_css {
            Some(content) => {
                let path = item_path(CUSTOM_CSS_URL, self.fuzzy_rules);
                writer.add_item(PackageItem::new(path.clone(), "text/css", content))?;
                Some(path)
            }
            None => None,
        };

        let known_urls = self.gather_known_urls()?;
        let inputs = RewriteInputs {
            known_urls: &known_urls,
            custom_css_path: custom_css_path.as_deref(),
        };

        let mut state = RunState::default();
        let batch_size = self.config.batch_size();
        for input in self.config.inputs() {
            log::info!("Reading archive {}", input.display());
            progress.report_archive_opened(input);

            let mut batch = Vec::with_capacity(batch_size);
            for record in open_archive(input)? {
                let record = record?;
                if !record.kind.is_eligible() {
                    continue;
                }
                state.total += 1;
                let url = record.url.clone();
                match self.plan(record, &mut state, writer) {
                    Plan::Rewrite(job) => batch.push(job),
                    Plan::Alias(alias) => state.pending_aliases.push(alias),
                    Plan::Skip(reason) => skip(progress, &url, reason),
                }
                if batch.len() >= batch_size {
                    self.flush(&mut batch, &mut state, writer, progress, inputs)?;
                }
            }
            self.flush(&mut batch, &mut state, writer, progress, inputs)?;
        }

        self.add_aliases(&mut state, writer, progress)?;

        if state.total == 0 {
            log::warn!("No response, resource or revisit record found");
            writer.finish(None)?;
            return Ok(ConversionSummary {
                status: ConversionStatus::NothingProduced,
                written: 0,
                total: 0,
                main_path: None,
            });
        }

        let main_path = self.main_path(&state)?;
        writer.finish(main_path.as_deref())?;
        log::info!(
            "Wrote {} items from {} records, main page {}",
            state.written,
            state.total,
            main_path.as_deref().unwrap_or("<none>")
        );
        progress.report_completed(state.written, state.total);

        Ok(ConversionSummary {
            status: ConversionStatus::Completed,
            written: state.written,
            total: state.total,
            main_path,
        })
    }

    /// Package paths of every eligible record, read without payloads.
    fn gather_known_urls(&self) -> ConvertResult<KnownUrls> {
        let mut known = KnownUrls::new();
        for input in self.config.inputs() {
            for record in open_archive(input)?.headers_only() {
                let record = record?;
                if record.kind.is_eligible() && !record.url.trim().is_empty() {
                    known.insert_url(&record.url, self.fuzzy_rules);
                }
            }
        }
        log::debug!("{} captured URLs known before rewriting", known.len());
        Ok(known)
    }

    fn read_custom_css(&self) -> ConvertResult<Option<Vec<u8>>> {
        let Some(path) = self.config.custom_css() else {
            return Ok(None);
        };
        std::fs::read(path)
            .map(Some)
            .map_err(|source| ConvertError::CustomCss {
                path: path.to_path_buf(),
                source,
            })
    }

    fn plan<W: PackageWriter>(&self, record: CapturedRecord, state: &mut RunState, writer: &W) -> Plan {
        if record.url.trim().is_empty() {
            return Plan::Skip(SkipReason::EmptyUrl);
        }
        let normalized = normalize(&record.url);
        if !self.config.scope().contains(&normalized) {
            return Plan::Skip(SkipReason::OutOfScope);
        }
        let path = self.fuzzy_rules.reduce(&normalized).into_owned();

        if record.kind == RecordKind::Revisit {
            return match record.refers_to.as_deref().map(|url| item_path(url, self.fuzzy_rules)) {
                Some(target) if target != path => Plan::Alias(PendingAlias {
                    url: record.url,
                    path,
                    target,
                }),
                _ => Plan::Skip(SkipReason::MissingTarget),
            };
        }

        if record.kind == RecordKind::Response && record.is_redirect() {
            if let Some(target) = self.redirect_target(&record) {
                return if target == path {
                    Plan::Skip(SkipReason::SelfRedirect)
                } else {
                    Plan::Alias(PendingAlias {
                        url: record.url,
                        path,
                        target,
                    })
                };
            }
        }

        if state.claimed.contains(&path) || writer.contains(&path) {
            return Plan::Skip(SkipReason::Duplicate);
        }
        state.claimed.insert(path.clone());
        Plan::Rewrite(Job { record, path })
    }

    /// Package path of a redirect's `Location`, resolved against the record URL.
    fn redirect_target(&self, record: &CapturedRecord) -> Option<String> {
        let location = record.location.as_deref()?.trim();
        if location.is_empty() {
            return None;
        }
        let base = url::Url::parse(&record.url).ok()?;
        let target = base.join(location).ok()?;
        Some(item_path(target.as_str(), self.fuzzy_rules))
    }

    fn rewrite(&self, job: &Job, inputs: RewriteInputs<'_>) -> RewrittenContent {
        let ctx = ContentContext {
            rewrite: RewriteContext::new(&job.path)
                .with_scope(self.config.scope())
                .with_fuzzy_rules(self.fuzzy_rules)
                .with_known_urls(inputs.known_urls),
            orig_url: &job.record.url,
            head_template: self.config.head_template(),
            custom_css_path: inputs.custom_css_path,
        };
        let kind = ContentKind::from_mime(&job.record.mime_type);
        rewrite_content(kind, &job.record.content, &ctx)
    }

    fn flush<W: PackageWriter>(
        &self,
        batch: &mut Vec<Job>,
        state: &mut RunState,
        writer: &mut W,
        progress: &dyn ProgressReporter,
        inputs: RewriteInputs<'_>,
    ) -> ConvertResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rewritten: Vec<(Job, RewrittenContent)> = std::mem::take(batch)
            .into_par_iter()
            .map(|job| {
                let content = self.rewrite(&job, inputs);
                (job, content)
            })
            .collect();

        for (job, rewritten) in rewritten {
            if rewritten.content.is_empty() {
                skip(progress, &job.record.url, SkipReason::EmptyContent);
                continue;
            }
            let mime_type = if job.record.mime_type.is_empty() {
                "application/octet-stream"
            } else {
                job.record.mime_type.as_str()
            };
            let item = PackageItem::new(job.path.clone(), mime_type, rewritten.content)
                .with_title(rewritten.title);

            let status_ok = matches!(job.record.http_status, None | Some(200));
            if item.is_front && status_ok && state.first_front_page.is_none() {
                state.first_front_page = Some(job.path.clone());
            }

            writer.add_item(item)?;
            state.produced.insert(job.path);
            state.written += 1;
            progress.report_item_written(state.written, state.total);
        }
        Ok(())
    }

    fn add_aliases<W: PackageWriter>(
        &self,
        state: &mut RunState,
        writer: &mut W,
        progress: &dyn ProgressReporter,
    ) -> ConvertResult<()> {
        for alias in std::mem::take(&mut state.pending_aliases) {
            if state.claimed.contains(&alias.path) || writer.contains(&alias.path) {
                skip(progress, &alias.url, SkipReason::Duplicate);
                continue;
            }
            if !state.produced.contains(&alias.target) {
                skip(progress, &alias.url, SkipReason::MissingTarget);
                continue;
            }
            writer.add_alias(&alias.path, &alias.target)?;
            state.claimed.insert(alias.path.clone());
            state.aliases.insert(alias.path, alias.target);
        }
        Ok(())
    }

    fn main_path(&self, state: &RunState) -> ConvertResult<Option<String>> {
        let Some(main_url) = self.config.main_url() else {
            return Ok(state.first_front_page.clone());
        };
        let path = item_path(main_url, self.fuzzy_rules);
        if state.produced.contains(&path) {
            return Ok(Some(path));
        }
        match state.aliases.get(&path) {
            Some(target) => Ok(Some(target.clone())),
            None => Err(ConvertError::MainPageNotFound(main_url.to_string())),
        }
    }
}

fn skip(progress: &dyn ProgressReporter, url: &str, reason: SkipReason) {
    log::debug!("Skipping {url}: {reason}");
    progress.report_skipped(url, reason);
}
