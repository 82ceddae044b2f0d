//! One scrape, start to finish:
//! fetch -> extract -> dedupe -> confirm -> submit each link in turn.
//!
//! A failed fetch ends the run in `Failed`. Finding nothing is not a
//! failure; the run goes straight to `Done`. A failed submission is
//! recorded and the remaining links are still submitted.

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::error::{FetchError, SubmissionError};
use crate::extractor::LinkExtractor;
use crate::fetcher::PageSource;
use crate::links::LinkSet;
use crate::premiumize::{SubmissionResult, TransferSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeState {
    Idle,
    Fetching,
    Extracting,
    Deduplicated,
    AwaitingConfirmation,
    Submitting,
    Done,
    Failed,
}

impl ScrapeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScrapeState::Done | ScrapeState::Failed)
    }
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapeState::Idle => "idle",
            ScrapeState::Fetching => "fetching",
            ScrapeState::Extracting => "extracting",
            ScrapeState::Deduplicated => "deduplicated",
            ScrapeState::AwaitingConfirmation => "awaiting confirmation",
            ScrapeState::Submitting => "submitting",
            ScrapeState::Done => "done",
            ScrapeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Asks whether the found links should be submitted.
pub trait Confirm: Send + Sync {
    fn confirm(&self, links: &LinkSet) -> bool;
}

/// Answers every confirmation the same way.
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _links: &LinkSet) -> bool {
        self.0
    }
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub link: String,
    pub result: Result<SubmissionResult, SubmissionError>,
}

#[derive(Debug)]
pub struct ScrapeReport {
    pub target_url: String,
    pub strategy: &'static str,
    /// Every state the run passed through, starting at `Idle`.
    pub states: Vec<ScrapeState>,
    pub links: LinkSet,
    pub confirmed: bool,
    pub submissions: Vec<SubmissionOutcome>,
    pub failure: Option<FetchError>,
}

impl ScrapeReport {
    fn new(target_url: &str, strategy: &'static str) -> Self {
        Self {
            target_url: target_url.to_string(),
            strategy,
            states: vec![ScrapeState::Idle],
            links: LinkSet::default(),
            confirmed: false,
            submissions: Vec::new(),
            failure: None,
        }
    }

    fn advance(&mut self, next: ScrapeState) {
        info!("scrape of {}: {} -> {}", self.target_url, self.state(), next);
        self.states.push(next);
    }

    pub fn state(&self) -> ScrapeState {
        self.states.last().copied().unwrap_or(ScrapeState::Idle)
    }

    pub fn submitted(&self) -> usize {
        self.submissions.iter().filter(|s| s.result.is_ok()).count()
    }

    pub fn rejected(&self) -> usize {
        self.submissions.iter().filter(|s| s.result.is_err()).count()
    }

    /// Turns a failed run into its fetch error.
    pub fn into_result(mut self) -> Result<Self, FetchError> {
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

pub struct ScrapePipeline<'a> {
    source: &'a dyn PageSource,
    extractor: &'a dyn LinkExtractor,
    sink: Option<&'a dyn TransferSink>,
}

impl<'a> ScrapePipeline<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        extractor: &'a dyn LinkExtractor,
        sink: &'a dyn TransferSink,
    ) -> Self {
        Self {
            source,
            extractor,
            sink: Some(sink),
        }
    }

    /// A pipeline that stops after deduplication and never submits.
    pub fn dry_run(source: &'a dyn PageSource, extractor: &'a dyn LinkExtractor) -> Self {
        Self {
            source,
            extractor,
            sink: None,
        }
    }

    pub async fn run(&self, target_url: &str, confirm: &dyn Confirm) -> ScrapeReport {
        let mut report = ScrapeReport::new(target_url, self.extractor.name());

        report.advance(ScrapeState::Fetching);
        let html = match self.source.fetch(target_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetching {} failed: {}", target_url, e);
                report.failure = Some(e);
                report.advance(ScrapeState::Failed);
                return report;
            }
        };

        report.advance(ScrapeState::Extracting);
        let candidates = self.extractor.extract(target_url, &html, self.source).await;

        report.links = LinkSet::dedupe(candidates);
        report.advance(ScrapeState::Deduplicated);
        info!("{} distinct links for {}", report.links.len(), target_url);

        let Some(sink) = self.sink else {
            report.advance(ScrapeState::Done);
            return report;
        };
        if report.links.is_empty() {
            report.advance(ScrapeState::Done);
            return report;
        }

        report.advance(ScrapeState::AwaitingConfirmation);
        report.confirmed = confirm.confirm(&report.links);
        if !report.confirmed {
            info!("Submission declined; discarding {} links", report.links.len());
            report.advance(ScrapeState::Done);
            return report;
        }

        report.advance(ScrapeState::Submitting);
        for link in report.links.iter() {
            let result = sink.submit(link).await;
            if let Err(e) = &result {
                warn!("Submitting {} failed, continuing: {}", link, e);
            }
            report.submissions.push(SubmissionOutcome {
                link: link.to_string(),
                result,
            });
        }

        report.advance(ScrapeState::Done);
        report
    }
}
