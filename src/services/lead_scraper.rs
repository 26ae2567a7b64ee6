use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::domain::lead::{AiAnalysis, DecisionMaker, Lead, LeadSource, LeadStatus};
use crate::services::{EmailScraper, RawPlace, RunStatus, ScrapeProvider, SubmittedRun};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const NUM_FETCH_RETRIES: u8 = 3; // Should be > 0

/// Vocabulary of the construction/renovation niches the campaigns target.
const TARGET_NICHE_KEYWORDS: [&str; 5] = [
    "reformas",
    "obras",
    "instalad",
    "construcc",
    "rehabilitacion",
];

/// Every search is pinned to this market, whatever the caller typed.
const FORCED_REGION: &str = "España";

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub query: String,
    pub max_results: u32,
    /// When on, raw items whose title/category match no target keyword are
    /// dropped. Off by default: a Maps search usually only returns relevant
    /// places, so the match is computed and logged but not enforced.
    #[serde(default)]
    pub only_niche_matches: bool,
}

/// Terminal signal of one acquisition run. Exactly one of these comes out
/// of every `acquire` call.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    Completed(Vec<Lead>),
    Failed(String),
    Cancelled,
}

/// Cooperative per-run cancellation. Cloned into whoever needs to pull the
/// plug; checked at poll-loop and per-item boundaries.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub struct LeadScraper {
    provider: Arc<dyn ScrapeProvider>,
    email_scraper: EmailScraper,
    poll_interval: Duration,
}

impl LeadScraper {
    pub fn new(provider: Arc<dyn ScrapeProvider>) -> Self {
        LeadScraper {
            provider,
            email_scraper: EmailScraper::new(),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Runs one acquisition end to end: submit the scrape job, poll it to a
    /// terminal state, download the dataset, filter and enrich. Progress
    /// lines go out on `progress`; they are informational only.
    pub async fn acquire(
        &self,
        config: SearchConfig,
        progress: UnboundedSender<String>,
        cancel: CancelToken,
    ) -> AcquisitionOutcome {
        if !self.provider.has_credential() {
            let message = "Missing scrape provider api key, aborting before submission".to_string();
            log::error!("{}", message);
            emit(&progress, message.clone());
            return AcquisitionOutcome::Failed(message);
        }

        let query = format!("{} en {}", config.query, FORCED_REGION);
        emit(
            &progress,
            format!(
                "Starting scrape for \"{}\" (max {} results)",
                query, config.max_results
            ),
        );

        let run = match self.provider.submit_run(&query, config.max_results).await {
            Ok(run) => run,
            Err(e) => {
                log::error!("Scrape job submission failed: {:?}", e);
                let message = format!("Scrape job submission failed: {}", e);
                emit(&progress, message.clone());
                return AcquisitionOutcome::Failed(message);
            }
        };
        emit(
            &progress,
            format!("Scrape job {} submitted, waiting for results", run.run_id),
        );

        match self.poll_until_terminal(&run, &progress, &cancel).await {
            PollVerdict::Succeeded => {}
            PollVerdict::Cancelled => {
                log::info!("Acquisition cancelled while polling job {}", run.run_id);
                return AcquisitionOutcome::Cancelled;
            }
            PollVerdict::Failed(message) => {
                log::error!("{}", message);
                emit(&progress, message.clone());
                return AcquisitionOutcome::Failed(message);
            }
        }

        emit(
            &progress,
            format!("Downloading results from dataset {}", run.dataset_id),
        );
        let items = match self.fetch_items_with_retries(&run.dataset_id).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("Dataset download failed: {:?}", e);
                let message = format!("Dataset download failed: {}", e);
                emit(&progress, message.clone());
                return AcquisitionOutcome::Failed(message);
            }
        };
        emit(
            &progress,
            format!("Got {} raw results, filtering", items.len()),
        );

        let mut leads: Vec<Lead> = vec![];
        for item in items {
            if cancel.is_cancelled() {
                log::info!("Acquisition cancelled while processing results");
                return AcquisitionOutcome::Cancelled;
            }

            let reviews_count = item.reviews_count.unwrap_or(0);
            // Zero reviews means a ghost entry nobody has ever dealt with.
            if reviews_count == 0 {
                continue;
            }

            let matches_niche = matches_target_niche(&item);
            if config.only_niche_matches && !matches_niche {
                log::info!(
                    "Skipping off-niche place: {}",
                    item.title.as_deref().unwrap_or("(untitled)")
                );
                continue;
            }

            let lead = self.build_lead(item, reviews_count, &progress).await;
            leads.push(lead);
        }

        emit(
            &progress,
            format!("Processing complete, {} qualified leads found", leads.len()),
        );
        AcquisitionOutcome::Completed(leads)
    }

    async fn poll_until_terminal(
        &self,
        run: &SubmittedRun,
        progress: &UnboundedSender<String>,
        cancel: &CancelToken,
    ) -> PollVerdict {
        loop {
            if cancel.is_cancelled() {
                return PollVerdict::Cancelled;
            }
            tokio::time::sleep(self.poll_interval).await;

            let status = match self.run_status_with_retries(&run.run_id).await {
                Ok(status) => status,
                Err(e) => {
                    return PollVerdict::Failed(format!(
                        "Giving up on job status after {} attempts: {}",
                        NUM_FETCH_RETRIES, e
                    ))
                }
            };
            emit(progress, format!("Job status: {}", status));

            match status {
                RunStatus::Succeeded => return PollVerdict::Succeeded,
                status if status.is_terminal_failure() => {
                    return PollVerdict::Failed(format!(
                        "Scrape job ended with status {}",
                        status
                    ))
                }
                _ => {}
            }
        }
    }

    async fn run_status_with_retries(&self, run_id: &str) -> Result<RunStatus> {
        let mut retry_count = 0;
        loop {
            match self.provider.run_status(run_id).await {
                Ok(status) => return Ok(status),
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= NUM_FETCH_RETRIES {
                        return Err(e);
                    }
                    log::error!(
                        "Job status fetch failed (attempt {}): {:?}",
                        retry_count,
                        e
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_items_with_retries(&self, dataset_id: &str) -> Result<Vec<RawPlace>> {
        let mut retry_count = 0;
        loop {
            match self.provider.fetch_items(dataset_id).await {
                Ok(items) => return Ok(items),
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= NUM_FETCH_RETRIES {
                        return Err(e);
                    }
                    log::error!("Dataset fetch failed (attempt {}): {:?}", retry_count, e);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn build_lead(
        &self,
        item: RawPlace,
        reviews_count: u32,
        progress: &UnboundedSender<String>,
    ) -> Lead {
        let company_name = item
            .title
            .clone()
            .unwrap_or_else(|| "Sin Nombre".to_string());

        let mut email: Option<String> = None;
        if let Some(website) = &item.website {
            emit(
                progress,
                format!("Hunting email on {} for {}", website, company_name),
            );
            email = self.email_scraper.resolve_email(website).await;
            match &email {
                Some(found) => emit(progress, format!("Email found: {}", found)),
                None => {}
            }
        }
        // Fall back to whatever the crawler itself scraped off the listing.
        let email = email
            .or_else(|| item.email.clone())
            .or_else(|| item.emails.first().cloned());

        let status = match email.is_some() {
            true => LeadStatus::Enriched,
            false => LeadStatus::Scraped,
        };

        let category = item
            .category_name
            .clone()
            .unwrap_or_else(|| "Reformas".to_string());

        Lead {
            id: item
                .place_id
                .unwrap_or_else(|| format!("lead-{}", Uuid::new_v4())),
            source: LeadSource::Gmaps,
            company_name,
            website: item.website,
            social_url: None,
            location: item.address,
            decision_maker: DecisionMaker {
                name: "".to_string(),
                role: "".to_string(),
                email,
                phone: None,
            },
            ai_analysis: AiAnalysis {
                summary: format!("Empresa de {} con {} reseñas.", category, reviews_count),
                pain_points: vec![],
                generated_icebreaker: "".to_string(),
                full_message: "".to_string(),
            },
            status,
        }
    }
}

enum PollVerdict {
    Succeeded,
    Failed(String),
    Cancelled,
}

pub fn matches_target_niche(item: &RawPlace) -> bool {
    let title = item.title.as_deref().unwrap_or("").to_lowercase();
    let category = item.category_name.as_deref().unwrap_or("").to_lowercase();

    TARGET_NICHE_KEYWORDS
        .iter()
        .any(|keyword| title.contains(keyword) || category.contains(keyword))
}

// Progress sends are best effort; a caller that dropped its receiver does
// not get to abort the run.
fn emit(progress: &UnboundedSender<String>, message: String) {
    _ = progress.send(message);
}
