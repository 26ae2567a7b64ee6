use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Google Maps crawler actor the original campaigns run against.
const PLACES_CRAWLER_ACTOR: &str = "compass~crawler-google-places";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// External scraping collaborator: submit a job, poll it, download its
/// dataset. The orchestrator only ever talks to this seam, so tests can
/// swap the real Apify client for a scripted stub.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    fn has_credential(&self) -> bool;

    async fn submit_run(&self, query: &str, max_results: u32) -> Result<SubmittedRun>;

    async fn run_status(&self, run_id: &str) -> Result<RunStatus>;

    async fn fetch_items(&self, dataset_id: &str) -> Result<Vec<RawPlace>>;
}

#[derive(Debug, Clone)]
pub struct SubmittedRun {
    pub run_id: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl RunStatus {
    pub fn parse(raw: &str) -> RunStatus {
        match raw {
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "ABORTED" | "ABORTING" => RunStatus::Aborted,
            "TIMED-OUT" | "TIMING-OUT" => RunStatus::TimedOut,
            _ => RunStatus::Running,
        }
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::Aborted => "ABORTED",
            RunStatus::TimedOut => "TIMED-OUT",
        };
        write!(f, "{}", raw)
    }
}

/// One raw place record out of the crawler dataset. Every field is optional
/// because the actor omits whatever it could not scrape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub reviews_count: Option<u32>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlacesCrawlerInput {
    search_strings_array: Vec<String>,
    location_query: String,
    max_crawler_concurrency: u32,
    max_reviews: u32,
    max_images: u32,
    scrape_reviewer_name: bool,
    scrape_reviewer_id: bool,
    scrape_reviewer_url: bool,
    scrape_review_text: bool,
    lang: String,
    max_web_pages: u32,
    max_scrolls: u32,
    zoom: u32,
    limit: u32,
}

#[derive(Serialize)]
struct TokenQuery<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: String,
}

pub struct ApifyClient {
    client: Client,
    token: String,
    url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap();

        ApifyClient {
            client,
            token,
            url: "https://api.apify.com/v2".to_string(),
        }
    }
}

#[async_trait]
impl ScrapeProvider for ApifyClient {
    fn has_credential(&self) -> bool {
        !self.token.trim().is_empty()
    }

    async fn submit_run(&self, query: &str, max_results: u32) -> Result<SubmittedRun> {
        let input = PlacesCrawlerInput {
            search_strings_array: vec![query.to_string()],
            location_query: "".to_string(),
            max_crawler_concurrency: 2,
            max_reviews: 0,
            max_images: 0,
            scrape_reviewer_name: false,
            scrape_reviewer_id: false,
            scrape_reviewer_url: false,
            scrape_review_text: false,
            lang: "es".to_string(),
            max_web_pages: 1,
            max_scrolls: 10,
            zoom: 12,
            limit: max_results,
        };

        let url = format!("{}/acts/{}/runs", self.url, PLACES_CRAWLER_ACTOR);
        let res = self
            .client
            .post(url)
            .query(&TokenQuery { token: &self.token })
            .json(&input)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Run submission got {}: {}", status, body));
        }

        let body: ApiResponse<RunData> = res.json().await?;
        Ok(SubmittedRun {
            run_id: body.data.id,
            dataset_id: body.data.default_dataset_id,
        })
    }

    async fn run_status(&self, run_id: &str) -> Result<RunStatus> {
        let url = format!(
            "{}/acts/{}/runs/{}",
            self.url, PLACES_CRAWLER_ACTOR, run_id
        );
        let res = self
            .client
            .get(url)
            .query(&TokenQuery { token: &self.token })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Run status fetch got {}: {}", status, body));
        }

        let body: ApiResponse<RunData> = res.json().await?;
        Ok(RunStatus::parse(&body.data.status))
    }

    async fn fetch_items(&self, dataset_id: &str) -> Result<Vec<RawPlace>> {
        let url = format!("{}/datasets/{}/items", self.url, dataset_id);
        let res = self
            .client
            .get(url)
            .query(&TokenQuery { token: &self.token })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Dataset fetch got {}: {}", status, body));
        }

        let items: Vec<RawPlace> = res.json().await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_maps_provider_strings() {
        assert_eq!(RunStatus::parse("SUCCEEDED"), RunStatus::Succeeded);
        assert_eq!(RunStatus::parse("FAILED"), RunStatus::Failed);
        assert_eq!(RunStatus::parse("ABORTED"), RunStatus::Aborted);
        assert_eq!(RunStatus::parse("ABORTING"), RunStatus::Aborted);
        assert_eq!(RunStatus::parse("TIMED-OUT"), RunStatus::TimedOut);
        assert_eq!(RunStatus::parse("READY"), RunStatus::Running);
        assert_eq!(RunStatus::parse("RUNNING"), RunStatus::Running);
    }

    #[test]
    fn only_failure_statuses_are_terminal_failures() {
        assert!(RunStatus::Failed.is_terminal_failure());
        assert!(RunStatus::Aborted.is_terminal_failure());
        assert!(RunStatus::TimedOut.is_terminal_failure());
        assert!(!RunStatus::Succeeded.is_terminal_failure());
        assert!(!RunStatus::Running.is_terminal_failure());
    }

    #[test]
    fn raw_place_tolerates_missing_fields() {
        let item: RawPlace = serde_json::from_str(r#"{"title": "Reformas López"}"#).unwrap();

        assert_eq!(item.title.as_deref(), Some("Reformas López"));
        assert_eq!(item.reviews_count, None);
        assert_eq!(item.website, None);
        assert!(item.emails.is_empty());
    }

    #[test]
    fn missing_token_means_no_credential() {
        assert!(!ApifyClient::new("".to_string()).has_credential());
        assert!(!ApifyClient::new("   ".to_string()).has_credential());
        assert!(ApifyClient::new("apify_api_xyz".to_string()).has_credential());
    }
}
