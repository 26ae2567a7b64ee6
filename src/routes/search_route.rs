use std::sync::Mutex;

use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::lead::{LeadSource, SearchSession};
use crate::services::{
    AcquisitionOutcome, CancelToken, DeduplicationGate, FilteredLeads, LeadScraper, SearchConfig,
};

/// Token of the acquisition currently in flight, if any. One run at a time;
/// a second start is rejected instead of cross-cancelling the first.
#[derive(Default)]
pub struct ActiveRun {
    pub token: Mutex<Option<CancelToken>>,
}

#[derive(Deserialize)]
pub struct StartSearchBody {
    query: String,
    max_results: u32,
    user_id: Option<String>,
    #[serde(default)]
    only_niche_matches: bool,
}

#[post("/start")]
async fn start_search(
    body: web::Json<StartSearchBody>,
    lead_scraper: web::Data<LeadScraper>,
    gate: web::Data<DeduplicationGate>,
    active_run: web::Data<ActiveRun>,
) -> HttpResponse {
    let cancel = CancelToken::new();
    {
        let mut guard = active_run.token.lock().unwrap();
        if guard.is_some() {
            return HttpResponse::Conflict().body("A search is already running");
        }
        *guard = Some(cancel.clone());
    }

    let body = body.into_inner();
    let config = SearchConfig {
        query: body.query.clone(),
        max_results: body.max_results,
        only_niche_matches: body.only_niche_matches,
    };

    // The progress stream feeds the process log; the original fed a
    // terminal widget with the same lines.
    let (progress_sender, mut progress_receiver) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = progress_receiver.recv().await {
            log::info!("{}", line);
        }
    });

    let outcome = lead_scraper.acquire(config, progress_sender, cancel).await;
    *active_run.token.lock().unwrap() = None;

    match outcome {
        AcquisitionOutcome::Cancelled => HttpResponse::Ok().body("Search cancelled"),
        AcquisitionOutcome::Failed(message) => HttpResponse::InternalServerError().body(message),
        AcquisitionOutcome::Completed(leads) => {
            let user_id = body.user_id.as_deref();

            let index = gate.load_history(user_id).await;
            let FilteredLeads { unique, rejected } = gate.filter_unique(leads, &index);

            let session = SearchSession {
                id: Uuid::new_v4().to_string(),
                date: Utc::now(),
                query: body.query,
                source: unique
                    .first()
                    .map(|lead| lead.source)
                    .unwrap_or(LeadSource::Gmaps),
                results_count: unique.len(),
                leads: unique,
            };
            let saved = gate.persist(&session.leads, user_id, &session.id).await;

            HttpResponse::Ok().json(serde_json::json!({
                "session": session,
                "rejectedCount": rejected.len(),
                "saved": saved,
            }))
        }
    }
}

#[post("/stop")]
async fn stop_search(active_run: web::Data<ActiveRun>) -> HttpResponse {
    match &*active_run.token.lock().unwrap() {
        Some(token) => {
            token.cancel();
            HttpResponse::Ok().body("Stop requested")
        }
        None => HttpResponse::Ok().body("No search is running"),
    }
}
