use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Instagram,
    Gmaps,
    Gmail,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Instagram => "instagram",
            LeadSource::Gmaps => "gmaps",
            LeadSource::Gmail => "gmail",
        }
    }
}

// Scraped = no contact email found, Enriched = email present,
// Ready is set downstream once a lead is approved for outreach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Scraped,
    Enriched,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMaker {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// Filled in by the message-generation side of the house; the pipeline only
// guarantees the structure is present on every lead it emits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub summary: String,
    pub pain_points: Vec<String>,
    pub generated_icebreaker: String,
    pub full_message: String,
}

// Serialized field names stay camelCase so new rows are interchangeable
// with the lead_data batches already sitting in the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub source: LeadSource,
    pub company_name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub social_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub decision_maker: DecisionMaker,
    pub ai_analysis: AiAnalysis,
    pub status: LeadStatus,
}

// One completed acquisition run. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    pub id: String,
    pub date: DateTime<Utc>,
    pub query: String,
    pub source: LeadSource,
    pub results_count: usize,
    pub leads: Vec<Lead>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_serializes_with_camel_case_keys() {
        let lead = Lead {
            id: "lead-1".to_string(),
            source: LeadSource::Gmaps,
            company_name: "Reformas Integrales Madrid".to_string(),
            website: Some("reformas-integrales-madrid.com".to_string()),
            social_url: None,
            location: Some("Madrid, España".to_string()),
            decision_maker: DecisionMaker {
                name: "".to_string(),
                role: "".to_string(),
                email: Some("info@reformas-integrales-madrid.com".to_string()),
                phone: None,
            },
            ai_analysis: AiAnalysis::default(),
            status: LeadStatus::Enriched,
        };

        let json = serde_json::to_value(&lead).unwrap();

        assert_eq!(json["companyName"], "Reformas Integrales Madrid");
        assert_eq!(json["source"], "gmaps");
        assert_eq!(json["status"], "enriched");
        assert_eq!(
            json["decisionMaker"]["email"],
            "info@reformas-integrales-madrid.com"
        );
        assert!(json["aiAnalysis"]["painPoints"].as_array().unwrap().is_empty());
    }

    #[test]
    fn lead_deserializes_from_historical_row_shape() {
        let raw = serde_json::json!({
            "id": "3",
            "source": "gmaps",
            "companyName": "Construcciones Pepe S.L.",
            "website": "construccionespepe.es",
            "location": "Getafe, España",
            "decisionMaker": { "name": "Pepe", "role": "Director" },
            "aiAnalysis": {
                "summary": "Empresa de Reformas con 12 reseñas.",
                "painPoints": [],
                "generatedIcebreaker": "",
                "fullMessage": ""
            },
            "status": "scraped"
        });

        let lead: Lead = serde_json::from_value(raw).unwrap();

        assert_eq!(lead.company_name, "Construcciones Pepe S.L.");
        assert_eq!(lead.status, LeadStatus::Scraped);
        assert_eq!(lead.decision_maker.email, None);
        assert_eq!(lead.social_url, None);
    }
}
