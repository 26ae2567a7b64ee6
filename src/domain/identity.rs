use std::collections::HashSet;

use crate::domain::lead::Lead;

/// Company-name values that identify nothing. Leads carrying one of these
/// can coexist in any multiplicity and are never matched by name.
pub const GENERIC_NAME_MARKERS: [&str; 2] = ["sin nombre", "empresa desconocida"];

/// Canonical comparison key for a website. Protocol, `www.` prefix, one
/// trailing slash and letter case are not identity.
pub fn normalize_website(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let stripped = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let stripped = stripped.strip_prefix("www.").unwrap_or(stripped);
    let stripped = stripped.strip_suffix('/').unwrap_or(stripped);
    stripped.trim().to_string()
}

/// Canonical comparison key for a company name: lowercase, trimmed, internal
/// whitespace runs collapsed to a single space.
pub fn normalize_company_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct GenericNames {
    markers: Vec<String>,
}

impl Default for GenericNames {
    fn default() -> Self {
        GenericNames::new(GENERIC_NAME_MARKERS.iter().map(|m| m.to_string()).collect())
    }
}

impl GenericNames {
    pub fn new(markers: Vec<String>) -> Self {
        GenericNames {
            markers: markers
                .into_iter()
                .map(|m| normalize_company_name(&m))
                .collect(),
        }
    }

    pub fn is_generic(&self, raw_name: &str) -> bool {
        let normalized = normalize_company_name(raw_name);
        self.markers.iter().any(|m| normalized.contains(m.as_str()))
    }
}

#[derive(Debug, PartialEq)]
pub enum DuplicateReason {
    Website(String),
    CompanyName(String),
}

/// Identity keys of a user's historical corpus. Rebuilt wholesale at the
/// start of every acquisition run, never partially updated.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    pub websites: HashSet<String>,
    pub names: HashSet<String>,
}

impl IdentityIndex {
    pub fn add_lead(&mut self, lead: &Lead, generic_names: &GenericNames) {
        if let Some(website) = &lead.website {
            let key = normalize_website(website);
            if !key.is_empty() {
                self.websites.insert(key);
            }
        }

        if !lead.company_name.is_empty() && !generic_names.is_generic(&lead.company_name) {
            self.names.insert(normalize_company_name(&lead.company_name));
        }
    }

    /// Website collision wins over name collision; the reason only feeds
    /// logging, the duplicate verdict itself is boolean.
    pub fn duplicate_reason(
        &self,
        candidate: &Lead,
        generic_names: &GenericNames,
    ) -> Option<DuplicateReason> {
        if let Some(website) = &candidate.website {
            let key = normalize_website(website);
            if !key.is_empty() && self.websites.contains(&key) {
                return Some(DuplicateReason::Website(key));
            }
        }

        if !candidate.company_name.is_empty() && !generic_names.is_generic(&candidate.company_name)
        {
            let key = normalize_company_name(&candidate.company_name);
            if self.names.contains(&key) {
                return Some(DuplicateReason::CompanyName(key));
            }
        }

        None
    }

    pub fn len(&self) -> usize {
        self.websites.len() + self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.websites.is_empty() && self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::lead::{AiAnalysis, DecisionMaker, Lead, LeadSource, LeadStatus};

    use super::*;

    fn lead(company_name: &str, website: Option<&str>) -> Lead {
        Lead {
            id: "test-lead".to_string(),
            source: LeadSource::Gmaps,
            company_name: company_name.to_string(),
            website: website.map(|w| w.to_string()),
            social_url: None,
            location: None,
            decision_maker: DecisionMaker {
                name: "".to_string(),
                role: "".to_string(),
                email: None,
                phone: None,
            },
            ai_analysis: AiAnalysis::default(),
            status: LeadStatus::Scraped,
        }
    }

    #[test]
    fn normalize_website_strips_protocol_www_and_trailing_slash() {
        assert_eq!(normalize_website("HTTPS://WWW.Foo.com/"), "foo.com");
        assert_eq!(normalize_website("http://foo.com"), "foo.com");
        assert_eq!(normalize_website("www.foo.com/"), "foo.com");
        assert_eq!(normalize_website("  foo.com  "), "foo.com");
        assert_eq!(normalize_website(""), "");
    }

    #[test]
    fn normalize_website_is_idempotent() {
        let inputs = ["HTTPS://WWW.Acme.es/", "acme.es", "http://acme.es/obras/"];
        for input in inputs {
            let once = normalize_website(input);
            assert_eq!(normalize_website(&once), once);
        }
    }

    #[test]
    fn normalize_company_name_collapses_whitespace() {
        assert_eq!(
            normalize_company_name("  Reformas   García  S.L. "),
            "reformas garcía s.l."
        );
        let once = normalize_company_name("Reformas\t\tGarcía");
        assert_eq!(normalize_company_name(&once), once);
    }

    #[test]
    fn generic_names_match_literals_and_containing_strings() {
        let generic_names = GenericNames::default();

        assert!(generic_names.is_generic("Sin Nombre"));
        assert!(generic_names.is_generic("Empresa Desconocida"));
        assert!(generic_names.is_generic("empresa desconocida (madrid)"));
        assert!(generic_names.is_generic("SIN   NOMBRE"));
        assert!(!generic_names.is_generic("Reformas García"));
    }

    #[test]
    fn generic_names_accept_a_custom_marker_set() {
        let generic_names = GenericNames::new(vec!["Unknown Business".to_string()]);

        assert!(generic_names.is_generic("unknown   business 42"));
        assert!(!generic_names.is_generic("Sin Nombre"));
    }

    #[test]
    fn website_collision_is_protocol_insensitive() {
        let generic_names = GenericNames::default();
        let mut index = IdentityIndex::default();
        index.add_lead(&lead("Acme", Some("acme.es")), &generic_names);

        let candidate = lead("Acme", Some("http://www.acme.es/"));
        assert_eq!(
            index.duplicate_reason(&candidate, &generic_names),
            Some(DuplicateReason::Website("acme.es".to_string()))
        );
    }

    #[test]
    fn non_generic_name_collision_is_detected_without_website() {
        let generic_names = GenericNames::default();
        let mut index = IdentityIndex::default();
        index.add_lead(&lead("Reformas García", Some("garcia.es")), &generic_names);

        let candidate = lead("reformas  garcía", None);
        assert_eq!(
            index.duplicate_reason(&candidate, &generic_names),
            Some(DuplicateReason::CompanyName("reformas garcía".to_string()))
        );
    }

    #[test]
    fn generic_named_leads_are_never_indexed_nor_rejected() {
        let generic_names = GenericNames::default();
        let mut index = IdentityIndex::default();
        for _ in 0..5 {
            index.add_lead(&lead("Empresa Desconocida", None), &generic_names);
        }

        assert!(index.names.is_empty());

        let candidate = lead("Empresa Desconocida", None);
        assert_eq!(index.duplicate_reason(&candidate, &generic_names), None);
    }

    #[test]
    fn empty_website_never_matches() {
        let generic_names = GenericNames::default();
        let mut index = IdentityIndex::default();
        index.add_lead(&lead("Sin Nombre", Some("")), &generic_names);

        assert!(index.websites.is_empty());

        let candidate = lead("Empresa Desconocida", Some(""));
        assert_eq!(index.duplicate_reason(&candidate, &generic_names), None);
    }

    #[test]
    fn index_built_from_batch_holds_exactly_the_non_generic_keys() {
        let generic_names = GenericNames::default();
        let batch = vec![
            lead("Acme", Some("https://www.acme.es/")),
            lead("Sin Nombre", Some("obras-lopez.com")),
            lead("Reformas García", None),
        ];

        let mut index = IdentityIndex::default();
        for l in &batch {
            index.add_lead(l, &generic_names);
        }

        let websites: HashSet<String> = ["acme.es", "obras-lopez.com"]
            .iter()
            .map(|w| w.to_string())
            .collect();
        let names: HashSet<String> = ["acme", "reformas garcía"]
            .iter()
            .map(|n| n.to_string())
            .collect();

        assert_eq!(index.websites, websites);
        assert_eq!(index.names, names);
    }
}
