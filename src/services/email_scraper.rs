use std::time::Duration;

use fake_user_agent::get_rua;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Domains that show up in page text without belonging to the company:
/// documentation samples and website-builder boilerplate.
const PLACEHOLDER_EMAIL_DOMAINS: [&str; 2] = ["example.com", "wix.com"];

/// An anchor whose href contains any of these is taken as the contact page.
const CONTACT_PAGE_HINTS: [&str; 4] = ["contact", "contacto", "about", "nosotros"];

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+";

pub struct EmailScraper {
    client: Client,
}

impl Default for EmailScraper {
    fn default() -> Self {
        EmailScraper::new()
    }
}

impl EmailScraper {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(get_rua())
            .build()
            .unwrap();

        EmailScraper { client }
    }

    /// Best-effort contact email for a company website. Checks the homepage
    /// for a mailto anchor or an email-shaped token, then falls back to one
    /// contact/about page linked from it. Network trouble at any step means
    /// "no email", never an error.
    pub async fn resolve_email(&self, website: &str) -> Option<String> {
        if website.trim().is_empty() {
            return None;
        }

        let homepage_url = match website.starts_with("http") {
            true => website.to_string(),
            false => format!("https://{}", website),
        };

        let home_html = self.fetch_page(&homepage_url).await?;

        if let Some(email) = extract_email_from_html(&home_html) {
            return Some(email);
        }

        let contact_href = find_contact_page_link(&home_html)?;
        let contact_url = absolutize(&homepage_url, &contact_href)?;
        log::info!("No email on {}, trying contact page {}", homepage_url, contact_url);

        let contact_html = self.fetch_page(&contact_url).await?;
        extract_email_from_html(&contact_html)
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(res) => match res.status().is_success() {
                true => res.text().await.ok(),
                false => {
                    log::info!("Got {} fetching {}", res.status(), url);
                    None
                }
            },
            Err(e) => {
                log::info!("Failed to fetch {}: {:?}", url, e);
                None
            }
        }
    }
}

/// First mailto anchor wins, scheme and query suffix stripped. Otherwise the
/// first email-shaped token in the visible text that is not placeholder
/// boilerplate.
pub fn extract_email_from_html(html: &str) -> Option<String> {
    let mailto_selector = Selector::parse(r#"a[href^="mailto:"]"#).unwrap();
    let document = Html::parse_document(html);

    if let Some(href) = document
        .select(&mailto_selector)
        .next()
        .and_then(|tag| tag.value().attr("href"))
    {
        let email = href.strip_prefix("mailto:").unwrap_or(href);
        let email = email.split('?').next().unwrap_or(email).trim();
        if !email.is_empty() {
            return Some(email.to_string());
        }
    }

    let text: String = document
        .root_element()
        .text()
        .collect::<Vec<&str>>()
        .join(" ");
    let email_regex = Regex::new(EMAIL_PATTERN).unwrap();

    let result = email_regex
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .find(|email| {
            !PLACEHOLDER_EMAIL_DOMAINS
                .iter()
                .any(|domain| email.contains(domain))
        });
    result
}

/// Href of the first anchor that looks like a contact or about page.
pub fn find_contact_page_link(html: &str) -> Option<String> {
    let a_tag_selector = Selector::parse("a").unwrap();
    let document = Html::parse_document(html);

    document
        .select(&a_tag_selector)
        .filter_map(|tag| tag.value().attr("href"))
        .find(|href| {
            let lowered = href.to_lowercase();
            CONTACT_PAGE_HINTS.iter().any(|hint| lowered.contains(hint))
        })
        .map(|href| href.to_string())
}

fn absolutize(base: &str, href: &str) -> Option<String> {
    match Url::parse(base) {
        Ok(base_url) => base_url.join(href).ok().map(|joined| joined.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailto_anchor_wins_over_text() {
        let html = r#"
            <html><body>
                <p>escríbenos a ventas@acme.es</p>
                <a href="mailto:info@acme.es?subject=Hola">Contacto</a>
            </body></html>
        "#;

        assert_eq!(
            extract_email_from_html(html),
            Some("info@acme.es".to_string())
        );
    }

    #[test]
    fn text_scan_skips_placeholder_domains() {
        let html = r#"
            <html><body>
                <footer>soporte@example.com | plantilla@wix.com | obras@acme.es</footer>
            </body></html>
        "#;

        assert_eq!(
            extract_email_from_html(html),
            Some("obras@acme.es".to_string())
        );
    }

    #[test]
    fn no_email_anywhere_yields_none() {
        let html = "<html><body><p>Reformas y obras en Madrid</p></body></html>";

        assert_eq!(extract_email_from_html(html), None);
    }

    #[test]
    fn finds_first_contact_looking_link() {
        let html = r#"
            <html><body>
                <a href="/servicios">Servicios</a>
                <a href="/contacto">Contacto</a>
                <a href="/about">About</a>
            </body></html>
        "#;

        assert_eq!(
            find_contact_page_link(html),
            Some("/contacto".to_string())
        );
    }

    #[test]
    fn no_contact_link_yields_none() {
        let html = r#"<html><body><a href="/servicios">Servicios</a></body></html>"#;

        assert_eq!(find_contact_page_link(html), None);
    }

    #[test]
    fn contact_href_resolves_relative_to_homepage() {
        assert_eq!(
            absolutize("https://acme.es/", "/contacto").as_deref(),
            Some("https://acme.es/contacto")
        );
        assert_eq!(
            absolutize("https://acme.es/", "https://otro.es/contacto").as_deref(),
            Some("https://otro.es/contacto")
        );
        assert_eq!(absolutize("not a url", "/contacto"), None);
    }

    #[tokio::test]
    async fn unreachable_website_resolves_to_none() {
        let email_scraper = EmailScraper::new();

        // Reserved TLD, guaranteed not to resolve.
        let result = email_scraper
            .resolve_email("acme-no-such-host.invalid")
            .await;

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn empty_website_resolves_to_none() {
        let email_scraper = EmailScraper::new();

        assert_eq!(email_scraper.resolve_email("").await, None);
        assert_eq!(email_scraper.resolve_email("   ").await, None);
    }
}
