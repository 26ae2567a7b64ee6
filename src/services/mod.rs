pub mod apify_client;
pub mod dedup;
pub mod email_scraper;
pub mod lead_scraper;

pub use apify_client::*;
pub use dedup::*;
pub use email_scraper::*;
pub use lead_scraper::*;
