//! External capabilities the pipeline consumes as opaque collaborators:
//! web search, page scraping, report synthesis, and email transport.
//!
//! Each capability is a trait so the pipeline can be exercised with mocks —
//! no network, no credentials. The HTTP implementations own their own
//! timeout policy; the core never retries them.

pub mod error;
pub mod mail;
pub mod scrape;
pub mod search;
pub mod synthesis;

pub use error::{Result, RetrievalError};
pub use mail::{DisabledMailer, ReportMailer, SmtpMailer};
pub use scrape::{HttpScraper, ScrapedSite, SiteScraper};
pub use search::{HttpSearchProvider, SearchOutcome, SearchProvider, SearchRequest, UnreachableSource};
pub use synthesis::{HttpSynthesizer, ReportSynthesizer};
