//! Rating extraction cascade and second-qualifying-product scanner for
//! shopping result pages.

pub mod collector;
pub mod rating;
pub mod resolver;
pub mod scanner;
pub mod scripted;
pub mod selectors;
pub mod session;
pub mod structured;
pub mod verdict;

pub use collector::{collect_product_links, CandidateList, CollectorLimits, ProductLink};
pub use rating::{parse_rating_text, Rating};
pub use resolver::{PageRatingResolver, RatingStrategy, ResolvedRating};
pub use scanner::{
    NotFoundReason, QualificationResult, QualificationScanner, ScanOptions, Visit,
};
pub use scripted::{RecordedElement, RecordedPage, Recording, ScriptedSession};
pub use session::{
    any_present, click_first_present, BrowserSession, Condition, ElementHandle, SessionError,
    SessionResult, READY_STATE_SCRIPT,
};
pub use structured::{rating_from_blocks, rating_from_payload};
pub use verdict::{evaluate, Outcome};
