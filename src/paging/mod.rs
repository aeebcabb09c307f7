pub mod pager;

pub use pager::{IncidentPager, PagerOutcome, PagerState, PAGE_LIMIT};
