pub mod aggregate;
pub mod conference;
pub mod recompute;

pub use aggregate::{aggregate_totals, finalize};
pub use conference::ConferenceService;
pub use recompute::{recompute_item, BoxLookup};
