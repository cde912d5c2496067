pub mod boxes;
pub mod conference;
pub mod item;
pub mod patch;

pub use boxes::{BoxFilter, BoxPatch, BoxRecord, NewBox};
pub use conference::{
    Conference, ConferenceDetail, ConferenceFilter, ConferencePatch, ConferenceStatus,
    ConferenceTotals, NewConference,
};
pub use item::{ConferenceItem, ImportItem, ProductType};
pub use patch::{ItemPatch, Patch};
