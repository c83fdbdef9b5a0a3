pub mod types;

pub use types::{Artwork, Page, RecordId};
