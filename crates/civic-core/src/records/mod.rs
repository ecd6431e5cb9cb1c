//! The observable record collection and its backend seam.

pub mod collection;
pub mod errors;
pub mod events;
pub mod filter;
pub mod sort;
pub mod transport;
pub mod types;

pub use collection::{FetchTicket, RecordCollection};
pub use errors::{RecordError, TransportError};
pub use events::{CollectionEvent, RecordChange};
pub use filter::FilterSpec;
pub use sort::SortSpec;
pub use transport::{FetchQuery, Transport};
pub use types::{Record, RecordFlags, RecordId};
