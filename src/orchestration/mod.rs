pub mod authority;
pub mod journal;
pub mod service;

pub use authority::{AuthorityError, FlaggedTroves, LiquidationAuthority, Unrestricted};
pub use journal::EventJournal;
pub use service::{EventPage, LedgerService, ServiceError, TroveView};
