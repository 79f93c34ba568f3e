//! Traffic logging pipeline.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot + downstream Response + start time
//!     → record.rs (capture policy, header filter → NetworkLogRecord)
//!     → persister.rs (id + key, pretty JSON, metadata)
//!         → key.rs (network/YYYY/MM/DD/HH/<hifi>-<id>.json)
//!         → ident.rs (random id, high-fidelity timestamp)
//!             → clock.rs (wall clock + sub-millisecond fraction)
//!     → ObjectStore
//! ```
//!
//! # Design Decisions
//! - Runs as a background task; never delays the redirect
//! - Failures end at the persister boundary as diagnostics
//! - Clock and randomness are injected so output is reproducible in tests

pub mod body;
pub mod clock;
pub mod ident;
pub mod key;
pub mod persister;
pub mod record;

pub use body::{read_bounded, BoundedBody};
pub use clock::{ClockSource, FixedClock, SystemClock};
pub use ident::{IdentifierGenerator, RandomSource, ThreadRandom};
pub use key::{LogKey, LogKeyBuilder};
pub use persister::{PersistError, TrafficPersister};
pub use record::{
    extract_document_id, EdgeMetadata, NetworkLogRecord, RequestSnapshot, TrafficRecordBuilder,
};
