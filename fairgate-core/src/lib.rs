//! # Fairgate Core
//!
//! Domain model for the fairgate booking backend: typed identifiers,
//! booking/seat/event/waitlist records, the finalize message envelope,
//! and the error taxonomy shared by every crate in the workspace.
//!
//! This crate is deliberately free of infrastructure: no database, no
//! Redis, no Kafka. Those live in `fairgate-stream` and the service
//! crate; everything here is plain data that serializes with `serde`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod seat;
pub mod waitlist;

pub use booking::{Booking, BookingStatus, PaymentStatus};
pub use error::{CoreError, Result};
pub use event::{CapacityRecord, Event, EventStatus};
pub use ids::{BookingId, EventId, UserId, WaitlistEntryId};
pub use message::{FinalizeMessage, MessageKind};
pub use seat::{Seat, SeatStatus};
pub use waitlist::WaitlistEntry;
