//! Scheduling worker, publisher and media intake for the Herald channel scheduler.
//!
//! This crate turns stored posts into channel messages and inbound media into
//! stored posts:
//! - **Worker**: once a minute publishes a post due now, falling back to the
//!   unscheduled pool on default slots, then delivers the sources album or
//!   comment as a reply to the channel's discussion thread
//! - **Publisher**: builds the primary and sources albums, downloading and
//!   transcoding documents as needed
//! - **MediaGroupAggregator**: buffers items of one media group and hands the
//!   whole group to a [`GroupHandler`] such as [`PostIntake`]
//!
//! The messaging backend and the image tool are reached through the
//! [`Transport`] and [`Transcoder`] traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregator;
mod config;
mod intake;
mod notice;
mod published;
mod publisher;
mod server;
mod sink;
mod summary;
mod tasks;
mod transcoder;
mod transport;
mod worker;

pub use aggregator::{GroupHandler, MediaGroupAggregator};
pub use config::{AggregatorConfig, BotConfig, WorkerConfig};
pub use intake::{ACCEPTED_NOTICE, PostIntake};
pub use notice::send_expiring;
pub use published::PublishedMap;
pub use publisher::{Albums, Publisher, ScratchFiles};
pub use server::HeraldServer;
pub use sink::{ErrorSink, FailureSink, log_errors, log_failures};
pub use summary::{ScheduleSummary, days_covered};
pub use tasks::BackgroundTasks;
pub use transcoder::{ImageInfo, ImageMagick, Transcoder, TranscoderConfig};
pub use transport::{
    MediaSource, OutboundItem, OutboundKind, RemoteFile, SendOptions, SentMessage, Transport,
    TransportResult,
};
pub use worker::{Worker, WorkerSettings};
