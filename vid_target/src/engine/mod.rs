//! Size-targeted transcode engine.

pub mod controller;
pub mod encoder;
pub mod error_log;
pub mod params;
pub mod status;

pub use controller::{
    wait_for_output, AttemptOutcome, AttemptRecord, JobOutcome, SizeTargetController, MAX_ATTEMPTS,
};
pub use encoder::{EncodeRequest, Encoder, FfmpegEncoder, Pass, PassProgress};
pub use error_log::ErrorLog;
pub use params::{allocate_bitrates, derive_parameters, recommended_bitrate, BitrateBudget, EncodeParameters};
pub use status::{status_tree, BoardView, EncodeDetails, Health, StatusUpdate};
