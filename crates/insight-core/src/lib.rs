//! insight-core — Upload validation, image encoding and the analysis cycle.
//!
//! Holds everything about a face analysis cycle that does not touch the
//! network or the host desktop: the upload validator, the data URL encoder,
//! the [`Analyzer`] seam and the single-variant [`Status`] state machine.

pub mod analysis;
pub mod encoder;
pub mod render;
pub mod session;
pub mod types;
pub mod upload;

pub use analysis::{AnalysisError, AnalysisRequest, Analyzer};
pub use encoder::EncodeError;
pub use session::{CycleError, Phase, Session, Status, Transition};
pub use types::{
    AnalysisResult, Capabilities, CycleId, EncodedImage, Preview, ResultAction, SelectedImage,
};
pub use upload::UploadError;
