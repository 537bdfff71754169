pub mod config;
pub mod error;
pub mod insight;
pub mod metrics;
pub mod overlay;
pub mod remote;
pub mod roi;
pub mod sampler;
pub mod server;
pub mod session;

// Re-export vision types for convenience
pub use facelab_vision::{mesh, video, Camera, Landmark, Landmarker};

pub use error::Error;
pub use metrics::Scores;
