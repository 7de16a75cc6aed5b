pub mod breathing;
#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod features;
pub mod segmenter;
pub mod source;
pub mod wav;
