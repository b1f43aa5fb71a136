use crate::session::image::UploadedImage;
use crate::session::machine::TutorReply;
use std::fmt;

/// Where a photo came from. Both sources feed the same upload transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    Dropped,
    Picked,
}

impl fmt::Display for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dropped => f.write_str("dropped"),
            Self::Picked => f.write_str("picked"),
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    PhotoLoaded {
        source: UploadSource,
        image: UploadedImage,
    },
    PhotoRejected {
        source: UploadSource,
        reason: String,
    },
    ReplyReady(TutorReply),
}
