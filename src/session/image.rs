use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;

pub const GATEWAY_MIME_TYPE: &str = "image/jpeg";
const PREVIEW_MAX_EDGE: u32 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("photo is empty")]
    Empty,

    #[error("photo could not be decoded: {0}")]
    Decode(#[source] image::ImageError),

    #[error("photo could not be re-encoded as JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Downscaled RGBA copy of the photo, sized for on-screen display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPreview {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// A decoded student photo in the two representations the session needs:
/// raw JPEG bytes for the model and an embeddable `data:` URI for the transcript.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    jpeg: Arc<[u8]>,
    data_uri: String,
    preview: PhotoPreview,
}

impl UploadedImage {
    /// Decodes any format the `image` crate understands. JPEG input is kept
    /// byte-for-byte; everything else is transcoded.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let decoded = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
        let jpeg: Arc<[u8]> = if matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg)) {
            Arc::from(bytes)
        } else {
            Arc::from(encode_jpeg(&decoded)?)
        };

        let data_uri = format!("data:{GATEWAY_MIME_TYPE};base64,{}", BASE64.encode(&jpeg));
        let preview = build_preview(&decoded);

        Ok(Self {
            jpeg,
            data_uri,
            preview,
        })
    }

    pub fn jpeg_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.jpeg)
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn preview(&self) -> &PhotoPreview {
        &self.preview
    }
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .map_err(ImageError::Encode)?;
    Ok(out)
}

fn build_preview(image: &DynamicImage) -> PhotoPreview {
    let scaled = if image.width() > PREVIEW_MAX_EDGE || image.height() > PREVIEW_MAX_EDGE {
        image.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE)
    } else {
        image.clone()
    };
    let rgba = scaled.to_rgba8();
    PhotoPreview {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    }
}
