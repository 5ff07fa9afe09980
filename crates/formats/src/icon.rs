use surface::Bitmap;

#[derive(Debug)]
pub enum IconDecodeError {
    Missing { path: String, reason: String },
    Decode(image::ImageError),
    Empty,
}

impl From<image::ImageError> for IconDecodeError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err)
    }
}

impl std::fmt::Display for IconDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { path, reason } => write!(f, "icon {path} unavailable: {reason}"),
            Self::Decode(err) => write!(f, "icon decode error: {err}"),
            Self::Empty => write!(f, "icon has no pixels"),
        }
    }
}

impl std::error::Error for IconDecodeError {}

/// Decodes PNG bytes into an RGBA bitmap for the surface.
pub fn decode_icon(bytes: &[u8]) -> Result<Bitmap, IconDecodeError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(IconDecodeError::Empty);
    }
    Ok(Bitmap {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

pub fn load_icon(path: &str) -> Result<Bitmap, IconDecodeError> {
    let bytes = std::fs::read(path).map_err(|e| IconDecodeError::Missing {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    decode_icon(&bytes)
}
