use image::ImageFormat;
use crate::error::KeyError;

/// Output formats a derived object can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Map a filename extension to an output format (jpg is normalized to jpeg)
    pub fn from_extension(extension: &str) -> Result<Self, KeyError> {
        match extension {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(KeyError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }

    /// Content-Type of the derived object, e.g. image/jpeg
    pub fn content_type(self) -> String {
        format!("image/{}", self.name())
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// A requested key split into the original key and the resize to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    pub requested_key: String,
    pub original_key: String,
    pub width: u32,
    pub format: OutputFormat,
}

/// Decode a requested key. Ex: images/w100/photo.jpg → (images/photo.jpg, 100, jpeg)
pub fn decode(requested_key: &str) -> Result<DerivedKey, KeyError> {
    let mut parts: Vec<&str> = requested_key.split('/').collect();

    let file_name = parts.last().copied().unwrap_or_default();
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => return Err(KeyError::MissingExtension(file_name.to_string())),
    };
    let format = OutputFormat::from_extension(extension)?;

    if parts.len() < 2 {
        return Err(KeyError::MissingTransform(requested_key.to_string()));
    }
    let width_part = parts[parts.len() - 2];
    let width = parse_width(width_part)?;

    // Remove width part. Ex: images/w100/photo.jpg → images/photo.jpg
    parts.remove(parts.len() - 2);

    Ok(DerivedKey {
        requested_key: requested_key.to_string(),
        original_key: parts.join("/"),
        width,
        format,
    })
}

/// Build the requested key for an original key at a given width
pub fn encode(original_key: &str, width: u32) -> String {
    match original_key.rsplit_once('/') {
        Some((prefix, file_name)) => format!("{}/w{}/{}", prefix, width, file_name),
        None => format!("w{}/{}", width, original_key),
    }
}

/// Strict parse of a w<digits> segment into a positive width
fn parse_width(segment: &str) -> Result<u32, KeyError> {
    let invalid = || KeyError::InvalidWidth(segment.to_string());

    let digits = segment.strip_prefix('w').ok_or_else(invalid)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match digits.parse::<u32>() {
        Ok(width) if width > 0 => Ok(width),
        _ => Err(invalid()),
    }
}
