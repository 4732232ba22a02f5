//! Post and comment form validation.

use serde::Deserialize;

use super::forms::{FieldErrors, required};

/// Image bytes accepted with a post, before they are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Raw post form input as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Post form after field validation. The group id still has to be checked
/// against storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ValidImage>,
}

/// Image formats accepted for posts, as sniffed from the uploaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Jpeg,
    Png,
    Webp,
    Bmp,
}

impl ImageFormat {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        match imagesize::image_type(bytes).ok()? {
            imagesize::ImageType::Gif => Some(Self::Gif),
            imagesize::ImageType::Jpeg => Some(Self::Jpeg),
            imagesize::ImageType::Png => Some(Self::Png),
            imagesize::ImageType::Webp => Some(Self::Webp),
            imagesize::ImageType::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }

    /// File extension used for stored copies; the client's name is never trusted.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidImage {
    pub filename: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl PostForm {
    pub fn validate(&self) -> Result<PostDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "text", &self.text);

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        let image = match &self.image {
            Some(upload) if !upload.bytes.is_empty() => match validate_image(upload) {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.push("image", message);
                    None
                }
            },
            _ => None,
        };

        errors.into_result(PostDraft {
            text: self.text.trim().to_string(),
            group_id,
            image,
        })
    }
}

fn validate_image(upload: &ImageUpload) -> Result<ValidImage, &'static str> {
    const INVALID: &str =
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
    let format = ImageFormat::sniff(&upload.bytes).ok_or(INVALID)?;
    let size = imagesize::blob_size(&upload.bytes).map_err(|_| INVALID)?;
    if size.width == 0 || size.height == 0 {
        return Err(INVALID);
    }
    Ok(ValidImage {
        filename: upload.filename.clone(),
        format,
        bytes: upload.bytes.clone(),
        width: size.width,
        height: size.height,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "text", &self.text);
        errors.into_result(self.text.trim().to_string())
    }
}
