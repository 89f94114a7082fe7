use crate::error::ColloquyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// The register the model is asked to answer in.
///
/// Serialized lowercase; parsing (from config files or the command line)
/// ignores case and surrounding whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Tone {
    /// No tone instruction is added to the prompt.
    #[default]
    Default,
    /// Polished, professional wording.
    Formal,
    /// Relaxed, conversational wording.
    Casual,
    /// Warm and encouraging.
    Friendly,
    /// Precise, detail-oriented wording.
    Technical,
}

impl Tone {
    /// All tones, in declaration order.
    pub const ALL: [Tone; 5] = [
        Tone::Default,
        Tone::Formal,
        Tone::Casual,
        Tone::Friendly,
        Tone::Technical,
    ];

    /// Sentence prepended to the prompt, or `None` for [`Tone::Default`].
    pub fn instruction(self) -> Option<&'static str> {
        match self {
            Tone::Default => None,
            Tone::Formal => Some("Respond in a formal, professional tone."),
            Tone::Casual => Some("Respond in a casual, relaxed tone."),
            Tone::Friendly => Some("Respond in a warm, friendly tone."),
            Tone::Technical => Some("Respond in a precise, technical tone."),
        }
    }

    /// Lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Default => "default",
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Technical => "technical",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = ColloquyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                ColloquyError::Config(format!(
                    "unknown tone '{s}' (expected one of: default, formal, casual, friendly, technical)"
                ))
            })
    }
}

impl TryFrom<String> for Tone {
    type Error = ColloquyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// An image sent alongside the user's text.
///
/// The bytes are stored base64-encoded when serialized so that a saved
/// session stays plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ImageAttachment {
    /// Creates an attachment from raw bytes.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Base64 (standard alphabet, padded) encoding of the image bytes.
    pub fn to_base64(&self) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:` URL suitable for OpenAI-style `image_url` content parts.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Size of the image payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Guess an image MIME type from a file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// One user/model exchange.
///
/// A turn is built from the user's side first and only becomes appendable to
/// a session once [`Turn::with_response`] has recorded the model's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier for this turn.
    pub id: Uuid,
    /// What the user typed. May be empty (e.g. an image-only question).
    pub user_input: String,
    /// Optional image sent with the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_image: Option<ImageAttachment>,
    /// Model that produced the response.
    pub model_identifier: String,
    /// Tone requested for the response.
    #[serde(default)]
    pub tone: Tone,
    /// The model's answer; `None` until the remote call resolves.
    #[serde(default)]
    pub response_text: Option<String>,
    /// UTC timestamp of when the turn was created.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Starts an unresolved turn for `model_identifier`.
    pub fn new(user_input: impl Into<String>, model_identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_input: user_input.into(),
            attached_image: None,
            model_identifier: model_identifier.into(),
            tone: Tone::Default,
            response_text: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the requested tone.
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Attaches an image.
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.attached_image = Some(image);
        self
    }

    /// Records the model's answer.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response_text = Some(response.into());
        self
    }

    /// Whether the model's answer is known.
    pub fn is_resolved(&self) -> bool {
        self.response_text.is_some()
    }

    /// The model's answer, or `""` if unresolved.
    pub fn response(&self) -> &str {
        self.response_text.as_deref().unwrap_or_default()
    }
}
