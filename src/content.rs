use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A generated post as returned by the content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Markdown-ish body using `\n` line breaks.
    #[serde(rename = "content", default)]
    pub body: String,
    #[serde(default, deserialize_with = "keyword_text")]
    pub keyword: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub morpheme_count: Option<u64>,
    /// Structured citations when the service supplies them.
    #[serde(default)]
    pub references: Option<Vec<Reference>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub title: String,
    #[serde(alias = "link")]
    pub url: String,
}

impl Reference {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// The service nests the keyword as `{ "keyword": "…" }`; a bare string is
/// accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyword {
    Nested { keyword: Option<String> },
    Text(String),
}

fn keyword_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<RawKeyword>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|k| match k {
            RawKeyword::Nested { keyword } => keyword,
            RawKeyword::Text(s) => Some(s),
        })
        .filter(|k| !k.trim().is_empty()))
}

// ── Tests ──
