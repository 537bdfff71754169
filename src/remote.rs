//! Client for the hosted vision classifier. One shot, no retries: a failed
//! call surfaces immediately and the pass is discarded.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// The model is asked for strict JSON, but replies routinely wrap it in
/// prose or code fences, so the JSON block is cut out of the text.
static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

const VERDICT_PROMPT: &str = "You are a cosmetic face-assessment assistant. \
Look at the attached photo and rate the visible skin quality, facial \
symmetry, and grooming, each as a note from 0 to 10, with a one-sentence \
comment per category and a short list of care suggestions. Reply with a \
single JSON object of the form \
{\"skin\":{\"note\":0,\"comment\":\"\"},\"symmetry\":{\"note\":0,\"comment\":\"\"},\
\"grooming\":{\"note\":0,\"comment\":\"\"},\"suggestions\":[\"\"]} \
and nothing else.";

/// One rated category: a 0-10 note plus free-text commentary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub note: f32,
    #[serde(default)]
    pub comment: String,
}

/// The classifier's full reply. Lenient on missing fields; the hosted model
/// does not always produce every category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub skin: Note,
    #[serde(default)]
    pub symmetry: Note,
    #[serde(default)]
    pub grooming: Note,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Pull the verdict out of a free-text model reply.
pub fn extract_verdict(reply: &str) -> Result<Verdict> {
    let block = JSON_BLOCK
        .find(reply)
        .ok_or_else(|| Error::MalformedVerdict("no JSON object in reply".to_string()))?;
    serde_json::from_str(block.as_str()).map_err(|e| Error::MalformedVerdict(e.to_string()))
}

/// Send one photo to the hosted vision model and parse its verdict.
pub async fn classify(
    client: &reqwest::Client,
    cfg: &RemoteConfig,
    image: &[u8],
    media_type: &str,
) -> Result<Verdict> {
    let body = serde_json::json!({
        "model": cfg.model,
        "max_tokens": 512,
        "messages": [{
            "role": "user",
            "content": [
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": media_type,
                        "data": BASE64.encode(image),
                    },
                },
                { "type": "text", "text": VERDICT_PROMPT },
            ],
        }],
    });

    let response = client
        .post(&cfg.endpoint)
        .header("x-api-key", &cfg.api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::RemoteStatus {
            status: status.as_u16(),
            body,
        });
    }

    let reply: serde_json::Value = response.json().await?;
    let text = reply["content"][0]["text"].as_str().unwrap_or_default();
    extract_verdict(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_verdict_from_fenced_reply() {
        let reply = "Here is my assessment:\n```json\n\
            {\"skin\":{\"note\":7,\"comment\":\"even tone\"},\
             \"symmetry\":{\"note\":8,\"comment\":\"balanced\"},\
             \"grooming\":{\"note\":5,\"comment\":\"stubble\"},\
             \"suggestions\":[\"moisturize daily\"]}\n```\nHope that helps!";

        let verdict = extract_verdict(reply).unwrap();
        assert_eq!(verdict.skin.note, 7.0);
        assert_eq!(verdict.grooming.comment, "stubble");
        assert_eq!(verdict.suggestions, vec!["moisturize daily".to_string()]);
    }

    #[test]
    fn test_extract_verdict_tolerates_missing_fields() {
        let verdict = extract_verdict("{\"suggestions\":[\"sleep more\"]}").unwrap();
        assert_eq!(verdict.skin.note, 0.0);
        assert_eq!(verdict.suggestions.len(), 1);
    }

    #[test]
    fn test_extract_verdict_without_json_is_an_error() {
        let err = extract_verdict("I cannot rate this photo.").unwrap_err();
        assert!(matches!(err, Error::MalformedVerdict(_)));
    }

    #[test]
    fn test_extract_verdict_rejects_broken_json() {
        let err = extract_verdict("{\"skin\": }").unwrap_err();
        assert!(matches!(err, Error::MalformedVerdict(_)));
    }
}
