//! Remote AI-backed compositing
//!
//! An [`ExternalCompositor`] takes both source photographs and returns one
//! finished composite. The pipeline validates that buffer and then runs only
//! the export and packaging stages on it.

use crate::{
    error::{CompositeError, Result},
    types::{Category, ScaleFactor},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the model name
pub const MODEL_ENV: &str = "GPT_COMPOSITOR_MODEL";
/// Model used when no override is set
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// A collaborator that blends the product onto the model remotely
#[async_trait]
pub trait ExternalCompositor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Produce an encoded composite image from the two source buffers
    async fn composite(
        &self,
        model: &[u8],
        product: &[u8],
        category: Category,
        scale: ScaleFactor,
    ) -> Result<Vec<u8>>;
}

/// Instruction text sent alongside the two images
#[must_use]
pub fn build_composite_prompt(category: Category, scale: ScaleFactor) -> String {
    let (focus, styling) = match category {
        Category::Jewelry => (
            "Align the jewelry naturally around the mannequin's neckline and collarbone.",
            "Preserve metallic highlights and ensure gemstones reflect the studio lighting.",
        ),
        Category::Clothing => (
            "Drape the clothing smoothly along the mannequin's shoulders and torso.",
            "Respect realistic fabric folds and cast subtle shadows wherever the garment overlaps the mannequin.",
        ),
    };

    let sizing = format!(
        "Apply the provided scale factor multiplier of {:.2} to keep the product size believable.",
        scale.value()
    );

    [
        "Blend the provided product image onto the mannequin reference to create a studio-quality ecommerce photo.",
        focus,
        styling,
        "Keep the mannequin pose, proportions, and lighting consistent with the reference photo.",
        sizing.as_str(),
        "Return a polished PNG composite on a neutral light gray background that is ready for a storefront listing.",
    ]
    .join(" ")
}

/// Structured payload the remote model is asked to return
#[derive(Debug, Clone, Deserialize)]
pub struct CompositePayload {
    /// Base64-encoded composite image
    pub composite: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl CompositePayload {
    /// Decode the composite image bytes
    ///
    /// # Errors
    ///
    /// Returns `ExternalCompositor` for bad base64 or an empty image
    pub fn decode(&self) -> Result<Vec<u8>> {
        let bytes = STANDARD
            .decode(self.composite.trim())
            .map_err(|e| CompositeError::external(format!("Composite is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(CompositeError::external("Received an empty composite image"));
        }
        Ok(bytes)
    }
}

fn parse_payload(value: &Value) -> Option<CompositePayload> {
    let payload: CompositePayload = serde_json::from_value(value.clone()).ok()?;
    (!payload.composite.trim().is_empty()).then_some(payload)
}

fn parse_payload_text(text: &str) -> Option<CompositePayload> {
    serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(parse_payload)
}

/// Locate the composite payload in a response body
///
/// Checks `output_text` first, then each `output[].content[]` entry of type
/// `output_json` (its `json` field) or `text` / `output_text` (its `text`
/// field parsed as JSON).
///
/// # Errors
///
/// Returns `ExternalCompositor` when no entry yields a non-empty `composite`
pub fn extract_composite_payload(response: &Value) -> Result<CompositePayload> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        if let Some(payload) = parse_payload_text(text.trim()) {
            return Ok(payload);
        }
    }

    let entries = response
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten();

    for entry in entries {
        let payload = match entry.get("type").and_then(Value::as_str) {
            Some("output_json") => entry.get("json").and_then(parse_payload),
            Some("text" | "output_text") => entry
                .get("text")
                .and_then(Value::as_str)
                .and_then(parse_payload_text),
            _ => None,
        };
        if let Some(payload) = payload {
            return Ok(payload);
        }
    }

    Err(CompositeError::external(
        "Compositor did not return a valid JSON payload with an image result",
    ))
}

#[cfg(feature = "external-compositor")]
pub use client::OpenAiCompositor;

#[cfg(feature = "external-compositor")]
mod client {
    use super::{
        build_composite_prompt, extract_composite_payload, ExternalCompositor, API_KEY_ENV,
        DEFAULT_MODEL, MODEL_ENV,
    };
    use crate::{
        error::{CompositeError, Result},
        types::{Category, ScaleFactor},
    };
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use reqwest::Client;
    use serde_json::{json, Value};
    use std::sync::OnceLock;
    use std::time::Duration;

    const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    const SYSTEM_PROMPT: &str = "You are an ecommerce photo compositor. Combine the mannequin and product inputs into a realistic catalog-ready image. Respond strictly with JSON that matches the provided schema.";

    static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

    /// Process-wide HTTP client, built on first use
    fn shared_client() -> Result<&'static Client> {
        if let Some(client) = SHARED_CLIENT.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| CompositeError::external(format!("Failed to create HTTP client: {}", e)))?;
        Ok(SHARED_CLIENT.get_or_init(|| client))
    }

    /// Compositor backed by the OpenAI Responses API
    #[derive(Debug, Clone)]
    pub struct OpenAiCompositor {
        api_key: String,
        model: String,
        base_url: String,
    }

    impl OpenAiCompositor {
        #[must_use]
        pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
            Self {
                api_key: api_key.into(),
                model: model.into(),
                base_url: DEFAULT_BASE_URL.to_string(),
            }
        }

        /// Configure from `OPENAI_API_KEY` and `GPT_COMPOSITOR_MODEL`
        ///
        /// # Errors
        ///
        /// Returns `ExternalCompositor` when no API key is configured
        pub fn from_env() -> Result<Self> {
            let api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| CompositeError::external("OpenAI API key is not configured"))?;
            let model = std::env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
            Ok(Self::new(api_key, model))
        }

        /// Whether an API key is present in the environment
        #[must_use]
        pub fn is_available() -> bool {
            std::env::var(API_KEY_ENV).is_ok_and(|key| !key.trim().is_empty())
        }

        #[must_use]
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into().trim_end_matches('/').to_string();
            self
        }

        #[must_use]
        pub fn model(&self) -> &str {
            &self.model
        }

        fn request_body(&self, model: &[u8], product: &[u8], prompt: &str) -> Value {
            let image = |bytes: &[u8]| format!("data:image/png;base64,{}", STANDARD.encode(bytes));
            json!({
                "model": self.model,
                "input": [
                    {
                        "role": "system",
                        "content": [{ "type": "input_text", "text": SYSTEM_PROMPT }]
                    },
                    {
                        "role": "user",
                        "content": [
                            { "type": "input_text", "text": prompt },
                            { "type": "input_image", "image_url": image(model) },
                            { "type": "input_image", "image_url": image(product) }
                        ]
                    }
                ],
                "text": {
                    "format": {
                        "type": "json_schema",
                        "name": "composite_response",
                        "schema": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": {
                                "composite": {
                                    "type": "string",
                                    "description": "Base64 encoded PNG image of the mannequin wearing the provided product."
                                },
                                "reasoning": {
                                    "type": "string",
                                    "description": "Optional summary of how the composite was produced."
                                }
                            },
                            "required": ["composite"]
                        }
                    }
                }
            })
        }
    }

    #[async_trait]
    impl ExternalCompositor for OpenAiCompositor {
        fn name(&self) -> &'static str {
            "openai"
        }

        async fn composite(
            &self,
            model: &[u8],
            product: &[u8],
            category: Category,
            scale: ScaleFactor,
        ) -> Result<Vec<u8>> {
            let client = shared_client()?;
            let prompt = build_composite_prompt(category, scale);
            let url = format!("{}/responses", self.base_url);

            log::info!("Requesting remote composite from model {}", self.model);
            let response = client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&self.request_body(model, product, &prompt))
                .send()
                .await
                .map_err(|e| CompositeError::external(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CompositeError::external(format!(
                    "Compositor service responded with HTTP {}",
                    status
                )));
            }

            let body: Value = response.json().await.map_err(|e| {
                CompositeError::external(format!("Response body is not JSON: {}", e))
            })?;
            let payload = extract_composite_payload(&body)?;
            if let Some(reasoning) = payload.reasoning.as_deref() {
                log::debug!("Compositor reasoning: {}", reasoning);
            }
            payload.decode()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_request_body_carries_both_images() {
            let compositor = OpenAiCompositor::new("key", "gpt-4.1");
            let body = compositor.request_body(b"model", b"product", "prompt");
            assert_eq!(body["model"], "gpt-4.1");
            let content = &body["input"][1]["content"];
            assert_eq!(content[0]["text"], "prompt");
            assert_eq!(content[1]["image_url"], "data:image/png;base64,bW9kZWw=");
            assert_eq!(body["text"]["format"]["schema"]["required"][0], "composite");
        }

        #[test]
        fn test_base_url_is_normalized() {
            let compositor =
                OpenAiCompositor::new("key", DEFAULT_MODEL).with_base_url("http://localhost:9/v1/");
            assert_eq!(compositor.base_url, "http://localhost:9/v1");
            assert_eq!(compositor.model(), "gpt-4.1");
        }

        #[test]
        fn test_shared_client_is_reused() {
            let first = shared_client().unwrap();
            let second = shared_client().unwrap();
            assert!(std::ptr::eq(first, second));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scale(value: f32) -> ScaleFactor {
        ScaleFactor::new(value).unwrap()
    }

    #[test]
    fn test_prompt_mentions_category_and_scale() {
        let prompt = build_composite_prompt(Category::Jewelry, scale(1.2));
        assert!(prompt.contains("neckline"));
        assert!(prompt.contains("multiplier of 1.20"));

        let prompt = build_composite_prompt(Category::Clothing, scale(0.8));
        assert!(prompt.contains("fabric folds"));
        assert!(prompt.contains("multiplier of 0.80"));
    }

    #[test]
    fn test_payload_from_output_text() {
        let response = json!({ "output_text": "{\"composite\":\"aGk=\"}" });
        let payload = extract_composite_payload(&response).unwrap();
        assert_eq!(payload.decode().unwrap(), b"hi");
    }

    #[test]
    fn test_payload_from_structured_output() {
        let response = json!({
            "output_text": "not json",
            "output": [
                { "content": [{ "type": "refusal" }] },
                { "content": [
                    { "type": "text", "text": "still not json" },
                    { "type": "output_json", "json": { "composite": "aGk=", "reasoning": "ok" } }
                ] }
            ]
        });
        let payload = extract_composite_payload(&response).unwrap();
        assert_eq!(payload.reasoning.as_deref(), Some("ok"));
    }

    #[test]
    fn test_payload_from_output_text_entry() {
        let response = json!({
            "output": [{ "content": [{ "type": "output_text", "text": "{\"composite\":\"aGk=\"}" }] }]
        });
        assert!(extract_composite_payload(&response).is_ok());
    }

    #[test]
    fn test_missing_or_empty_composite_is_rejected() {
        for response in [
            json!({}),
            json!({ "output_text": "{\"composite\":\"\"}" }),
            json!({ "output": [{ "content": [{ "type": "output_json", "json": { "other": 1 } }] }] }),
        ] {
            assert!(matches!(
                extract_composite_payload(&response),
                Err(CompositeError::ExternalCompositor(_))
            ));
        }
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let payload = CompositePayload {
            composite: "***".to_string(),
            reasoning: None,
        };
        assert!(matches!(
            payload.decode(),
            Err(CompositeError::ExternalCompositor(_))
        ));
    }
}
