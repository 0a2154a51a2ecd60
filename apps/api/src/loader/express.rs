//! Published Adobe Express documents.
//!
//! A published Express page is a JS-rendered shell, so its static HTML rarely
//! holds the CV text. The document service exposes the page model as JSON
//! (`docModel`, itself a JSON string) where every text box is a `TextModel`
//! node. A guest OAuth token usually unlocks it; some documents only answer
//! unauthenticated requests. This scraping is structural and breaks whenever
//! the third-party markup changes, which is why the caller keeps a static
//! HTML fallback.

use std::collections::VecDeque;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

pub const URN_PREFIX: &str = "urn:aaid:sc:AP:";
const EXPRESS_HOST: &str = "express.adobe.com";

pub const IMS_TOKEN_URL: &str =
    "https://adobeid-na1.services.adobe.com/ims/check/v6/token?jslVersion=v2-v0.45.0-5-gb993c08";
pub const DOCUMENT_URL_TEMPLATE: &str =
    "https://new.express.adobe.com/service/das/documents/urn:aaid:sc:AP:{urn}?allowArtifact=true";

pub const CLIENT_ID: &str = "projectx_webapp";
pub const GUEST_SCOPE: &str = "ab.manage,AdobeID,openid,read_organizations,creative_cloud,creative_sdk,tk_platform,tk_platform_sync,af_byof,stk.a.license_skip.r,stk.a.limited_license.cru,additional_info.optionalAgreements,uds_read,uds_write,af_ltd_projectx,unified_dev_portal,additional_info.ownerOrg,additional_info.roles,DCAPI,additional_info.auth_source,additional_info.authenticatingAccount,pps.write,pps.delete,pps.image_write,tk_platform_grant_free_subscription,pps.read,firefly_api,additional_info.projectedProductContext,adobeio.appregistry.read,adobeio.appregistry.write,account_cluster.read,indesign_services,eduprofile.write,eduprofile.read";
pub const ORIGIN: &str = "https://new.express.adobe.com";

/// Endpoints for the Express services. Overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct ExpressEndpoints {
    pub token_url: String,
    /// Must contain a `{urn}` placeholder.
    pub document_url_template: String,
}

impl Default for ExpressEndpoints {
    fn default() -> Self {
        Self {
            token_url: IMS_TOKEN_URL.to_string(),
            document_url_template: DOCUMENT_URL_TEMPLATE.to_string(),
        }
    }
}

impl ExpressEndpoints {
    pub fn document_url(&self, urn: &str) -> String {
        self.document_url_template.replace("{urn}", urn)
    }
}

#[derive(Debug, Deserialize)]
pub struct GuestToken {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentEnvelope {
    #[serde(rename = "docModel")]
    pub doc_model: Option<String>,
}

/// True when the host is an Express domain and the path names an asset URN.
pub fn is_published_express_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host_matches = parsed.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        host == EXPRESS_HOST || host.ends_with(&format!(".{EXPRESS_HOST}"))
    });
    host_matches && parsed.path().contains(URN_PREFIX)
}

/// Extracts the asset id following `urn:aaid:sc:AP:`, up to any query string or fragment.
pub fn extract_urn(url: &str) -> Option<String> {
    let (_, rest) = url.split_once(URN_PREFIX)?;
    let urn = rest
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/');
    if urn.is_empty() {
        None
    } else {
        Some(urn.to_string())
    }
}

/// Collects every `TextModel.text` in the document model, breadth-first so
/// shallow (page-level) text boxes come before deeply nested ones.
pub fn collect_text_models(doc_model: &Value) -> Vec<String> {
    let mut results = Vec::new();
    let mut queue: VecDeque<&Value> = VecDeque::from([doc_model]);

    while let Some(current) = queue.pop_front() {
        match current {
            Value::Object(map) => {
                for value in map.values() {
                    if let Some(text) = value
                        .get("TextModel")
                        .and_then(|m| m.get("text"))
                        .and_then(Value::as_str)
                    {
                        if !text.trim().is_empty() {
                            results.push(text.to_string());
                        }
                    }
                    if value.is_object() || value.is_array() {
                        queue.push_back(value);
                    }
                }
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }

    results
}

/// Parses the envelope's `docModel` string and returns its text boxes.
pub fn texts_from_envelope(envelope: &DocumentEnvelope) -> Result<Vec<String>, String> {
    let raw = envelope
        .doc_model
        .as_deref()
        .ok_or_else(|| "response has no docModel".to_string())?;
    let model: Value =
        serde_json::from_str(raw).map_err(|e| format!("docModel is not valid JSON: {e}"))?;
    Ok(collect_text_models(&model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_urn_strips_query_and_trailing_slash() {
        assert_eq!(
            extract_urn("https://new.express.adobe.com/publishedV2/urn:aaid:sc:AP:abc-123/?promoid=1"),
            Some("abc-123".to_string())
        );
        assert_eq!(extract_urn("https://example.com/cv"), None);
        assert_eq!(extract_urn("https://x/urn:aaid:sc:AP:?q"), None);
    }

    #[test]
    fn test_is_published_express_url() {
        assert!(is_published_express_url(
            "https://new.express.adobe.com/publishedV2/urn:aaid:sc:AP:abc"
        ));
        assert!(!is_published_express_url("https://new.express.adobe.com/home"));
        assert!(!is_published_express_url("https://example.com/urn:aaid:sc:AP:abc"));
        assert!(!is_published_express_url(
            "https://attacker.example/cv?ref=express.adobe.com/urn:aaid:sc:AP:x"
        ));
        assert!(!is_published_express_url(
            "https://express.adobe.com.attacker.example/urn:aaid:sc:AP:x"
        ));
    }

    #[test]
    fn test_collect_text_models_is_breadth_first() {
        let model = json!({
            "page": {
                "deep": { "inner": { "TextModel": { "text": "Deep detail" } } },
                "title": { "TextModel": { "text": "Jane Roe" } }
            },
            "children": [
                { "box": { "TextModel": { "text": "Staff Engineer" } } },
                { "box": { "TextModel": { "text": "   " } } }
            ]
        });

        let texts = collect_text_models(&model);
        assert_eq!(texts.len(), 3);
        assert_eq!(texts.last().map(String::as_str), Some("Deep detail"));
        assert!(texts.contains(&"Jane Roe".to_string()));
        assert!(texts.contains(&"Staff Engineer".to_string()));
    }

    #[test]
    fn test_texts_from_envelope_parses_nested_json_string() {
        let envelope = DocumentEnvelope {
            doc_model: Some(r#"{"a":{"TextModel":{"text":"Hello"}}}"#.to_string()),
        };
        assert_eq!(texts_from_envelope(&envelope).unwrap(), vec!["Hello"]);

        let missing = DocumentEnvelope { doc_model: None };
        assert!(texts_from_envelope(&missing).is_err());
    }

    #[test]
    fn test_document_url_substitutes_urn() {
        let endpoints = ExpressEndpoints::default();
        assert!(endpoints
            .document_url("abc")
            .contains("documents/urn:aaid:sc:AP:abc?allowArtifact=true"));
    }
}
