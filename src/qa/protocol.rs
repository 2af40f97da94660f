//! Wire format of the question-answering service and the rules for reading its replies.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::constants::qa::{MISSING_RESPONSE_TEXT, NOT_AVAILABLE};
use crate::qa::error::QaError;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Zero-based page index. Any JSON number is accepted; other shapes count as absent.
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<f64>,
}

fn lenient_page<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Source {
    pub id: u64,
    pub score: f64,
    /// The backend forwards whatever metadata the document had, including `null`
    #[serde(default)]
    pub metadata: Option<SourceMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub response: String,
    pub sources: Vec<Source>,
}

#[derive(Deserialize)]
struct SuccessBody {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Status line and body as received from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reject empty and whitespace-only input before anything is sent.
pub fn validate_query(input: &str) -> Result<QueryRequest, QaError> {
    if input.trim().is_empty() {
        return Err(QaError::EmptyQuery);
    }
    Ok(QueryRequest {
        query: input.to_string(),
    })
}

/// Turn a raw reply into a response or a user-facing error.
pub fn interpret_reply(reply: &RawReply) -> Result<QueryResponse, QaError> {
    if !reply.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&reply.body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty());
        return Err(match message {
            Some(message) => QaError::Server {
                status: reply.status,
                message,
            },
            None => QaError::Status(reply.status),
        });
    }

    let body: SuccessBody =
        serde_json::from_str(&reply.body).map_err(|err| QaError::Decode(err.to_string()))?;
    let response = body
        .response
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| MISSING_RESPONSE_TEXT.to_string());

    Ok(QueryResponse {
        response,
        sources: body.sources.unwrap_or_default(),
    })
}

/// One display entry per source, in payload order.
pub fn source_lines(sources: &[Source]) -> Vec<String> {
    sources
        .iter()
        .map(|source| {
            let metadata = source.metadata.as_ref();
            let file = display_or_na(metadata.and_then(|m| m.source.as_deref()));
            let kind = display_or_na(metadata.and_then(|m| m.kind.as_deref()));
            let mut line = format!(
                "Source {} (Score: {})\nFile: {}\nType: {}",
                source.id, source.score, file, kind
            );
            if let Some(page) = metadata.and_then(|m| m.page) {
                line.push_str(&format!(" | Page: {}", page + 1.0));
            }
            line
        })
        .collect()
}

// Empty strings read as missing, like absent fields
fn display_or_na(value: Option<&str>) -> &str {
    value.filter(|text| !text.is_empty()).unwrap_or(NOT_AVAILABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> RawReply {
        RawReply {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn blank_queries_are_rejected() {
        for input in ["", " ", "\t\n", "   \r\n  "] {
            assert_eq!(validate_query(input), Err(QaError::EmptyQuery));
        }
        assert_eq!(
            validate_query(" What is your research? ").unwrap().query,
            " What is your research? "
        );
    }

    #[test]
    fn request_serializes_single_field() {
        let request = validate_query("hi").unwrap();
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"query":"hi"}"#);
    }

    #[test]
    fn success_keeps_source_order_and_count() {
        let body = r#"{
            "response": "Neural decoding.",
            "sources": [
                {"id": 3, "score": 0.91, "metadata": {"source": "cv.pdf", "type": "pdf", "page": 0}},
                {"id": 1, "score": 0.5, "metadata": {"source": "notes.md", "type": "markdown"}},
                {"id": 2, "score": 0.25, "metadata": {}}
            ]
        }"#;
        let parsed = interpret_reply(&reply(200, body)).unwrap();
        assert_eq!(parsed.response, "Neural decoding.");
        let ids: Vec<u64> = parsed.sources.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(source_lines(&parsed.sources).len(), 3);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed = interpret_reply(&reply(200, "{}")).unwrap();
        assert_eq!(parsed.response, MISSING_RESPONSE_TEXT);
        assert!(parsed.sources.is_empty());
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let err = interpret_reply(&reply(400, r#"{"error": "Request must be JSON"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "Request must be JSON");
    }

    #[test]
    fn unparseable_error_mentions_status() {
        for body in ["", "<html>oops</html>", r#"{"error": ""}"#, r#"{"detail": "x"}"#] {
            let err = interpret_reply(&reply(503, body)).unwrap_err();
            assert_eq!(err, QaError::Status(503));
            assert!(err.to_string().contains("503"));
        }
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let err = interpret_reply(&reply(200, "not json")).unwrap_err();
        assert!(matches!(err, QaError::Decode(_)));
    }

    #[test]
    fn source_lines_format_page_and_fallbacks() {
        let sources = vec![
            Source {
                id: 1,
                score: 0.8123,
                metadata: Some(SourceMetadata {
                    source: Some("thesis.pdf".into()),
                    kind: Some("pdf".into()),
                    page: Some(4.0),
                }),
            },
            Source {
                id: 2,
                score: 0.5,
                metadata: Some(SourceMetadata::default()),
            },
            Source {
                id: 3,
                score: 0.25,
                metadata: None,
            },
        ];
        let lines = source_lines(&sources);
        assert_eq!(
            lines[0],
            "Source 1 (Score: 0.8123)\nFile: thesis.pdf\nType: pdf | Page: 5"
        );
        assert_eq!(lines[1], "Source 2 (Score: 0.5)\nFile: N/A\nType: N/A");
        assert_eq!(lines[2], "Source 3 (Score: 0.25)\nFile: N/A\nType: N/A");
    }

    #[test]
    fn empty_metadata_strings_read_as_missing() {
        let sources = vec![Source {
            id: 1,
            score: 0.5,
            metadata: Some(SourceMetadata {
                source: Some(String::new()),
                kind: Some(String::new()),
                page: None,
            }),
        }];
        assert_eq!(
            source_lines(&sources),
            vec!["Source 1 (Score: 0.5)\nFile: N/A\nType: N/A".to_string()]
        );
    }

    #[test]
    fn null_metadata_keeps_the_answer() {
        let body = r#"{"response": "Still answered.", "sources": [
            {"id": 7, "score": 0.4, "metadata": null},
            {"id": 8, "score": 0.3}
        ]}"#;
        let parsed = interpret_reply(&reply(200, body)).unwrap();
        assert_eq!(parsed.response, "Still answered.");
        assert_eq!(parsed.sources.len(), 2);
        assert!(parsed.sources[0].metadata.is_none());
        assert_eq!(
            source_lines(&parsed.sources)[0],
            "Source 7 (Score: 0.4)\nFile: N/A\nType: N/A"
        );
    }

    #[test]
    fn float_and_odd_pages_are_tolerated() {
        let body = r#"{"response": "ok", "sources": [
            {"id": 1, "score": 0.9, "metadata": {"source": "cv.pdf", "page": 2.0}},
            {"id": 2, "score": 0.8, "metadata": {"source": "cv.pdf", "page": "two"}},
            {"id": 3, "score": 0.7, "metadata": {"source": "cv.pdf", "page": null}}
        ]}"#;
        let parsed = interpret_reply(&reply(200, body)).unwrap();
        let lines = source_lines(&parsed.sources);
        assert!(lines[0].ends_with("Type: N/A | Page: 3"));
        assert!(lines[1].ends_with("Type: N/A"));
        assert!(lines[2].ends_with("Type: N/A"));
    }
}
