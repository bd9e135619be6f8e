// 💬 Question Answerer - forward table + question to a hosted model
// No retry, no caching, no validation of the answer

use crate::dataset::InventoryTable;
use crate::gate::Secret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const PREAMBLE: &str = "You are an assistant for an eyewear frames inventory. \
Only answer questions about the eyewear brands, frame types, inventory counts and prices \
contained in the data below. \
If a request is unrelated to that eyewear inventory, politely refuse to answer it. \
If the data below is not sufficient to answer, reply \"I don't know\" instead of guessing or \
inventing information.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("could not reach the text service: {0}")]
    Network(String),

    #[error("text service did not answer in time")]
    Timeout,

    #[error("text service rejected the API credential (HTTP {0})")]
    Authentication(u16),

    #[error("text service quota or rate limit exceeded")]
    RateLimited,

    #[error("text service rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed response from text service: {0}")]
    MalformedResponse(String),

    #[error("could not serialize inventory table: {0}")]
    Serialization(String),
}

/// What gets sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub user_message: String,
    pub max_output_tokens: u32,
}

/// External text-generation service
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AssistantError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AssistantError> {
        (**self).generate(request)
    }
}

// ============================================================================
// PROMPT
// ============================================================================

/// CSV text of the whole table: header plus one line per record, in order.
/// Any record that fails to serialize fails the whole table.
pub fn serialize_table(table: &InventoryTable) -> Result<String, AssistantError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in table {
        writer
            .serialize(record)
            .map_err(|e| AssistantError::Serialization(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AssistantError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AssistantError::Serialization(e.to_string()))
}

pub fn build_instructions(table: &InventoryTable) -> Result<String, AssistantError> {
    Ok(format!(
        "{}\n\nInventory data (CSV):\n{}",
        PREAMBLE,
        serialize_table(table)?
    ))
}

pub struct QuestionAnswerer {
    generator: Box<dyn TextGenerator + Send + Sync>,
    max_output_tokens: u32,
}

impl QuestionAnswerer {
    pub fn new<G>(generator: G, max_output_tokens: u32) -> Self
    where
        G: TextGenerator + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
            max_output_tokens,
        }
    }

    pub fn request_for(
        &self,
        table: &InventoryTable,
        question: &str,
    ) -> Result<GenerationRequest, AssistantError> {
        Ok(GenerationRequest {
            system_instructions: build_instructions(table)?,
            user_message: question.trim().to_string(),
            max_output_tokens: self.max_output_tokens,
        })
    }

    /// Blocks until the service answers or fails.
    pub fn answer(&self, table: &InventoryTable, question: &str) -> Result<String, AssistantError> {
        if question.trim().is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        let request = self.request_for(table, question)?;
        info!(question_len = request.user_message.len(), "asking text service");

        self.generator.generate(&request).map_err(|e| {
            warn!("text service call failed: {}", e);
            e
        })
    }
}

// ============================================================================
// HTTP CLIENT (OpenAI-compatible chat completions)
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct HttpTextGenerator {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Secret,
    model: String,
}

impl HttpTextGenerator {
    pub fn new(
        base_url: &str,
        api_key: Secret,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AssistantError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AssistantError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_message,
                },
            ],
            max_tokens: request.max_output_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().map_err(transport_error)?;

        debug!(status, bytes = text.len(), "text service responded");
        check_status(status, &text)?;
        parse_answer(&text)
    }
}

fn transport_error(e: reqwest::Error) -> AssistantError {
    if e.is_timeout() {
        AssistantError::Timeout
    } else {
        AssistantError::Network(e.to_string())
    }
}

/// Map non-success HTTP statuses to distinct failure kinds
pub fn check_status(status: u16, body: &str) -> Result<(), AssistantError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(AssistantError::Authentication(status)),
        429 => Err(AssistantError::RateLimited),
        _ => Err(AssistantError::Rejected {
            status,
            body: body.chars().take(500).collect(),
        }),
    }
}

/// First returned answer, unmodified
pub fn parse_answer(body: &str) -> Result<String, AssistantError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AssistantError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AssistantError::MalformedResponse("no answer in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InventoryRecord;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every request and replies with a canned result
    struct RecordingGenerator {
        requests: Mutex<Vec<GenerationRequest>>,
        reply: fn() -> Result<String, AssistantError>,
    }

    impl RecordingGenerator {
        fn replying(reply: fn() -> Result<String, AssistantError>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl TextGenerator for RecordingGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<String, AssistantError> {
            self.requests.lock().unwrap().push(request.clone());
            (self.reply)()
        }
    }

    fn acme_only() -> InventoryTable {
        InventoryTable::new(vec![
            InventoryRecord::new("Acme", "Round", 10, 50.0),
            InventoryRecord::new("Acme", "Square", 5, 60.0),
        ])
    }

    #[test]
    fn test_serialize_table_is_exact() {
        let text = serialize_table(&acme_only()).unwrap();

        assert_eq!(
            text,
            "Brand,Frame Type,Inventory Count,Price\nAcme,Round,10,50.0\nAcme,Square,5,60.0\n"
        );
        assert_eq!(text, serialize_table(&acme_only()).unwrap());
    }

    #[test]
    fn test_serialize_table_keeps_every_record() {
        let table = InventoryTable::new(vec![
            InventoryRecord::new("Ray, \"Ban\"", "Round", 1, 10.0),
            InventoryRecord::new("", "", -4, f64::NAN),
            InventoryRecord::new("Acme", "Square", 0, 0.0),
        ]);

        let text = serialize_table(&table).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let brands: Vec<String> = reader
            .deserialize::<InventoryRecord>()
            .map(|r| r.unwrap().brand)
            .collect();

        assert_eq!(brands, vec!["Ray, \"Ban\"", "", "Acme"]);
    }

    #[test]
    fn test_instructions_restrict_scope() {
        let instructions = build_instructions(&acme_only()).unwrap();

        assert!(instructions.contains("eyewear"));
        assert!(instructions.contains("refuse"));
        assert!(instructions.contains("I don't know"));
        assert!(instructions.ends_with(&serialize_table(&acme_only()).unwrap()));
    }

    #[test]
    fn test_answer_passes_reply_through_verbatim() {
        let generator = RecordingGenerator::replying(|| Ok("  Round: 10, Square: 5 \n".to_string()));
        let answerer = QuestionAnswerer::new(generator.clone(), 256);

        let answer = answerer.answer(&acme_only(), "What does Acme stock?").unwrap();

        assert_eq!(answer, "  Round: 10, Square: 5 \n");
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_message, "What does Acme stock?");
        assert_eq!(requests[0].max_output_tokens, 256);
    }

    #[test]
    fn test_upstream_sees_only_table_rows() {
        let generator = RecordingGenerator::replying(|| Ok("I don't know".to_string()));
        let answerer = QuestionAnswerer::new(generator.clone(), 128);

        answerer
            .answer(&acme_only(), "What frame types does Zeta have?")
            .unwrap();

        let requests = generator.requests();
        let instructions = &requests[0].system_instructions;
        assert!(!instructions.contains("Zeta"));

        let data = instructions
            .split("Inventory data (CSV):\n")
            .nth(1)
            .unwrap();
        // header + the two Acme rows, nothing else
        assert_eq!(data.lines().count(), 3);
        assert!(data.lines().skip(1).all(|line| line.starts_with("Acme,")));
    }

    #[test]
    fn test_empty_question_never_calls_upstream() {
        let generator = RecordingGenerator::replying(|| Ok("unused".to_string()));
        let answerer = QuestionAnswerer::new(generator.clone(), 128);

        let result = answerer.answer(&acme_only(), "   ");

        assert!(matches!(result, Err(AssistantError::EmptyQuestion)));
        assert!(generator.requests().is_empty());
    }

    #[test]
    fn test_upstream_failure_is_propagated_once() {
        let generator = RecordingGenerator::replying(|| Err(AssistantError::RateLimited));
        let answerer = QuestionAnswerer::new(generator.clone(), 128);

        let result = answerer.answer(&acme_only(), "How many frames?");

        assert!(matches!(result, Err(AssistantError::RateLimited)));
        // No retry
        assert_eq!(generator.requests().len(), 1);
    }

    #[test]
    fn test_check_status_kinds() {
        assert!(check_status(200, "").is_ok());
        assert!(matches!(check_status(401, ""), Err(AssistantError::Authentication(401))));
        assert!(matches!(check_status(403, ""), Err(AssistantError::Authentication(403))));
        assert!(matches!(check_status(429, ""), Err(AssistantError::RateLimited)));
        assert!(matches!(
            check_status(500, "boom"),
            Err(AssistantError::Rejected { status: 500, .. })
        ));
    }

    #[test]
    fn test_parse_answer_takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(parse_answer(body).unwrap(), "first");
    }

    // ------------------------------------------------------------------------
    // HttpTextGenerator against a local HTTP endpoint
    // ------------------------------------------------------------------------

    fn chat_request() -> GenerationRequest {
        GenerationRequest {
            system_instructions: "system text".to_string(),
            user_message: "How many frames?".to_string(),
            max_output_tokens: 64,
        }
    }

    /// The blocking client owns its own runtime, so it must live off the
    /// async test thread.
    async fn generate_against(base_url: String, timeout: Duration) -> Result<String, AssistantError> {
        tokio::task::spawn_blocking(move || {
            let generator = HttpTextGenerator::new(
                &base_url,
                Secret::new("sk-test".to_string()),
                "test-model",
                timeout,
            )?;
            generator.generate(&chat_request())
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_generator_sends_bearer_and_token_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "test-model", "max_tokens": 64 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Round: 13" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = generate_against(format!("{}/", server.uri()), Duration::from_secs(5)).await;
        assert_eq!(answer.unwrap(), "Round: 13");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "How many frames?");
    }

    #[tokio::test]
    async fn test_http_generator_maps_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let first = generate_against(server.uri(), Duration::from_secs(5)).await;
        assert!(matches!(first, Err(AssistantError::RateLimited)));

        let second = generate_against(server.uri(), Duration::from_secs(5)).await;
        assert!(matches!(second, Err(AssistantError::Authentication(401))));
    }

    #[tokio::test]
    async fn test_http_generator_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "choices": [] }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = generate_against(server.uri(), Duration::from_millis(200)).await;
        assert!(matches!(result, Err(AssistantError::Timeout)));
    }

    #[test]
    fn test_http_generator_connection_failure_is_network() {
        // Grab a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let generator = HttpTextGenerator::new(
            &format!("http://{}", addr),
            Secret::new("sk-test".to_string()),
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap();

        let result = generator.generate(&chat_request());
        assert!(matches!(result, Err(AssistantError::Network(_))));
    }

    #[test]
    fn test_parse_answer_malformed() {
        assert!(matches!(
            parse_answer("not json"),
            Err(AssistantError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_answer(r#"{"choices":[]}"#),
            Err(AssistantError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_answer(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(AssistantError::MalformedResponse(_))
        ));
    }
}
