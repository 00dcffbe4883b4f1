//! OpenAI-compatible chat completions over blocking HTTP
//!
//! Works against any server exposing `POST {host}/chat/completions` (OpenAI,
//! Ollama, llama.cpp, vLLM). Streaming responses are read line by line as
//! server-sent events.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use super::{CompletionService, Fragments, Generation, Message};

/// Request body for /chat/completions
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    stream: bool,
}

/// One server-sent event payload of a streaming response
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Non-streaming response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

pub struct OpenAiClient {
    agent: ureq::Agent,
    host: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(host: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            host: host.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.host)
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, messages: &[Message], generation: &Generation) -> Result<Fragments> {
        let request = ChatRequest {
            model: &generation.model,
            messages,
            temperature: generation.temperature,
            top_p: generation.top_p,
            stream: generation.stream,
        };
        let request_body = serde_json::to_string(&request).context("Failed to serialize request")?;

        log::info!(
            "Requesting completion from {} (model={}, messages={}, stream={})",
            self.url(),
            generation.model,
            messages.len(),
            generation.stream
        );

        let mut builder = self
            .agent
            .post(&self.url())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", &format!("Bearer {}", key));
        }

        let mut response = builder
            .send(request_body.as_bytes())
            .context("Failed to call completion API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            eyre::bail!("Completion API returned {}: {}", status, api_error_message(&body));
        }

        if generation.stream {
            let reader = BufReader::new(response.into_body().into_reader());
            Ok(Box::new(SseFragments::new(reader)))
        } else {
            let body = response
                .body_mut()
                .read_to_string()
                .context("Failed to read response")?;
            let text = parse_response(&body)?;
            Ok(Box::new(std::iter::once(Ok::<String, eyre::Report>(text))))
        }
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).context("Failed to parse completion response")?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| eyre::eyre!("Completion response has no choices"))?;
    Ok(choice.message.content.unwrap_or_default())
}

/// Fragments decoded from a server-sent event stream
///
/// Ends at `data: [DONE]` or end of input. The first read or decode error is
/// yielded once and the sequence stops.
pub struct SseFragments<R> {
    lines: Lines<R>,
    finished: bool,
}

impl<R: BufRead> SseFragments<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
        }
    }

    fn fail(&mut self, err: eyre::Report) -> Option<Result<String>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(eyre::Report::new(e).wrap_err("Failed to read completion stream")),
                None => {
                    self.finished = true;
                    break;
                }
            };

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.finished = true;
                break;
            }

            let chunk: StreamChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(eyre::Report::new(e).wrap_err("Failed to parse stream chunk")),
            };
            if let Some(error) = chunk.error {
                return self.fail(eyre::eyre!("Completion API error: {}", error.message));
            }

            let text: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if !text.is_empty() {
                return Some(Ok(text));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
        )
    }

    fn collect(input: &str) -> Vec<Result<String>> {
        SseFragments::new(Cursor::new(input.as_bytes().to_vec())).collect()
    }

    #[test]
    fn test_stream_yields_fragments_until_done() {
        let input = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\"}}}}]}}\n\n{}{}{}data: [DONE]\n\n{}",
            chunk("Hel"),
            chunk("lo"),
            chunk("!"),
            chunk("ignored")
        );
        let fragments: Vec<String> = collect(&input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec!["Hel", "lo", "!"]);
    }

    #[test]
    fn test_stream_skips_comments_and_null_content() {
        let input = format!(
            ": keep-alive\n\ndata: {{\"choices\":[{{\"delta\":{{\"content\":null}}}}]}}\n\n{}",
            chunk("ok")
        );
        let fragments: Vec<String> = collect(&input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec!["ok"]);
    }

    #[test]
    fn test_stream_without_done_ends_cleanly() {
        let fragments = collect(&chunk("partial"));
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "partial");
    }

    #[test]
    fn test_stream_error_terminates() {
        let input = format!("{}data: {{not json\n\n{}", chunk("Hel"), chunk("lo"));
        let fragments = collect(&input);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].as_ref().unwrap(), "Hel");
        assert!(fragments[1].is_err());
    }

    #[test]
    fn test_stream_api_error_event() {
        let input = "data: {\"error\":{\"message\":\"rate limited\"}}\n\n";
        let fragments = collect(input);
        assert_eq!(fragments.len(), 1);
        let err = fragments[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"ls -la"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "ls -la");
        assert!(parse_response(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error_message(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_request_body() {
        let messages = vec![Message::system("Be brief."), Message::user("hi\nanswer:")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            top_p: 1.0,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi\nanswer:");
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_host_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:11434/v1/", None, Duration::from_secs(5));
        assert_eq!(client.url(), "http://localhost:11434/v1/chat/completions");
    }
}
