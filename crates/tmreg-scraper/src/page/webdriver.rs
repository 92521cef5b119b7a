//! [`Page`] implementation over the W3C WebDriver HTTP protocol.
//!
//! Each [`WebDriverSession`] is one browser session, so pages opened from
//! the same [`WebDriverClient`] never share cookies or navigation state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Page, PageFactory};
use crate::error::PageError;

/// W3C key under which element references are returned.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireFailure {
    error: String,
    #[serde(default)]
    message: String,
}

/// Factory for WebDriver browser sessions.
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    capabilities: Value,
}

impl WebDriverClient {
    /// Creates a client for the WebDriver server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(base_url: &str, headless: bool, request_timeout_secs: u64) -> Result<Self, PageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            capabilities: Self::capabilities(headless),
        })
    }

    fn capabilities(headless: bool) -> Value {
        let mut args = vec!["--disable-gpu", "--window-size=1366,900"];
        if headless {
            args.push("--headless=new");
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": "normal",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl PageFactory for WebDriverClient {
    type Page = WebDriverSession;

    async fn open(&self) -> Result<WebDriverSession, PageError> {
        let url = format!("{}/session", self.base_url);
        let value = send(
            self.client.post(&url).json(&self.capabilities),
            "new session",
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| PageError::UnexpectedResponse {
                context: "new session".to_owned(),
                reason: "response has no sessionId".to_owned(),
            })?;

        tracing::debug!(session_id, "opened WebDriver session");
        Ok(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{session_id}", self.base_url),
        })
    }
}

/// One browser session driven over WebDriver.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    async fn find_all(&self, selector: &str) -> Result<Vec<String>, PageError> {
        let value = send(
            self.client
                .post(format!("{}/elements", self.session_url))
                .json(&json!({ "using": "css selector", "value": selector })),
            "find elements",
        )
        .await?;

        let Value::Array(items) = value else {
            return Err(PageError::UnexpectedResponse {
                context: format!("find elements \"{selector}\""),
                reason: "expected an array of element references".to_owned(),
            });
        };
        items.iter().map(|item| element_id(item, selector)).collect()
    }

    async fn find(&self, selector: &str) -> Result<String, PageError> {
        let result = send(
            self.client
                .post(format!("{}/element", self.session_url))
                .json(&json!({ "using": "css selector", "value": selector })),
            "find element",
        )
        .await;

        match result {
            Ok(value) => element_id(&value, selector),
            Err(PageError::Engine { error, .. }) if error == "no such element" => {
                Err(PageError::ElementNotFound {
                    selector: selector.to_owned(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn element_url(&self, element: &str, suffix: &str) -> String {
        format!("{}/element/{element}/{suffix}", self.session_url)
    }
}

#[async_trait]
impl Page for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        send(
            self.client
                .post(format!("{}/url", self.session_url))
                .json(&json!({ "url": url })),
            "navigate",
        )
        .await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let value = send(
            self.client.get(format!("{}/url", self.session_url)),
            "current url",
        )
        .await?;
        as_string(value, "current url")
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        Ok(!self.find_all(selector).await?.is_empty())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        send(
            self.client
                .post(self.element_url(&element, "click"))
                .json(&json!({})),
            "click",
        )
        .await?;
        Ok(())
    }

    async fn press_keys(&self, selector: &str, keys: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        send(
            self.client
                .post(self.element_url(&element, "value"))
                .json(&json!({ "text": keys })),
            "send keys",
        )
        .await?;
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, PageError> {
        let Some(element) = self.find_all(selector).await?.into_iter().next() else {
            return Ok(None);
        };
        let value = send(
            self.client.get(self.element_url(&element, "text")),
            "element text",
        )
        .await?;
        as_string(value, "element text").map(Some)
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError> {
        let Some(element) = self.find_all(selector).await?.into_iter().next() else {
            return Ok(None);
        };
        let value = send(
            self.client
                .get(self.element_url(&element, &format!("attribute/{name}"))),
            "element attribute",
        )
        .await?;
        match value {
            Value::Null => Ok(None),
            other => as_string(other, "element attribute").map(Some),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        send(
            self.client
                .post(format!("{}/execute/sync", self.session_url))
                .json(&json!({ "script": script, "args": [] })),
            "execute script",
        )
        .await
    }

    async fn close(&self) -> Result<(), PageError> {
        send(self.client.delete(&self.session_url), "delete session").await?;
        Ok(())
    }
}

/// Sends a WebDriver command and unwraps the `{"value": ...}` envelope,
/// mapping error envelopes to [`PageError::Engine`].
async fn send(request: RequestBuilder, context: &str) -> Result<Value, PageError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    let envelope = serde_json::from_str::<Envelope>(&body).map_err(|e| PageError::Deserialize {
        context: context.to_owned(),
        source: e,
    })?;

    if status.is_success() {
        return Ok(envelope.value);
    }

    let failure =
        serde_json::from_value::<WireFailure>(envelope.value).map_err(|e| PageError::Deserialize {
            context: format!("{context} error (HTTP {})", status.as_u16()),
            source: e,
        })?;
    Err(PageError::Engine {
        error: failure.error,
        message: failure.message,
    })
}

fn element_id(value: &Value, selector: &str) -> Result<String, PageError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| PageError::UnexpectedResponse {
            context: format!("element reference for \"{selector}\""),
            reason: format!("missing \"{ELEMENT_KEY}\""),
        })
}

fn as_string(value: Value, context: &str) -> Result<String, PageError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(PageError::UnexpectedResponse {
            context: context.to_owned(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}
