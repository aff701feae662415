//! Turns a backend movement into one spoken sentence
//!
//! Uses an `OpenAI`-compatible chat completion. The narrator never fails:
//! missing data and provider errors map to fixed apology phrases so the
//! piggy bank always says something.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Spoken when the backend returned nothing
pub const NO_DATA_PHRASE: &str = "Lo siento, no pude conectar con tu alcancía.";

/// Spoken when the chat provider fails
pub const ERROR_PHRASE: &str = "Hubo un error técnico.";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default completion budget; replies are a single sentence
pub const DEFAULT_MAX_TOKENS: u32 = 80;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Writes the piggy bank's reply
#[derive(Debug, Clone)]
pub struct Narrator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl Narrator {
    /// Create a narrator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be
    /// built
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for the narrator".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: OPENAI_CHAT_URL.to_string(),
            model,
            max_tokens,
        })
    }

    /// Point at a different chat endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Phrase describing `movement`, or an apology
    pub async fn narrate(&self, movement: Option<&Value>) -> String {
        let Some(movement) = movement.filter(|m| has_data(m)) else {
            return NO_DATA_PHRASE.to_string();
        };

        match self.complete(&build_prompt(movement)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "narration failed");
                ERROR_PHRASE.to_string()
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Narrator(format!("chat error {status}: {body}")));
        }

        let body: ChatResponse = response.json().await?;
        first_reply(body)
    }
}

fn first_reply(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| Error::Narrator("empty completion".to_string()))
}

/// Whether the backend gave us anything worth narrating
fn has_data(movement: &Value) -> bool {
    match movement {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Prompt for narrating one movement
#[must_use]
pub fn build_prompt(movement: &Value) -> String {
    format!(
        "Eres el 'Chanchito', una alcancía mágica peruana que habla con un niño.\n\
         Dato del último movimiento: {movement}\n\
         \n\
         Reglas para tu voz:\n\
         1. Los montos son SOLES peruanos.\n\
         2. Nunca leas decimales como \"1.50 soles\": di \"un sol con cincuenta céntimos\".\n\
         3. Responde con una sola frase corta.\n\
         4. Si es un ingreso, celébralo; si es un gasto, solo infórmalo.\n\
         5. No menciones cuentas, ids ni datos técnicos.\n\
         \n\
         Ejemplo: \"¡Oink! Tu último movimiento fue un gasto de diez soles con noventa céntimos en helados.\""
    )
}
