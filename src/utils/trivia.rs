#![forbid(unsafe_code)]

use log::{debug, warn};
use serde::Deserialize;

use crate::utils::errors::TriviaError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const DEFAULT_TRIVIA_URL : &str = "http://numbersapi.com";
pub const NO_FACT_AVAILABLE  : &str = "No fact available";
pub const FACT_UNAVAILABLE   : &str = "Could not fetch a fun fact";

// ***************************************************************************
//                               Trivia Structs
// ***************************************************************************
// The subset of the provider's json response that we use.
#[derive(Debug, Deserialize)]
struct TriviaBody {
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// TriviaClient:
// ---------------------------------------------------------------------------
/** Client for the numbers trivia provider.  The underlying reqwest client
 * pools connections, so one instance is created at startup and cloned into
 * each endpoint that needs it.
 */
#[derive(Debug, Clone)]
pub struct TriviaClient {
    client: reqwest::Client,
    base_url: String,
}

impl TriviaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // fact_url:
    // -----------------------------------------------------------------------
    /** The provider url for a math fact about n in json format. */
    pub fn fact_url(&self, n: i64) -> String {
        format!("{}/{}/math?json", self.base_url, n)
    }

    // -----------------------------------------------------------------------
    // fetch:
    // -----------------------------------------------------------------------
    /** Issue a single request for a math fact about n.  A successful response
     * without a text field yields the no-fact string rather than an error.
     */
    pub async fn fetch(&self, n: i64) -> Result<String, TriviaError> {
        let url = self.fact_url(n);
        debug!("Requesting trivia from {}", url);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TriviaError::Status(status.as_u16()));
        }

        let parsed = match resp.json::<TriviaBody>().await {
            Ok(b) => b,
            Err(e) => return Err(TriviaError::Decode(e.to_string())),
        };
        Ok(parsed.text.unwrap_or_else(|| NO_FACT_AVAILABLE.to_string()))
    }

    // -----------------------------------------------------------------------
    // fun_fact:
    // -----------------------------------------------------------------------
    /** Fetch a fact, substituting the fallback string on any failure. */
    pub async fn fun_fact(&self, n: i64) -> String {
        match self.fetch(n).await {
            Ok(fact) => fact,
            Err(e) => {
                warn!("Unable to retrieve fun fact for {}: {}", n, e);
                FACT_UNAVAILABLE.to_string()
            }
        }
    }
}

impl Default for TriviaClient {
    fn default() -> Self {
        Self::new(DEFAULT_TRIVIA_URL)
    }
}
