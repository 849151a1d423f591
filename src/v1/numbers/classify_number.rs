#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object, param::Query, ApiResponse };
use log::{debug, error, info};

use crate::utils::classifier::{self, Classification, ParsedNumber};
use crate::utils::server_utils::{self, RequestDebug};
use crate::utils::trivia::TriviaClient;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const INVALID_INPUT_MSG : &str = "Invalid input. Please provide a valid number.";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct ClassifyNumberApi {
    trivia: TriviaClient,
}

struct ReqClassifyNumber
{
    number: Option<String>,
}

#[derive(Object, Debug)]
pub struct RespClassifyNumber
{
    /// Integer when the input is a whole value, otherwise a decimal.
    number: serde_json::Value,
    #[oai(skip_serializing_if_is_none)]
    is_prime: Option<bool>,
    #[oai(skip_serializing_if_is_none)]
    is_perfect: Option<bool>,
    properties: Vec<String>,
    digit_sum: u64,
    fun_fact: String,
}

#[derive(Object, Debug)]
pub struct RespServerError
{
    result_code: String,
    result_msg: String,
}

#[derive(Object, Debug)]
pub struct RespInvalidNumber
{
    /// The input exactly as given, null when absent.
    number: Option<String>,
    error: bool,
    message: String,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqClassifyNumber {
    type Req = ReqClassifyNumber;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  Request parameters:");
        s.push_str("\n    number: ");
        s.push_str(&format!("{:?}", self.number));
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum ClassifyResponse {
    #[oai(status = 200)]
    Http200(Json<RespClassifyNumber>),
    #[oai(status = 400)]
    Http400(Json<RespInvalidNumber>),
    #[oai(status = 500)]
    Http500(Json<RespServerError>),
}

fn make_http_200(resp: RespClassifyNumber) -> ClassifyResponse {
    ClassifyResponse::Http200(Json(resp))
}
fn make_http_400(number: Option<String>) -> ClassifyResponse {
    ClassifyResponse::Http400(Json(RespInvalidNumber::new(number)))
}
fn make_http_500(msg: String) -> ClassifyResponse {
    ClassifyResponse::Http500(Json(RespServerError {result_code: 500.to_string(), result_msg: msg}))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
impl ClassifyNumberApi {
    pub fn new(trivia: TriviaClient) -> Self {
        Self { trivia }
    }
}

#[OpenApi]
impl ClassifyNumberApi {
    #[oai(path = "/classify-number", method = "get")]
    async fn classify_number_api(&self, http_req: &Request, number: Query<Option<String>>) -> ClassifyResponse {
        let req = ReqClassifyNumber { number: number.0 };
        server_utils::debug_request(http_req, &req);

        // -------------------- Validate -----------------------------
        // Nothing leaves this server when the input is bad.  Large integers
        // take seconds to test, so classification runs off the async workers.
        let raw = req.number.clone();
        let classified = tokio::task::spawn_blocking(move || classifier::classify(raw.as_deref())).await;
        let classification = match classified {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => {
                info!("Rejecting classification request: {}", e);
                return make_http_400(req.number);
            }
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                return make_http_500(msg);
            }
        };

        // -------------------- Process Request ----------------------
        debug!("Classified {} as {} with properties {:?}.", classification.number,
               if classification.number.is_integer() {"integer"} else {"decimal"},
               classification.properties);
        let fun_fact = self.trivia.fun_fact(classification.integer_part()).await;
        make_http_200(RespClassifyNumber::new(classification, fun_fact))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespClassifyNumber {
    fn new(c: Classification, fun_fact: String) -> Self {
        Self {
            number: number_value(c.number),
            is_prime: c.is_prime,
            is_perfect: c.is_perfect,
            properties: c.properties,
            digit_sum: c.digit_sum,
            fun_fact,
        }
    }
}

impl RespInvalidNumber {
    fn new(number: Option<String>) -> Self {
        Self {number, error: true, message: INVALID_INPUT_MSG.to_string()}
    }
}

// ---------------------------------------------------------------------------
// number_value:
// ---------------------------------------------------------------------------
// Whole values serialize as json integers, everything else as json decimals.
fn number_value(n: ParsedNumber) -> serde_json::Value {
    match n {
        ParsedNumber::Integer(i) => serde_json::Value::from(i),
        ParsedNumber::Decimal(d) => serde_json::Value::from(d),
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use poem::Route;
    use poem_openapi::OpenApiService;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::utils::trivia::FACT_UNAVAILABLE;

    fn test_client(trivia_url: &str) -> TestClient<Route> {
        let api_service = OpenApiService::new(
            ClassifyNumberApi::new(TriviaClient::new(trivia_url)), "Number Classification Server", "test");
        TestClient::new(Route::new().nest("/api", api_service))
    }

    async fn trivia_server(n: i64, text: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}/math", n)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": text, "number": n})))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    async fn body(resp: poem::test::TestResponse) -> Value {
        resp.0.into_body().into_json().await.unwrap()
    }

    #[tokio::test]
    async fn perfect_number() {
        let server = trivia_server(28, "28 is a perfect number.").await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=28").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body, json!({
            "number": 28,
            "is_prime": false,
            "is_perfect": true,
            "properties": ["perfect", "even"],
            "digit_sum": 10,
            "fun_fact": "28 is a perfect number."
        }));
    }

    #[tokio::test]
    async fn armstrong_number() {
        let server = trivia_server(153, "153 is an Armstrong number.").await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=153").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body["properties"], json!(["armstrong", "odd"]));
        assert_eq!(body["is_prime"], json!(false));
        assert_eq!(body["is_perfect"], json!(false));
        assert_eq!(body["digit_sum"], json!(9));
    }

    #[tokio::test]
    async fn decimal_number() {
        // Trivia is requested for the truncated value.
        let server = trivia_server(7, "7 is the lowest natural number that cannot be represented as the sum of the squares of three integers.").await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=7.5").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body["number"], json!(7.5));
        assert_eq!(body["properties"], json!(["odd"]));
        assert_eq!(body["digit_sum"], json!(7));
        assert!(body.get("is_prime").is_none());
        assert!(body.get("is_perfect").is_none());
    }

    #[tokio::test]
    async fn negative_number() {
        let server = trivia_server(-153, "-153 is a number.").await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=-153").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body["number"], json!(-153));
        assert_eq!(body["properties"], json!(["odd"]));
        assert_eq!(body["digit_sum"], json!(9));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn large_prime_number() {
        let server = trivia_server(2147483647, "2147483647 is a Mersenne prime.").await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=2147483647").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body["is_prime"], json!(true));
        assert_eq!(body["is_perfect"], json!(false));
        assert_eq!(body["properties"], json!(["prime", "odd"]));
        assert_eq!(body["digit_sum"], json!(46));
    }

    #[tokio::test]
    async fn invalid_number() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let cli = test_client(&server.uri());

        let resp = cli.get("/api/classify-number?number=abc").send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(body(resp).await, json!({
            "number": "abc",
            "error": true,
            "message": INVALID_INPUT_MSG
        }));
    }

    #[tokio::test]
    async fn missing_number() {
        let cli = test_client("http://127.0.0.1:1");

        let resp = cli.get("/api/classify-number").send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body = body(resp).await;
        assert_eq!(body["number"], Value::Null);
        assert_eq!(body["error"], json!(true));

        let resp = cli.get("/api/classify-number?number=").send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trivia_failure_keeps_status() {
        let cli = test_client("http://127.0.0.1:1");

        let resp = cli.get("/api/classify-number?number=6").send().await;
        resp.assert_status_is_ok();
        let body = body(resp).await;
        assert_eq!(body["fun_fact"], json!(FACT_UNAVAILABLE));
        assert_eq!(body["properties"], json!(["armstrong", "perfect", "even"]));
    }
}
