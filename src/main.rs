#![forbid(unsafe_code)]

use anyhow::Result;
use log::info;
use poem::listener::TcpListener;
use poem::middleware::Cors;
use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::OpenApiService;
use structopt::StructOpt;

// Server Utilities
use crate::utils::config::{init_data_dirs, init_log, init_runtime_context, RuntimeCtx, ServerArgs};
use crate::utils::errors::Errors;
use crate::utils::trivia::TriviaClient;
use crate::v1::numbers::classify_number::ClassifyNumberApi;
use crate::v1::numbers::version::VersionApi;

// Modules
mod utils;
mod v1;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME    : &str = "NumClassServer"; // for poem logging
const API_PREFIX     : &str = "/api";
const SERVER_VERSION : &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    // --------------- Initialize Server --------------
    println!("Starting numclass_server!");
    let ctx = server_init()?;

    // --------------- Main Loop Set Up ---------------
    let app = make_app(&ctx);
    let addr = format!("{}{}", "0.0.0.0:", ctx.parms.config.http_port);
    info!("Listening on {}.", addr);

    // ------------------ Main Loop -------------------
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// server_init:
// ---------------------------------------------------------------------------
/** Read the command line, set up the data directories and logging, and load
 * the configuration.  Any failure here stops the server.
 */
fn server_init() -> Result<RuntimeCtx> {
    let args = ServerArgs::from_args();
    let dirs = init_data_dirs(&args)?;
    init_log(&dirs)?;
    info!("Data directories: root={}, logs={}.", dirs.root_dir, dirs.logs_dir);

    let ctx = init_runtime_context(args, dirs)?;
    info!("{}", Errors::InputParms(format!("{:#?}", ctx)));

    print_version_info();
    Ok(ctx)
}

// ---------------------------------------------------------------------------
// make_app:
// ---------------------------------------------------------------------------
/** Assemble the api, its openapi documents and the swagger ui.  Every route
 * accepts cross origin requests from any origin.
 */
fn make_app(ctx: &RuntimeCtx) -> impl Endpoint {
    let config = &ctx.parms.config;
    let server_url = format!("{}:{}{}", config.http_addr, config.http_port, API_PREFIX);

    // The trivia client is shared by all requests.
    let trivia = TriviaClient::new(&config.trivia_url);
    info!("Trivia provider: {}.", trivia.base_url());

    let endpoints = (ClassifyNumberApi::new(trivia), VersionApi);
    let api_service =
        OpenApiService::new(endpoints, config.title.as_str(), SERVER_VERSION).server(server_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let ui = api_service.swagger_ui();

    Route::new()
        .nest(API_PREFIX, api_service)
        .nest("/", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
        .with(Cors::new())
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("\n*** Running NUMCLASS={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}.",
          SERVER_VERSION,
          env!("GIT_BRANCH"),
          env!("GIT_COMMIT_SHORT"),
          env!("GIT_DIRTY"),
          env!("SOURCE_TIMESTAMP"),
          env!("RUSTC_VERSION"));
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::header;
    use poem::test::TestClient;

    use crate::utils::config::{Config, DataDirs, Parms};

    fn test_ctx() -> RuntimeCtx {
        let config = Config { trivia_url: "http://127.0.0.1:1".to_string(), ..Config::new() };
        RuntimeCtx {
            parms: Parms { config_file: String::new(), config },
            args: ServerArgs::default(),
            dirs: DataDirs {
                root_dir: "/tmp/numclass".to_string(),
                config_dir: "/tmp/numclass/config".to_string(),
                logs_dir: "/tmp/numclass/logs".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let cli = TestClient::new(make_app(&test_ctx()));

        let resp = cli.get("/api/classify-number?number=2")
            .header(header::ORIGIN, "http://example.com")
            .send()
            .await;
        resp.assert_status_is_ok();
        assert!(resp.0.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn spec_lists_classify_route() {
        let cli = TestClient::new(make_app(&test_ctx()));

        let resp = cli.get("/spec").send().await;
        resp.assert_status_is_ok();
        let spec = resp.0.into_body().into_string().await.unwrap();
        assert!(spec.contains("/classify-number"));
        assert!(spec.contains("/version"));
    }
}
