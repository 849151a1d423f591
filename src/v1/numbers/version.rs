#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

// From cargo.toml.
const SERVER_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion
{
    result_code: String,
    result_msg: String,
    server_version: String,
    git_branch: String,
    git_commit: String,
    git_dirty: String,
    source_ts: String,
    rustc_version: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion::process())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespVersion {
    fn process() -> RespVersion {
        Self {
            result_code: "0".to_string(),
            result_msg: "success".to_string(),
            server_version: SERVER_VERSION.unwrap_or("unknown").to_string(),
            git_branch: env!("GIT_BRANCH").to_string(),
            git_commit: env!("GIT_COMMIT_SHORT").to_string(),
            git_dirty: env!("GIT_DIRTY").to_string(),
            source_ts: env!("SOURCE_TIMESTAMP").to_string(),
            rustc_version: env!("RUSTC_VERSION").to_string(),
        }
    }
}
