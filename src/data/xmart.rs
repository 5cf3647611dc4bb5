//! WIISE xMart OData client.
//!
//! Authentication uses the Azure AD client-credentials flow; the resulting
//! bearer token is attached to every OData request.

use std::path::Path;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::pager::{JsonRecord, Pages, RecordSource, Response, collect_table};
use crate::error::{PipelineError, Result};
use crate::io::export::write_table_csv;

pub const DEFAULT_BASE_URL: &str = "https://extranet.who.int/xmart-api/odata/WIISE/";
const TOKEN_URL: &str = "https://login.microsoftonline.com";

pub struct XmartClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ODataPage {
    value: Vec<JsonRecord>,
}

fn env_var(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| PipelineError::Credentials(name))
}

impl XmartClient {
    /// Build a client from `AUTHN_*` variables (a `.env` file is honored).
    pub fn from_env(base_url: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        let app = env_var("AUTHN_APP")?;
        let password = env_var("AUTHN_PASSWORD")?;
        let resource = env_var("AUTHN_RESOURCE")?;
        let tenant = env_var("AUTHN_TENANT")?;

        let client = Client::new();
        let scope = format!("{resource}/.default");
        let resp = client
            .post(format!("{TOKEN_URL}/{tenant}/oauth2/v2.0/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", app.as_str()),
                ("client_secret", password.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()?;
        if !resp.status().is_success() {
            return Err(PipelineError::RemoteStatus {
                path: "oauth2/v2.0/token".to_string(),
                status: resp.status().as_u16(),
            });
        }
        let token: TokenResponse = resp.json()?;
        info!("acquired xMart access token");

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token: token.access_token,
        })
    }
}

impl RecordSource for XmartClient {
    fn get(&self, path: &str) -> Result<Response> {
        debug!(path, "xMart request");
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()?;
        if !resp.status().is_success() {
            return Ok(Response::Status(resp.status().as_u16()));
        }
        let page: ODataPage = resp.json()?;
        Ok(Response::Page(page.value))
    }
}

/// What to pull from the remote source.
#[derive(Debug, Clone)]
pub struct ExtractPlan {
    pub tables: Vec<String>,
    pub years: Vec<i32>,
    pub page_size: usize,
}

/// Pull every `(year, table)` partition and write non-empty ones as
/// `{table}_{year}.csv` under `data_dir`. Returns the number of files written.
///
/// Processing is sequential and stops at the first failure; the failing
/// partition is never written.
pub fn extract_partitions<S: RecordSource + ?Sized>(source: &S, plan: &ExtractPlan, data_dir: &Path) -> Result<usize> {
    let mut written = 0;
    for &year in &plan.years {
        for table_name in &plan.tables {
            let table = collect_table(Pages::new(source, table_name, year, plan.page_size))?;
            if table.is_empty() {
                warn!(table = %table_name, year, "no records");
                continue;
            }
            let path = data_dir.join(format!("{table_name}_{year}.csv"));
            write_table_csv(&path, &table)?;
            info!(path = %path.display(), rows = table.len(), "wrote partition");
            written += 1;
        }
    }
    Ok(written)
}
