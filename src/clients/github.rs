use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{
    header::{ACCEPT, USER_AGENT},
    Method, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::clients::{
    ChangedFile, ClientError, FileContents, FileUpdate, HookSpec, IssueInfo, NewIssue,
    OrganizationInfo, RepositoryInfo, SourceControl,
};

const SERVICE: &str = "github";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST v3 client authenticated with a single token.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(mut api_url: Url, token: String) -> Result<Self, ClientError> {
        // relative joins would drop the last segment otherwise
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.api_url
            .join(path)
            .map_err(|e| ClientError::Decode(format!("invalid API path `{}`: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.endpoint(path)?;
        trace!("{} {}", method, url);

        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("orghook/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(error_for(status, message));
        }

        Ok(response.json::<T>().await?)
    }
}

/// A 409 means the sha guarding a write was stale.
fn error_for(status: StatusCode, message: String) -> ClientError {
    if status == StatusCode::CONFLICT {
        ClientError::Conflict(message)
    } else {
        ClientError::Api {
            service: SERVICE,
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Serialize)]
struct UpdateContentsRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Deserialize)]
struct Comparison {
    #[serde(default)]
    files: Vec<ChangedFile>,
}

/// GitHub wraps base64 content every 60 characters.
fn decode_content(encoded: &str) -> Result<String, ClientError> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[rocket::async_trait]
impl SourceControl for GitHubClient {
    async fn repository(&self, full_name: &str) -> Result<RepositoryInfo, ClientError> {
        let request = self.request(Method::GET, &format!("repos/{}", full_name))?;
        self.send(request).await
    }

    async fn organization(&self, name: &str) -> Result<OrganizationInfo, ClientError> {
        let request = self.request(Method::GET, &format!("orgs/{}", name))?;
        self.send(request).await
    }

    async fn create_hook(&self, repo: &RepositoryInfo, hook: &HookSpec) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &format!("repos/{}/hooks", repo.full_name))?
            .json(hook);
        self.send::<IgnoredAny>(request).await?;

        debug!("registered push hook on {}", repo.full_name);
        Ok(())
    }

    async fn file_contents(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<FileContents, ClientError> {
        let request = self
            .request(Method::GET, &format!("repos/{}/contents/{}", repo, path))?
            .query(&[("ref", branch)]);
        let ContentsResponse { content, sha } = self.send(request).await?;

        Ok(FileContents {
            content: decode_content(&content)?,
            sha,
        })
    }

    async fn update_file(
        &self,
        repo: &str,
        path: &str,
        update: &FileUpdate,
    ) -> Result<(), ClientError> {
        let body = UpdateContentsRequest {
            message: &update.message,
            content: STANDARD.encode(&update.content),
            sha: &update.sha,
            branch: &update.branch,
        };
        let request = self
            .request(Method::PUT, &format!("repos/{}/contents/{}", repo, path))?
            .json(&body);
        self.send::<IgnoredAny>(request).await?;

        Ok(())
    }

    async fn compare(
        &self,
        repo: &RepositoryInfo,
        base: &str,
        head: &str,
    ) -> Result<Vec<ChangedFile>, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("repos/{}/compare/{}...{}", repo.full_name, base, head),
        )?;
        let comparison: Comparison = self.send(request).await?;

        Ok(comparison.files)
    }

    async fn create_issue(
        &self,
        repo: &RepositoryInfo,
        issue: &NewIssue,
    ) -> Result<IssueInfo, ClientError> {
        let request = self
            .request(Method::POST, &format!("repos/{}/issues", repo.full_name))?
            .json(issue);
        self.send(request).await
    }
}
