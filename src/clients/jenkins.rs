use std::{fs, path::Path};

use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

use crate::clients::{CiServer, ClientError};

const SERVICE: &str = "jenkins";
const REPOSITORY_PLACEHOLDER: &str = "{{repository}}";
const ORGANIZATION_PLACEHOLDER: &str = "{{organization}}";

const DEFAULT_TEMPLATE: &str = r#"<?xml version='1.1' encoding='UTF-8'?>
<flow-definition plugin="workflow-job">
  <description>Pipeline for {{organization}}/{{repository}}, created by orghook</description>
  <keepDependencies>false</keepDependencies>
  <properties>
    <com.coravy.hudson.plugins.github.GithubProjectProperty plugin="github">
      <projectUrl>https://github.com/{{organization}}/{{repository}}/</projectUrl>
    </com.coravy.hudson.plugins.github.GithubProjectProperty>
    <org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>
      <triggers>
        <com.cloudbees.jenkins.GitHubPushTrigger plugin="github">
          <spec></spec>
        </com.cloudbees.jenkins.GitHubPushTrigger>
      </triggers>
    </org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>
  </properties>
  <definition class="org.jenkinsci.plugins.workflow.cps.CpsScmFlowDefinition" plugin="workflow-cps">
    <scm class="hudson.plugins.git.GitSCM" plugin="git">
      <userRemoteConfigs>
        <hudson.plugins.git.UserRemoteConfig>
          <url>https://github.com/{{organization}}/{{repository}}.git</url>
        </hudson.plugins.git.UserRemoteConfig>
      </userRemoteConfigs>
      <branches>
        <hudson.plugins.git.BranchSpec>
          <name>*/main</name>
        </hudson.plugins.git.BranchSpec>
      </branches>
    </scm>
    <scriptPath>Jenkinsfile</scriptPath>
    <lightweight>true</lightweight>
  </definition>
  <disabled>false</disabled>
</flow-definition>
"#;

/// Job definition document with `{{repository}}` and `{{organization}}` placeholders.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    template: String,
    organization: String,
}

impl JobTemplate {
    pub fn new(template: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            organization: organization.into(),
        }
    }

    /// Reads the template at `path`, or falls back to the built-in pipeline definition.
    pub fn load(path: Option<&Path>, organization: &str) -> anyhow::Result<Self> {
        let template = match path {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("couldn't read job template {}", path.display()))?,
            None => DEFAULT_TEMPLATE.to_owned(),
        };

        Ok(Self::new(template, organization))
    }

    pub fn render(&self, repository: &str) -> String {
        self.template
            .replace(REPOSITORY_PLACEHOLDER, repository)
            .replace(ORGANIZATION_PLACEHOLDER, &self.organization)
    }
}

pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl JenkinsClient {
    pub fn new(
        mut base_url: Url,
        username: Option<String>,
        api_token: Option<String>,
    ) -> Result<Self, ClientError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let credentials = match (username, api_token) {
            (Some(username), Some(token)) => Some((username, token)),
            _ => None,
        };

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url,
            credentials,
        })
    }

    fn create_item_url(&self, name: &str) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join("createItem")
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        url.query_pairs_mut().append_pair("name", name);

        Ok(url)
    }
}

#[rocket::async_trait]
impl CiServer for JenkinsClient {
    async fn create_job(&self, name: &str, definition: &str) -> Result<(), ClientError> {
        let url = self.create_item_url(name)?;
        trace!("POST {}", url);

        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(definition.to_owned());
        if let Some((username, token)) = &self.credentials {
            request = request.basic_auth(username, Some(token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        debug!("created jenkins job {}", name);
        Ok(())
    }
}
