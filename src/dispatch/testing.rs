//! In-memory stand-ins for the external clients, recording every call made to them.

use std::sync::{Arc, Mutex};

use url::Url;

use crate::{
    clients::{
        ChangedFile, ChatNotifier, CiServer, ClientError, EventStore, FileContents, FileUpdate,
        HookSpec, IssueInfo, JobTemplate, NewIssue, OrganizationInfo, RepositoryInfo,
        SourceControl,
    },
    config::OrghookConfig,
    dispatch::{Clients, Dispatcher, SecretDetector, SecretMatcher},
};

const CONFIG: &str = r#"
github:
  token: ghp_test
  organization: acme
  push_callback_url: https://ci.example.com/github-webhook/
  roster:
    repository: acme/members
    path: MEMBERS
ci:
  base_url: https://ci.example.com/
chat:
  channel: dev
  token: xoxb-test
database:
  path: ":memory:"
"#;

const TEMPLATE: &str = "<project><name>{{repository}}</name></project>";

pub(crate) fn test_config() -> OrghookConfig {
    serde_yaml::from_str(CONFIG).expect("test config is valid")
}

fn api_error(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        service: "github",
        status,
        message: message.to_owned(),
    }
}

pub(crate) struct FakeSourceControl {
    pub fail_hooks: bool,
    pub fail_contents: bool,
    pub fail_compare: bool,
    /// Someone else rewrites the roster right after it's read
    pub concurrent_edit: bool,
    pub compare_files: Vec<ChangedFile>,
    pub roster: Mutex<(String, String)>,
    pub calls: Mutex<Vec<&'static str>>,
    pub hooks: Mutex<Vec<(String, HookSpec)>>,
    pub writes: Mutex<Vec<FileUpdate>>,
    pub issues: Mutex<Vec<(String, NewIssue)>>,
}

impl Default for FakeSourceControl {
    fn default() -> Self {
        Self {
            fail_hooks: false,
            fail_contents: false,
            fail_compare: false,
            concurrent_edit: false,
            compare_files: Vec::new(),
            roster: Mutex::new((String::new(), Self::INITIAL_SHA.to_owned())),
            calls: Default::default(),
            hooks: Default::default(),
            writes: Default::default(),
            issues: Default::default(),
        }
    }
}

impl FakeSourceControl {
    pub const INITIAL_SHA: &'static str = "3d21ec53a331a6f037a91c368710b99387d012c1";

    pub fn with_roster(content: &str) -> Self {
        Self {
            roster: Mutex::new((content.to_owned(), Self::INITIAL_SHA.to_owned())),
            ..Default::default()
        }
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn hooks(&self) -> Vec<(String, HookSpec)> {
        self.hooks.lock().unwrap().clone()
    }

    /// Writes that were accepted
    pub fn writes(&self) -> Vec<FileUpdate> {
        self.writes.lock().unwrap().clone()
    }

    pub fn issues(&self) -> Vec<(String, NewIssue)> {
        self.issues.lock().unwrap().clone()
    }

    pub fn roster_content(&self) -> String {
        self.roster.lock().unwrap().0.clone()
    }
}

#[rocket::async_trait]
impl SourceControl for FakeSourceControl {
    async fn repository(&self, full_name: &str) -> Result<RepositoryInfo, ClientError> {
        self.record("repository");

        Ok(RepositoryInfo {
            full_name: full_name.to_owned(),
            html_url: Url::parse(&format!("https://github.com/{}", full_name)).unwrap(),
        })
    }

    async fn organization(&self, name: &str) -> Result<OrganizationInfo, ClientError> {
        self.record("organization");

        Ok(OrganizationInfo {
            login: name.to_owned(),
            public_repos: 42,
        })
    }

    async fn create_hook(&self, repo: &RepositoryInfo, hook: &HookSpec) -> Result<(), ClientError> {
        self.record("create_hook");
        if self.fail_hooks {
            return Err(api_error(422, "Hook already exists on this repository"));
        }

        self.hooks
            .lock()
            .unwrap()
            .push((repo.full_name.clone(), hook.clone()));
        Ok(())
    }

    async fn file_contents(
        &self,
        _repo: &str,
        _path: &str,
        _branch: &str,
    ) -> Result<FileContents, ClientError> {
        self.record("file_contents");
        if self.fail_contents {
            return Err(api_error(404, "Not Found"));
        }

        let mut roster = self.roster.lock().unwrap();
        let contents = FileContents {
            content: roster.0.clone(),
            sha: roster.1.clone(),
        };
        if self.concurrent_edit {
            roster.1 = "concurrent-edit-sha".to_owned();
        }

        Ok(contents)
    }

    async fn update_file(
        &self,
        _repo: &str,
        _path: &str,
        update: &FileUpdate,
    ) -> Result<(), ClientError> {
        self.record("update_file");

        let mut roster = self.roster.lock().unwrap();
        if roster.1 != update.sha {
            return Err(ClientError::Conflict(format!(
                "MEMBERS does not match {}",
                update.sha
            )));
        }

        *roster = (update.content.clone(), format!("{}-next", update.sha));
        self.writes.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn compare(
        &self,
        _repo: &RepositoryInfo,
        _base: &str,
        _head: &str,
    ) -> Result<Vec<ChangedFile>, ClientError> {
        self.record("compare");
        if self.fail_compare {
            return Err(api_error(500, "Server Error"));
        }

        Ok(self.compare_files.clone())
    }

    async fn create_issue(
        &self,
        repo: &RepositoryInfo,
        issue: &NewIssue,
    ) -> Result<IssueInfo, ClientError> {
        self.record("create_issue");

        let mut issues = self.issues.lock().unwrap();
        issues.push((repo.full_name.clone(), issue.clone()));
        let number = issues.len() as u64;

        Ok(IssueInfo {
            number,
            html_url: Url::parse(&format!(
                "https://github.com/{}/issues/{}",
                repo.full_name, number
            ))
            .unwrap(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeCi {
    fail: bool,
    jobs: Mutex<Vec<(String, String)>>,
}

impl FakeCi {
    /// Every attempted job creation, failed ones included
    pub fn jobs(&self) -> Vec<(String, String)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[rocket::async_trait]
impl CiServer for FakeCi {
    async fn create_job(&self, name: &str, definition: &str) -> Result<(), ClientError> {
        self.jobs
            .lock()
            .unwrap()
            .push((name.to_owned(), definition.to_owned()));

        if self.fail {
            return Err(ClientError::Api {
                service: "jenkins",
                status: 400,
                message: format!("A job already exists with the name '{}'", name),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeChat {
    messages: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[rocket::async_trait]
impl ChatNotifier for FakeChat {
    async fn notify(&self, text: &str) -> Result<(), ClientError> {
        self.messages.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    records: Mutex<Vec<(i64, String, String)>>,
}

impl FakeStore {
    pub fn records(&self) -> Vec<(i64, String, String)> {
        self.records.lock().unwrap().clone()
    }
}

#[rocket::async_trait]
impl EventStore for FakeStore {
    async fn insert(&self, event_name: &str, event_content: &str) -> Result<i64, ClientError> {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push((id, event_name.to_owned(), event_content.to_owned()));

        Ok(id)
    }
}

/// Wraps the real detector and remembers every patch it was asked about.
pub(crate) struct RecordingMatcher {
    inner: SecretDetector,
    inspected: Mutex<Vec<String>>,
}

impl RecordingMatcher {
    pub fn inspected(&self) -> Vec<String> {
        self.inspected.lock().unwrap().clone()
    }
}

impl SecretMatcher for RecordingMatcher {
    fn matches(&self, patch: &str) -> bool {
        self.inspected.lock().unwrap().push(patch.to_owned());
        self.inner.matches(patch)
    }
}

pub(crate) struct Doubles {
    pub source_control: Arc<FakeSourceControl>,
    pub ci: Arc<FakeCi>,
    pub chat: Arc<FakeChat>,
    pub store: Arc<FakeStore>,
    pub matcher: Arc<RecordingMatcher>,
    chat_enabled: bool,
}

impl Doubles {
    pub fn new() -> Self {
        let config = test_config();

        Self {
            source_control: Default::default(),
            ci: Default::default(),
            chat: Default::default(),
            store: Default::default(),
            matcher: Arc::new(RecordingMatcher {
                inner: SecretDetector::from_config(&config.secret_scan),
                inspected: Default::default(),
            }),
            chat_enabled: true,
        }
    }

    pub fn with_source_control(mut self, source_control: FakeSourceControl) -> Self {
        self.source_control = Arc::new(source_control);
        self
    }

    pub fn failing_ci(mut self) -> Self {
        self.ci = Arc::new(FakeCi {
            fail: true,
            ..Default::default()
        });
        self
    }

    pub fn without_chat(mut self) -> Self {
        self.chat_enabled = false;
        self
    }

    pub fn dispatcher(&self) -> Dispatcher {
        let config = test_config();
        let job_template = JobTemplate::new(TEMPLATE, config.github.organization.clone());

        let chat = if self.chat_enabled {
            Some(self.chat.clone() as Arc<dyn ChatNotifier>)
        } else {
            None
        };
        let clients = Clients {
            source_control: self.source_control.clone(),
            ci: self.ci.clone(),
            chat,
            store: self.store.clone(),
            matcher: self.matcher.clone(),
        };

        Dispatcher::new(config, job_template, clients)
    }

    /// Calls made to any client, the secret matcher aside
    pub fn external_calls(&self) -> usize {
        self.source_control.calls().len()
            + self.ci.jobs().len()
            + self.chat.messages().len()
            + self.store.records().len()
    }
}
