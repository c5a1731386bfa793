//! Interactive input capability.
//!
//! The connect flow asks for values through [`CredentialPrompter`] so the
//! same control flow runs against a terminal or against canned answers.

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Write};

use crate::providers::ProviderId;

/// One value the connect flow may need to ask for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PromptField {
    KeyType,
    GeminiMode,
    ApiKey(ProviderId),
    ServiceAccountJson,
    ProjectId,
    BillingAccountId,
    BigQueryDatasetId,
    AzureTenantId,
    AzureClientId,
    AzureClientSecret,
}

impl PromptField {
    /// The question shown on the terminal.
    pub fn question(&self) -> String {
        match self {
            PromptField::KeyType => "Key Type (production/developer) [production]: ".to_string(),
            PromptField::GeminiMode => {
                "Gemini/Vertex mode (api_key | service_account): ".to_string()
            }
            PromptField::ApiKey(ProviderId::OpenAi) => "OpenAI API key: ".to_string(),
            PromptField::ApiKey(ProviderId::Claude) => "Anthropic Claude API key: ".to_string(),
            PromptField::ApiKey(ProviderId::Gemini | ProviderId::Gcp) => {
                "Google API key: ".to_string()
            }
            PromptField::ApiKey(other) => format!("{other} API key (optional): "),
            PromptField::ServiceAccountJson => "Paste service account JSON: ".to_string(),
            PromptField::ProjectId => "GCP project_id: ".to_string(),
            PromptField::BillingAccountId => "Billing account id: ".to_string(),
            PromptField::BigQueryDatasetId => {
                "BigQuery dataset id (default billing_export): ".to_string()
            }
            PromptField::AzureTenantId => "Azure tenant id (optional): ".to_string(),
            PromptField::AzureClientId => "Azure client id (optional): ".to_string(),
            PromptField::AzureClientSecret => "Azure client secret (optional): ".to_string(),
        }
    }
}

/// Source of interactively supplied values. Answers are returned trimmed.
pub trait CredentialPrompter {
    fn prompt(&mut self, field: PromptField) -> io::Result<String>;

    fn key_type(&mut self) -> io::Result<String> {
        self.prompt(PromptField::KeyType)
    }

    fn gemini_mode(&mut self) -> io::Result<String> {
        self.prompt(PromptField::GeminiMode)
    }

    fn api_key(&mut self, provider: &ProviderId) -> io::Result<String> {
        self.prompt(PromptField::ApiKey(provider.clone()))
    }

    fn service_account_json(&mut self) -> io::Result<String> {
        self.prompt(PromptField::ServiceAccountJson)
    }

    fn project_id(&mut self) -> io::Result<String> {
        self.prompt(PromptField::ProjectId)
    }

    fn billing_account_id(&mut self) -> io::Result<String> {
        self.prompt(PromptField::BillingAccountId)
    }

    fn bigquery_dataset_id(&mut self) -> io::Result<String> {
        self.prompt(PromptField::BigQueryDatasetId)
    }
}

/// Reads answers line by line from a buffered reader, echoing questions to a writer.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> CredentialPrompter for TerminalPrompter<R, W> {
    fn prompt(&mut self, field: PromptField) -> io::Result<String> {
        write!(self.output, "{}", field.question())?;
        self.output.flush()?;

        let mut line = String::new();
        // EOF reads as an empty answer.
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Prompter answering from a fixed table; records every field it was asked.
#[derive(Debug, Default)]
pub struct CannedPrompter {
    answers: HashMap<PromptField, VecDeque<String>>,
    asked: Vec<PromptField>,
}

impl CannedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an answer for `field`; repeated calls queue further answers.
    pub fn answer(mut self, field: PromptField, value: impl Into<String>) -> Self {
        self.answers
            .entry(field)
            .or_default()
            .push_back(value.into());
        self
    }

    /// Fields asked so far, in order.
    pub fn asked(&self) -> &[PromptField] {
        &self.asked
    }

    pub fn was_asked(&self, field: &PromptField) -> bool {
        self.asked.contains(field)
    }
}

impl CredentialPrompter for CannedPrompter {
    /// Unanswered fields read as blank, like pressing enter.
    fn prompt(&mut self, field: PromptField) -> io::Result<String> {
        let answer = self
            .answers
            .get_mut(&field)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        self.asked.push(field);
        Ok(answer.trim().to_string())
    }
}
