//! Ticket → test cases → helper search → code → files.
//!
//! Each stage runs only after the previous one succeeded, and nothing is
//! written to disk until every remote call has returned.


use std::path::PathBuf;
use tracing::{debug, info};

use crate::chat::{
    ChatCompletionService, ChatEntry, ChatHistory, SamplingParams, system_message_from_file,
};
use crate::config::{Config, RequiredServices};
use crate::deployments::SystemMessage;
use crate::embeddings::EmbeddingGenerator;
use crate::jira::{JiraClient, TicketSource};
use crate::openai::AzureOpenAiClient;
use crate::output::{GeneratedOutput, write_output};
use crate::search::{AzureSearchClient, HelperSearch, HybridSearchClient};
use crate::{Result, TestGenError};

/// Per-invocation choices layered over the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub ticket: String,
    /// Ticket field to read instead of `jira.field`
    pub field: Option<String>,
    /// Deployment used for code generation instead of `openai.code_model`
    pub model: Option<String>,
    pub output_folder: Option<PathBuf>,
    /// Number of helper methods to retrieve instead of `search.top_results`
    pub helper_methods: Option<usize>,
    pub no_test_cases: bool,
    pub no_code: bool,
    pub split: bool,
}

impl RunOptions {
    #[inline]
    pub fn new(ticket: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub const fn required_services(&self) -> RequiredServices {
        RequiredServices {
            chat: true,
            search: !self.no_code,
        }
    }
}

pub struct Pipeline {
    config: Config,
    tickets: Box<dyn TicketSource>,
    chat: Box<dyn ChatCompletionService>,
    search: Option<Box<dyn HelperSearch>>,
}

impl Pipeline {
    #[inline]
    pub fn new(
        config: Config,
        tickets: Box<dyn TicketSource>,
        chat: Box<dyn ChatCompletionService>,
        search: Option<Box<dyn HelperSearch>>,
    ) -> Self {
        Self {
            config,
            tickets,
            chat,
            search,
        }
    }

    /// Build the Azure and JIRA clients a run with `options` needs
    #[inline]
    pub fn from_config(config: Config, options: &RunOptions) -> Result<Self> {
        let services = options.required_services();
        config.require_credentials(services)?;

        let tickets = JiraClient::new(&config.jira)?;
        let openai = AzureOpenAiClient::new(&config.openai)?;

        let search: Option<Box<dyn HelperSearch>> = if services.search {
            let generator = EmbeddingGenerator::from_config(openai.clone(), &config.openai)?;
            let index = AzureSearchClient::new(&config.search)?;
            Some(Box::new(HybridSearchClient::from_config(
                generator,
                index,
                &config.openai,
                &config.search,
            )))
        } else {
            None
        };

        Ok(Self::new(
            config,
            Box::new(tickets),
            Box::new(openai),
            search,
        ))
    }

    #[inline]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage for `options.ticket` and return the files written
    #[inline]
    pub fn run(&self, options: &RunOptions) -> Result<Vec<PathBuf>> {
        let ticket = options.ticket.trim();
        if ticket.is_empty() {
            return Err(TestGenError::InvalidInput(
                "ticket id cannot be empty".to_string(),
            ));
        }

        let field = options.field.as_deref().unwrap_or(&self.config.jira.field);
        let ticket_info = self.tickets.fetch(ticket, field)?;

        let test_cases = if options.no_test_cases {
            info!("Skipping test case generation.");
            None
        } else {
            Some(self.generate_test_cases(&ticket_info)?)
        };

        let code = if options.no_code {
            info!("Skipping code generation.");
            None
        } else {
            let cases = test_cases.as_deref().unwrap_or(&ticket_info);
            let top_results = options
                .helper_methods
                .unwrap_or(self.config.search.top_results);
            let helper_methods = self.search_for_helper_methods(cases, top_results)?;
            Some(self.generate_code(cases, &helper_methods, options.model.as_deref())?)
        };

        let output_dir = options
            .output_folder
            .as_ref()
            .unwrap_or(&self.config.generation.output_folder);

        write_output(
            output_dir,
            &GeneratedOutput {
                ticket: ticket.to_string(),
                ticket_info,
                test_cases,
                code,
            },
            options.split,
        )
    }

    fn system_message(&self, message: SystemMessage) -> Result<ChatEntry> {
        system_message_from_file(&message.path_in(&self.config.generation.system_messages_dir))
    }

    fn generate_test_cases(&self, ticket_info: &str) -> Result<String> {
        let model = &self.config.openai.test_case_model;
        let history = ChatHistory::new()
            .with(self.system_message(SystemMessage::Qa)?)
            .with(ChatEntry::user(ticket_info));

        info!("Generating test cases with model '{}'...", model);
        debug!("Chat history for test cases: {:?}", history);

        let test_cases = self
            .chat
            .complete(model, &history, SamplingParams::default())?;

        debug!("Chat completions response:\n{}\n", test_cases);
        info!("Test case generation complete.");
        Ok(test_cases)
    }

    fn search_for_helper_methods(&self, test_cases: &str, top_results: usize) -> Result<String> {
        let search = self.search.as_ref().ok_or_else(|| {
            TestGenError::InvalidInput("helper search is not configured".to_string())
        })?;

        info!("Searching for the top {} helper methods...", top_results);

        let helper_methods = search
            .search(test_cases, top_results)?
            .into_iter()
            .flat_map(|result| {
                let (name, description, code) = result.into_tuple();
                [name, description, code]
            })
            .collect::<Vec<_>>()
            .join("\n");

        debug!("Search response:\n{}", helper_methods);
        info!("Search complete.");
        Ok(helper_methods)
    }

    fn generate_code(
        &self,
        test_cases: &str,
        helper_methods: &str,
        model_override: Option<&str>,
    ) -> Result<String> {
        let model = model_override.unwrap_or(&self.config.openai.code_model);
        let profile = self.config.generation.dev_message;
        let request = code_request(test_cases, helper_methods);

        let history = ChatHistory::new()
            .with(self.system_message(profile.system_message())?)
            .with(ChatEntry::user(request));

        info!("Generating code with model '{}'...", model);
        debug!("Chat history for code ({profile}): {:?}", history);

        let code = self
            .chat
            .complete(model, &history, SamplingParams::PRECISE)?;

        debug!("Chat completions response:\n{}\n", code);
        info!("Code generation complete.");
        Ok(code)
    }
}

/// User message asking for code that implements `test_cases`
#[inline]
pub fn code_request(test_cases: &str, helper_methods: &str) -> String {
    format!(
        "Generate code for the test cases.\nTest Cases: {test_cases}\nHelper Methods: {helper_methods}"
    )
}
