//! Connection self-check for the demo.
//!
//! Walks the same checklist a support engineer would: configuration
//! completeness, network reachability of the renderer SDK bundle and
//! gateway, renderer availability, gateway authentication, and LLM
//! endpoint reachability. Every check degrades to a finding, never an
//! error; the caller decides what to do with the list.

use std::fmt;

use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::llm::{ChatSettings, known_base_url};

/// Where the renderer SDK bundle is served from.
pub const DEFAULT_SDK_BUNDLE_URL: &str =
    "https://media.xingyun3d.com/xingyun3d/general/litesdk/xmovAvatar@latest.js";

/// Which subsystem a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Network,
    Auth,
    Sdk,
    Config,
    Llm,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Network => "network",
            Category::Auth => "auth",
            Category::Sdk => "sdk",
            Category::Config => "config",
            Category::Llm => "llm",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Success => "ok",
            Status::Warning => "warn",
            Status::Error => "error",
        };
        f.write_str(name)
    }
}

/// One checklist finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: Category,
    pub status: Status,
    pub message: String,
    pub details: Option<String>,
}

impl Diagnostic {
    fn new(category: Category, status: Status, message: impl Into<String>) -> Self {
        Self {
            category,
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Runs the checklist against the vendor endpoints (overridable for tests).
pub struct DiagnosticService {
    client: Client,
    sdk_bundle_url: String,
    gateway_url: String,
}

impl Default for DiagnosticService {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticService {
    pub fn new() -> Self {
        Self::with_endpoints(
            DEFAULT_SDK_BUNDLE_URL.to_string(),
            crate::avatar::DEFAULT_GATEWAY_SERVER.to_string(),
        )
    }

    pub fn with_endpoints(sdk_bundle_url: String, gateway_url: String) -> Self {
        Self {
            client: Client::new(),
            sdk_bundle_url,
            gateway_url,
        }
    }

    /// Run every applicable check, in checklist order.
    pub async fn diagnose(&self, config: &Config, sdk_available: bool) -> Vec<Diagnostic> {
        let mut results = check_configuration(config);
        results.extend(self.check_network().await);
        results.push(check_sdk(sdk_available));

        if !config.avatar.app_id.is_empty() && !config.avatar.app_secret.is_empty() {
            results.push(
                self.check_authentication(&config.avatar.app_id, &config.avatar.app_secret)
                    .await,
            );
        }
        if !config.llm.model.is_empty()
            && !config.llm.api_key.is_empty()
            && let Some(finding) = self.check_llm(&config.llm).await
        {
            results.push(finding);
        }

        debug!(findings = results.len(), "diagnosis complete");
        results
    }

    /// HEAD the SDK bundle and the gateway; any response at all means the
    /// host is reachable (the gateway answering 401 still counts).
    pub async fn check_network(&self) -> Vec<Diagnostic> {
        let mut results = Vec::new();

        match self.client.head(&self.sdk_bundle_url).send().await {
            Ok(_) => results.push(Diagnostic::new(
                Category::Network,
                Status::Success,
                "renderer SDK bundle is reachable",
            )),
            Err(e) => results.push(
                Diagnostic::new(
                    Category::Network,
                    Status::Error,
                    "cannot reach the renderer SDK bundle, check the network",
                )
                .with_details(e.to_string()),
            ),
        }

        match self.client.head(&self.gateway_url).send().await {
            Ok(_) => results.push(Diagnostic::new(
                Category::Network,
                Status::Success,
                "renderer gateway is reachable",
            )),
            Err(e) => results.push(
                Diagnostic::new(
                    Category::Network,
                    Status::Error,
                    "cannot reach the renderer gateway",
                )
                .with_details(e.to_string()),
            ),
        }

        results
    }

    /// POST the credentials to the gateway. A 401 means the gateway is
    /// fine and the credentials are not; a 400 means their shape is off.
    pub async fn check_authentication(&self, app_id: &str, app_secret: &str) -> Diagnostic {
        let body = serde_json::json!({ "appId": app_id, "appSecret": app_secret });
        match self.client.post(&self.gateway_url).json(&body).send().await {
            Ok(response) => match response.status().as_u16() {
                401 => Diagnostic::new(
                    Category::Auth,
                    Status::Warning,
                    "gateway reachable but rejected the credentials, check app id and secret",
                ),
                400 => Diagnostic::new(
                    Category::Auth,
                    Status::Error,
                    "credential format rejected, check the app id and secret format",
                ),
                _ => Diagnostic::new(
                    Category::Auth,
                    Status::Success,
                    "credential format accepted",
                ),
            },
            Err(e) => Diagnostic::new(
                Category::Auth,
                Status::Error,
                "could not verify the credentials",
            )
            .with_details(e.to_string()),
        }
    }

    /// GET `{base}/models` with bearer auth to probe the LLM endpoint.
    /// A model that matches no known provider (and has no explicit base
    /// URL) is not probed at all.
    pub async fn check_llm(&self, settings: &ChatSettings) -> Option<Diagnostic> {
        let base = match &settings.base_url {
            Some(base) => base.clone(),
            None => known_base_url(&settings.model)?.to_string(),
        };
        let url = format!("{base}/models");

        let finding = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", settings.api_key))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                Diagnostic::new(Category::Llm, Status::Success, "LLM API is reachable")
            }
            Ok(response) if response.status().as_u16() == 401 => Diagnostic::new(
                Category::Llm,
                Status::Error,
                "LLM API key is invalid or expired",
            ),
            Ok(response) => Diagnostic::new(
                Category::Llm,
                Status::Warning,
                format!("LLM API returned status {}", response.status().as_u16()),
            ),
            Err(e) => Diagnostic::new(
                Category::Llm,
                Status::Error,
                "cannot reach the LLM API server",
            )
            .with_details(e.to_string()),
        };

        Some(finding)
    }
}

/// Pure configuration completeness checks.
pub fn check_configuration(config: &Config) -> Vec<Diagnostic> {
    let mut results = Vec::new();

    if config.avatar.app_id.is_empty() {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Error,
            "renderer app id is not configured",
        ));
    } else if config.avatar.app_id.len() < 10 {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Warning,
            "renderer app id looks malformed",
        ));
    } else {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Success,
            "renderer app id is configured",
        ));
    }

    if config.avatar.app_secret.is_empty() {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Error,
            "renderer app secret is not configured",
        ));
    } else if config.avatar.app_secret.len() < 20 {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Warning,
            "renderer app secret looks malformed",
        ));
    } else {
        results.push(Diagnostic::new(
            Category::Config,
            Status::Success,
            "renderer app secret is configured",
        ));
    }

    if config.llm.model.is_empty() {
        results.push(Diagnostic::new(
            Category::Llm,
            Status::Warning,
            "LLM model is not selected, chat will be unavailable",
        ));
    } else {
        results.push(Diagnostic::new(
            Category::Llm,
            Status::Success,
            format!("LLM model selected: {}", config.llm.model),
        ));
    }

    if config.llm.api_key.is_empty() {
        results.push(Diagnostic::new(
            Category::Llm,
            Status::Warning,
            "LLM API key is not configured, chat will be unavailable",
        ));
    } else if config.llm.api_key.len() < 20 {
        results.push(Diagnostic::new(
            Category::Llm,
            Status::Warning,
            "LLM API key looks malformed",
        ));
    } else {
        results.push(Diagnostic::new(
            Category::Llm,
            Status::Success,
            "LLM API key is configured",
        ));
    }

    results
}

/// Renderer capability presence.
pub fn check_sdk(available: bool) -> Diagnostic {
    if available {
        Diagnostic::new(Category::Sdk, Status::Success, "renderer SDK is loaded")
    } else {
        Diagnostic::new(
            Category::Sdk,
            Status::Error,
            "renderer SDK is not loaded, reload the host page",
        )
    }
}

/// Turn findings into actionable advice.
pub fn recommendations(results: &[Diagnostic]) -> Vec<String> {
    let errors: Vec<&Diagnostic> = results.iter().filter(|r| r.status == Status::Error).collect();
    let warnings: Vec<&Diagnostic> = results
        .iter()
        .filter(|r| r.status == Status::Warning)
        .collect();

    let mut lines = Vec::new();

    if !errors.is_empty() {
        lines.push("Severe issues found, fix these first:".to_string());
        for error in &errors {
            let advice = match error.category {
                Category::Config => "fill in the missing renderer credentials in the configuration",
                Category::Network => "check the network connection and outbound access",
                Category::Sdk => "reload the host page so the renderer SDK can load",
                Category::Auth => "fetch the correct credentials from the renderer console",
                Category::Llm => "check that the LLM API key and endpoint are correct",
            };
            lines.push(format!("- {advice}"));
        }
    }

    if !warnings.is_empty() {
        lines.push("Potential issues:".to_string());
        for warning in &warnings {
            lines.push(format!("- {}", warning.message));
        }
    }

    if errors.is_empty() && warnings.is_empty() {
        lines.push("All checks passed.".to_string());
    }

    lines
}
