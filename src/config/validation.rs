use crate::config::types::{AnalysisConfig, Config, CrawlConfig, FetchConfig, NormalizeConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_crawl_config(&config.crawl)?;
    validate_normalize_config(&config.normalize)?;
    validate_analysis_config(&config.analysis)?;
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "fetch.max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.retry_max_delay_ms < config.retry_base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "fetch.retry-max-delay-ms ({}) must be >= fetch.retry-base-delay-ms ({})",
            config.retry_max_delay_ms, config.retry_base_delay_ms
        )));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch timeouts must be greater than zero".to_string(),
        ));
    }

    if config.max_page_bytes == 0 {
        return Err(ConfigError::Validation(
            "fetch.max-page-bytes must be greater than zero".to_string(),
        ));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "fetch.user-agents must contain at least one entry".to_string(),
        ));
    }

    if let Some(agent) = config.user_agents.iter().find(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "fetch.user-agents contains a blank entry: '{}'",
            agent
        )));
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "crawl.concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_total_bytes == 0 {
        return Err(ConfigError::Validation(
            "crawl.max-total-bytes must be greater than zero".to_string(),
        ));
    }

    if config.max_duration_secs == Some(0) {
        return Err(ConfigError::Validation(
            "crawl.max-duration-secs must be greater than zero when set".to_string(),
        ));
    }

    for pattern in &config.exclude_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

fn validate_normalize_config(config: &NormalizeConfig) -> Result<(), ConfigError> {
    if let Some(word) = config
        .extra_stopwords
        .iter()
        .find(|w| w.split_whitespace().count() != 1)
    {
        return Err(ConfigError::Validation(format!(
            "normalize.extra-stopwords entries must be single words, got '{}'",
            word
        )));
    }
    Ok(())
}

fn validate_analysis_config(config: &AnalysisConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.api_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid analysis.api-base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "analysis.api-base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "analysis.model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "analysis.api-key-env cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "analysis.timeout-secs must be greater than zero".to_string(),
        ));
    }

    if config.max_input_tokens == 0 || config.max_output_tokens == 0 {
        return Err(ConfigError::Validation(
            "analysis token budgets must be greater than zero".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "analysis.temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if let Some(schema) = &config.schema {
        let value: serde_json::Value = serde_json::from_str(schema).map_err(|e| {
            ConfigError::Validation(format!("analysis.schema is not valid JSON: {}", e))
        })?;
        if !value.is_object() {
            return Err(ConfigError::Validation(
                "analysis.schema must be a JSON object".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
