use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Raw settings read from the process environment.
///
/// Every webhook is optional: when a value is missing it falls back to a path
/// under `N8N_URL`, and relative values are resolved against that base too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub n8n_url: Option<String>,

    pub webhook_companies_list: Option<String>,
    pub webhook_companies_listone: Option<String>,
    pub webhook_companies_create: Option<String>,
    pub webhook_companies_update: Option<String>,
    pub webhook_companies_delete: Option<String>,

    pub webhook_companies_connections_list: Option<String>,
    pub webhook_companies_connections_create: Option<String>,
    pub webhook_companies_connections_update: Option<String>,
    pub webhook_companies_connections_delete: Option<String>,

    pub webhook_connections_list: Option<String>,
    pub webhook_connections_create: Option<String>,
    pub webhook_connections_connect: Option<String>,
    pub webhook_connections_state: Option<String>,
    pub webhook_connections_remove: Option<String>,

    pub webhook_validation_list: Option<String>,
    pub webhook_validation_save: Option<String>,
    pub webhook_validation_delete: Option<String>,
    pub webhook_validation: Option<String>,

    pub webhook_template_list: Option<String>,
    pub webhook_template_create: Option<String>,
    pub webhook_template_update: Option<String>,
    pub webhook_template_delete: Option<String>,
    pub webhook_template_send: Option<String>,

    pub webhook_business_templates: Option<String>,

    pub webhook_users_list: Option<String>,
    pub webhook_users_create: Option<String>,
    pub webhook_users_update: Option<String>,
    pub webhook_users_delete: Option<String>,
    pub webhook_users_reset_password: Option<String>,

    pub webhook_auth_login: Option<String>,
    pub webhook_auth_logout: Option<String>,
    pub webhook_auth_verify: Option<String>,

    pub session_file: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_max_attempts: Option<u32>,
    pub connect_base_delay_ms: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Settings pointing every webhook at its default path under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            n8n_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if let Some(attempts) = self.connect_max_attempts {
            if attempts == 0 || attempts > 10 {
                return Err(config::ConfigError::Message(
                    "CONNECT_MAX_ATTEMPTS must be between 1 and 10".to_string(),
                ));
            }
        }

        if let Some(timeout) = self.request_timeout_secs {
            if timeout == 0 {
                return Err(config::ConfigError::Message(
                    "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
        }

        // Resolving surfaces missing base URLs and malformed endpoints early.
        Endpoints::resolve(self)?;

        Ok(())
    }

    pub fn effective_request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }

    pub fn effective_connect_max_attempts(&self) -> u32 {
        self.connect_max_attempts.unwrap_or(3)
    }

    pub fn effective_connect_base_delay(&self) -> Duration {
        Duration::from_millis(self.connect_base_delay_ms.unwrap_or(1000))
    }

    pub fn effective_session_file(&self) -> String {
        self.session_file
            .clone()
            .unwrap_or_else(|| ".leadhub-session.json".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CompanyEndpoints {
    pub list: String,
    pub list_one: String,
    pub create: String,
    pub update: String,
    pub delete: String,
}

#[derive(Debug, Clone)]
pub struct CompanyConnectionEndpoints {
    pub list: String,
    pub create: String,
    pub update: String,
    pub delete: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionEndpoints {
    pub list: String,
    pub create: String,
    pub connect: String,
    pub state: String,
    pub delete: String,
}

#[derive(Debug, Clone)]
pub struct ValidationEndpoints {
    pub list: String,
    pub save: String,
    pub delete: String,
    pub validate: String,
}

#[derive(Debug, Clone)]
pub struct TemplateEndpoints {
    pub list: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub execute: String,
    pub business: String,
}

#[derive(Debug, Clone)]
pub struct UserEndpoints {
    pub list: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub reset_password: String,
}

#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub login: String,
    pub logout: String,
    pub verify: String,
}

/// Fully resolved webhook URLs, grouped by resource.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub companies: CompanyEndpoints,
    pub company_connections: CompanyConnectionEndpoints,
    pub connections: ConnectionEndpoints,
    pub validation: ValidationEndpoints,
    pub templates: TemplateEndpoints,
    pub users: UserEndpoints,
    pub auth: AuthEndpoints,
}

impl Endpoints {
    pub fn resolve(config: &Config) -> Result<Self, config::ConfigError> {
        let base = match config.n8n_url.as_deref() {
            Some(raw) => Some(parse_base(raw)?),
            None => None,
        };
        let r = |value: &Option<String>, default_path: &str| {
            resolve_endpoint(base.as_ref(), value.as_deref(), default_path)
        };

        Ok(Self {
            companies: CompanyEndpoints {
                list: r(&config.webhook_companies_list, "companies/list")?,
                list_one: r(&config.webhook_companies_listone, "companies/listone")?,
                create: r(&config.webhook_companies_create, "companies/create")?,
                update: r(&config.webhook_companies_update, "companies/update")?,
                delete: r(&config.webhook_companies_delete, "companies/delete")?,
            },
            company_connections: CompanyConnectionEndpoints {
                list: r(&config.webhook_companies_connections_list, "companies-connections/list")?,
                create: r(&config.webhook_companies_connections_create, "companies-connections/create")?,
                update: r(&config.webhook_companies_connections_update, "companies-connections/update")?,
                delete: r(&config.webhook_companies_connections_delete, "companies-connections/delete")?,
            },
            connections: ConnectionEndpoints {
                list: r(&config.webhook_connections_list, "connections/list")?,
                create: r(&config.webhook_connections_create, "connections/create")?,
                connect: r(&config.webhook_connections_connect, "connections/connect")?,
                state: r(&config.webhook_connections_state, "connections/state")?,
                delete: r(&config.webhook_connections_remove, "connections/remove")?,
            },
            validation: ValidationEndpoints {
                list: r(&config.webhook_validation_list, "validation/list")?,
                save: r(&config.webhook_validation_save, "validation/save")?,
                delete: r(&config.webhook_validation_delete, "validation/delete")?,
                validate: r(&config.webhook_validation, "validation")?,
            },
            templates: TemplateEndpoints {
                list: r(&config.webhook_template_list, "template/list")?,
                create: r(&config.webhook_template_create, "template/create")?,
                update: r(&config.webhook_template_update, "template/update")?,
                delete: r(&config.webhook_template_delete, "template/delete")?,
                execute: r(&config.webhook_template_send, "template/send")?,
                business: r(&config.webhook_business_templates, "business/templates")?,
            },
            users: UserEndpoints {
                list: r(&config.webhook_users_list, "users/list")?,
                create: r(&config.webhook_users_create, "users/create")?,
                update: r(&config.webhook_users_update, "users/update")?,
                delete: r(&config.webhook_users_delete, "users/delete")?,
                reset_password: r(&config.webhook_users_reset_password, "users/reset-password")?,
            },
            auth: AuthEndpoints {
                login: r(&config.webhook_auth_login, "auth/login")?,
                logout: r(&config.webhook_auth_logout, "auth/logout")?,
                verify: r(&config.webhook_auth_verify, "auth/verify")?,
            },
        })
    }

    /// Endpoints that must never carry the bearer token.
    pub fn public_allow_list(&self) -> Vec<String> {
        vec![
            self.auth.login.clone(),
            self.auth.logout.clone(),
            self.auth.verify.clone(),
        ]
    }
}

fn parse_base(raw: &str) -> Result<Url, config::ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized)
        .map_err(|e| config::ConfigError::Message(format!("Invalid N8N_URL {}: {}", raw, e)))?;
    ensure_http(&url, raw)?;
    Ok(url)
}

fn resolve_endpoint(
    base: Option<&Url>,
    value: Option<&str>,
    default_path: &str,
) -> Result<String, config::ConfigError> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty());

    if let Some(candidate) = raw {
        if let Ok(absolute) = Url::parse(candidate) {
            ensure_http(&absolute, candidate)?;
            return Ok(absolute.to_string());
        }
    }

    let path = raw.unwrap_or(default_path).trim_start_matches('/');
    let base = base.ok_or_else(|| {
        config::ConfigError::Message(format!(
            "Webhook '{}' is relative but N8N_URL is not set",
            path
        ))
    })?;

    base.join(path)
        .map(|url| url.to_string())
        .map_err(|e| config::ConfigError::Message(format!("Invalid webhook path {}: {}", path, e)))
}

fn ensure_http(url: &Url, raw: &str) -> Result<(), config::ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(config::ConfigError::Message(format!(
            "Unsupported scheme '{}' in {}",
            other, raw
        ))),
    }
}
