use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::SiteConfig;
use crate::core::{Result, SyncError};

pub const LOGIN_PATH: &str = "/nl-NL/Inloggen";
const LOGIN_FORM: &str = "form#inloggenForm";
const USERNAME_FIELD: &str = "gebruikersnaam";
const PASSWORD_FIELD: &str = "password";

/// Cookie name to value, as held by the jar once navigation settled.
pub type Cookies = HashMap<String, String>;

/// Capability that drives the site's login form.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginDriver: Send + Sync {
    async fn submit_credentials(&self, username: &str, password: &str) -> Result<Cookies>;
}

/// Logs in over plain HTTP: fetches the form, replays its hidden inputs
/// with the credentials and follows the post-submit redirects.
pub struct FormLoginDriver {
    endpoint: Url,
    timeout: Duration,
}

struct LoginForm {
    action: Url,
    fields: Vec<(String, String)>,
}

impl FormLoginDriver {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let endpoint = Url::parse(site.endpoint())
            .map_err(|e| SyncError::config(format!("Invalid site endpoint: {}", e)))?;

        Ok(Self {
            endpoint,
            timeout: site.login_timeout(),
        })
    }

    fn login_url(&self) -> Result<Url> {
        self.endpoint
            .join(LOGIN_PATH)
            .map_err(|e| SyncError::config(format!("Invalid login url: {}", e)))
    }
}

#[async_trait]
impl LoginDriver for FormLoginDriver {
    async fn submit_credentials(&self, username: &str, password: &str) -> Result<Cookies> {
        // Fresh jar per attempt so a stale session cookie never leaks in.
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| SyncError::authentication(format!("Failed to build login client: {}", e)))?;

        let login_url = self.login_url()?;
        tracing::debug!("Opening login page {}", login_url);

        let page = client
            .get(login_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::authentication(format!("Login page unreachable: {}", e)))?
            .text()
            .await
            .map_err(|e| SyncError::authentication(format!("Failed to read login page: {}", e)))?;

        let mut form = parse_login_form(&page, &login_url)?;
        form.fields.push((USERNAME_FIELD.to_string(), username.to_string()));
        form.fields.push((PASSWORD_FIELD.to_string(), password.to_string()));

        let response = client
            .post(form.action.clone())
            .form(&form.fields)
            .send()
            .await
            .map_err(|e| SyncError::authentication(format!("Login submit failed: {}", e)))?;

        tracing::debug!(
            "Login navigation finished at {} with {}",
            response.url(),
            response.status()
        );

        Ok(jar
            .cookies(&self.endpoint)
            .and_then(|header| header.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default())
    }
}

fn parse_login_form(html: &str, page_url: &Url) -> Result<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse(LOGIN_FORM)
        .map_err(|e| SyncError::authentication(format!("Bad form selector: {:?}", e)))?;
    let hidden_selector = Selector::parse("input[type=hidden]")
        .map_err(|e| SyncError::authentication(format!("Bad input selector: {:?}", e)))?;

    let form = document
        .select(&form_selector)
        .next()
        .ok_or_else(|| SyncError::authentication("Login form not found on login page"))?;

    let action = match form.value().attr("action") {
        Some(action) if !action.is_empty() => page_url
            .join(action)
            .map_err(|e| SyncError::authentication(format!("Bad form action '{}': {}", action, e)))?,
        _ => page_url.clone(),
    };

    let fields = form
        .select(&hidden_selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Ok(LoginForm { action, fields })
}

fn parse_cookie_header(header: &str) -> Cookies {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
