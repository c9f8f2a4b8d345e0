//! Configuration context.
//!
//! Token, API version, connected account and base URL are resolved per call:
//!
//! 1. value set explicitly on the call
//! 2. value set by the innermost active [`Scope`] on the calling thread
//! 3. process-wide default (see [`set_token`] and friends)
//!
//! The base URL is never set per call; it falls back to [`DEFAULT_BASE_URL`].
//! Empty strings are treated as unset at every level.
//!
//! # Example
//!
//! ```
//! use paywire_core::{CallOptions, Scope, resolve};
//!
//! let config = Scope::new()
//!     .token("sk_test_scoped")
//!     .api_version("2024-06-20")
//!     .run(|| resolve(&CallOptions::default()))
//!     .expect("token is set");
//!
//! assert_eq!(config.token(), "sk_test_scoped");
//! assert_eq!(config.api_version(), Some("2024-06-20"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};
use std::task::{Context, Poll};

use url::Url;

use crate::{CallOptions, Error, Result};

/// Production root of the payment API.
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Settings {
    token: Option<String>,
    api_version: Option<String>,
    account: Option<String>,
    base_url: Option<Url>,
}

impl Settings {
    const EMPTY: Self = Self {
        token: None,
        api_version: None,
        account: None,
        base_url: None,
    };

    fn layered_over(self, base: &Self) -> Self {
        Self {
            token: self.token.or_else(|| base.token.clone()),
            api_version: self.api_version.or_else(|| base.api_version.clone()),
            account: self.account.or_else(|| base.account.clone()),
            base_url: self.base_url.or_else(|| base.base_url.clone()),
        }
    }
}

static DEFAULTS: RwLock<Settings> = RwLock::new(Settings::EMPTY);

thread_local! {
    static SCOPED: RefCell<Settings> = const { RefCell::new(Settings::EMPTY) };
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn update_defaults(update: impl FnOnce(&mut Settings)) {
    let mut defaults = DEFAULTS.write().unwrap_or_else(PoisonError::into_inner);
    update(&mut defaults);
}

fn read_defaults() -> Settings {
    DEFAULTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn current_scope() -> Settings {
    SCOPED.with(|scoped| scoped.borrow().clone())
}

// ============================================================================
// Process-wide defaults
// ============================================================================

/// Set the process-wide API token. An empty string clears it.
pub fn set_token(token: impl Into<String>) {
    let token = non_empty(token.into());
    update_defaults(|defaults| defaults.token = token);
}

/// Set the process-wide API version. An empty string clears it.
pub fn set_api_version(api_version: impl Into<String>) {
    let api_version = non_empty(api_version.into());
    update_defaults(|defaults| defaults.api_version = api_version);
}

/// Set the process-wide connected account. An empty string clears it.
pub fn set_account(account: impl Into<String>) {
    let account = non_empty(account.into());
    update_defaults(|defaults| defaults.account = account);
}

/// Set the process-wide base URL.
pub fn set_base_url(base_url: Url) {
    let base_url = normalize_base_url(base_url);
    update_defaults(|defaults| defaults.base_url = Some(base_url));
}

/// Clear every process-wide default.
pub fn reset_defaults() {
    update_defaults(|defaults| *defaults = Settings::EMPTY);
}

// ============================================================================
// Scoped overrides
// ============================================================================

/// Configuration override active for a bounded span of execution.
///
/// Values left unset fall through to the enclosing scope, then to the
/// process-wide defaults. Scopes are thread-local: they are not seen by other
/// threads, including runtime worker threads, unless a future is wrapped with
/// [`Scope::instrument`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    settings: Settings,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the API token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.settings.token = non_empty(token.into());
        self
    }

    /// Override the API version.
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.settings.api_version = non_empty(api_version.into());
        self
    }

    /// Override the connected account.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.settings.account = non_empty(account.into());
        self
    }

    /// Override the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.settings.base_url = Some(normalize_base_url(base_url));
        self
    }

    /// Enter the scope on the current thread.
    ///
    /// The previous scope is restored when the guard is dropped, including
    /// during unwinding. Guards must be dropped in reverse order of creation.
    pub fn enter(self) -> ScopeGuard {
        install(self.settings.layered_over(&current_scope()))
    }

    /// Run a closure inside the scope.
    pub fn run<R>(self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// Attach the scope to a future.
    ///
    /// The scope (layered over the scope active when this is called) is
    /// installed around every poll of the future, whichever thread polls it.
    pub fn instrument<F: Future>(self, future: F) -> Scoped<F> {
        Scoped {
            settings: self.settings.layered_over(&current_scope()),
            future: Box::pin(future),
        }
    }
}

fn install(settings: Settings) -> ScopeGuard {
    let previous = SCOPED.with(|scoped| scoped.replace(settings));
    ScopeGuard {
        previous: Some(previous),
        _not_send: PhantomData,
    }
}

/// Guard returned by [`Scope::enter`].
#[derive(Debug)]
#[must_use = "the scope is exited as soon as the guard is dropped"]
pub struct ScopeGuard {
    previous: Option<Settings>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            SCOPED.with(|scoped| *scoped.borrow_mut() = previous);
        }
    }
}

/// Future returned by [`Scope::instrument`].
#[must_use = "futures do nothing unless polled"]
pub struct Scoped<F> {
    settings: Settings,
    future: Pin<Box<F>>,
}

impl<F> fmt::Debug for Scoped<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _guard = install(self.settings.clone());
        self.future.as_mut().poll(cx)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Configuration resolved for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    token: String,
    api_version: Option<String>,
    account: Option<String>,
    base_url: Url,
}

impl EffectiveConfig {
    /// Creates a configuration with a token and base URL.
    #[must_use]
    pub fn new(token: impl Into<String>, base_url: Url) -> Self {
        Self {
            token: token.into(),
            api_version: None,
            account: None,
            base_url: normalize_base_url(base_url),
        }
    }

    /// Sets the API version.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = non_empty(api_version.into());
        self
    }

    /// Sets the connected account.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = non_empty(account.into());
        self
    }

    /// API token, used as the basic-auth username.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// API version, if any.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Connected account, if any.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Base URL, always ending with `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Resolve the effective configuration of a call on the current thread.
///
/// # Errors
///
/// Returns [`Error::MissingToken`] if no token is set at any level.
pub fn resolve(options: &CallOptions) -> Result<EffectiveConfig> {
    let explicit = Settings {
        token: options.token.clone().and_then(non_empty),
        api_version: options.api_version.clone().and_then(non_empty),
        account: options.account.clone().and_then(non_empty),
        base_url: None,
    };
    let settings = explicit.layered_over(&current_scope().layered_over(&read_defaults()));

    let token = settings.token.ok_or(Error::MissingToken)?;
    let base_url = match settings.base_url {
        Some(base_url) => base_url,
        None => Url::parse(DEFAULT_BASE_URL)?,
    };

    Ok(EffectiveConfig {
        token,
        api_version: settings.api_version,
        account: settings.account,
        base_url,
    })
}
