//! UI-facing localization.
//!
//! Components depend on the [`LocalizationProvider`] trait. [`Localizer`]
//! implements it by delegating resolution to a shared
//! [`LocalizationClient`] and formatting messages from the bundle it stored.
//! [`DocumentLocaleSettings`] carries the document language and notifies
//! subscribers when it changes.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bundle::ResolvedResourceBundle;
use crate::cache::BoxFuture;
use crate::client::LocalizationClient;
use crate::format::{format_message, validate_markup, MarkupError, Params, DEFAULT_ALLOWED_TAGS};
use crate::resolve::{candidate_languages, ResourceQuery};

// =============================================================================
// Document locale settings
// =============================================================================

/// A point-in-time view of the document locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSnapshot {
    pub language: String,
    pub fallback_language: Option<String>,
}

impl LocaleSnapshot {
    /// The candidate list for this locale.
    pub fn candidates(&self) -> Vec<String> {
        candidate_languages(&self.language, self.fallback_language.as_deref())
    }
}

/// The document's language settings with change notification.
///
/// Subscribers receive a `watch::Receiver`; dropping it unsubscribes.
#[derive(Debug)]
pub struct DocumentLocaleSettings {
    tx: watch::Sender<LocaleSnapshot>,
}

impl DocumentLocaleSettings {
    /// Create settings with a primary language and no fallback.
    pub fn new(language: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(LocaleSnapshot {
            language: language.into(),
            fallback_language: None,
        });
        Self { tx }
    }

    /// Set the initial fallback language.
    pub fn with_fallback_language(self, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        self.tx.send_modify(|s| s.fallback_language = Some(fallback));
        self
    }

    /// Current primary language.
    pub fn language(&self) -> String {
        self.tx.borrow().language.clone()
    }

    /// Current fallback language.
    pub fn fallback_language(&self) -> Option<String> {
        self.tx.borrow().fallback_language.clone()
    }

    /// Current settings.
    pub fn snapshot(&self) -> LocaleSnapshot {
        self.tx.borrow().clone()
    }

    /// Candidate list for the current settings.
    pub fn candidates(&self) -> Vec<String> {
        self.snapshot().candidates()
    }

    /// Change the primary language. Subscribers are notified only when the
    /// value actually changes.
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        self.tx.send_if_modified(|s| {
            if s.language == language {
                return false;
            }
            s.language = language;
            true
        });
    }

    /// Change the fallback language.
    pub fn set_fallback_language(&self, fallback: Option<String>) {
        self.tx.send_if_modified(|s| {
            if s.fallback_language == fallback {
                return false;
            }
            s.fallback_language = fallback;
            true
        });
    }

    /// Subscribe to changes.
    pub fn subscribe(&self) -> watch::Receiver<LocaleSnapshot> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// =============================================================================
// Provider
// =============================================================================

/// What UI components need from the localization layer.
pub trait LocalizationProvider: Send + Sync {
    /// Resolve resources for the locale current at the time of the call.
    ///
    /// Returns the resolved language, or `None` when unresolved. The result
    /// is not stored if the locale changes before resolution completes.
    fn resolve(&self) -> BoxFuture<'_, Option<String>>;

    /// Format the message for `key`. Never fails: an unresolved bundle, a
    /// missing key or a formatting error yields an empty string.
    fn localize(&self, key: &str, params: &Params) -> String;

    /// The resolved language, if any.
    fn language(&self) -> Option<String>;
}

/// Default [`LocalizationProvider`] backed by a [`LocalizationClient`].
pub struct Localizer {
    client: Arc<LocalizationClient>,
    settings: Arc<DocumentLocaleSettings>,
    query: ResourceQuery,
    bundle: RwLock<Option<ResolvedResourceBundle>>,
}

impl Localizer {
    pub fn new(
        client: Arc<LocalizationClient>,
        settings: Arc<DocumentLocaleSettings>,
        query: ResourceQuery,
    ) -> Self {
        Self {
            client,
            settings,
            query,
            bundle: RwLock::new(None),
        }
    }

    /// The stored bundle.
    pub fn bundle(&self) -> Option<ResolvedResourceBundle> {
        self.bundle.read().clone()
    }

    /// Format `key` for insertion as HTML.
    ///
    /// # Errors
    ///
    /// `MarkupError` when the message uses a tag outside the default
    /// allow-list or leaves tags unbalanced.
    pub fn localize_html(&self, key: &str, params: &Params) -> Result<String, MarkupError> {
        let text = self.localize(key, params);
        validate_markup(&text, DEFAULT_ALLOWED_TAGS)?;
        Ok(text)
    }

    /// Re-resolve whenever the locale settings change.
    ///
    /// The task ends when the client shuts down.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut changes = self.settings.subscribe();
        let shutdown = self.client.shutdown_token();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        debug!(
                            language = %this.settings.language(),
                            "Locale changed, re-resolving"
                        );
                        this.resolve().await;
                    }
                }
            }
            debug!("Locale watcher stopped");
        })
    }

    /// Resolve for `snapshot` and store the bundle unless the settings
    /// moved on while the resolution was running.
    async fn resolve_for(&self, snapshot: LocaleSnapshot) -> Option<String> {
        let candidates = snapshot.candidates();
        let bundle = self
            .client
            .get_localize_resources(&self.query, &candidates)
            .await;

        let language = bundle.as_ref().map(|b| b.language.clone());
        if language.is_none() {
            warn!(candidates = ?candidates, "No language could be resolved");
        }

        let mut stored = self.bundle.write();
        if self.settings.snapshot() == snapshot {
            *stored = bundle;
        } else {
            debug!(
                language = %snapshot.language,
                "Locale changed during resolution, dropping result"
            );
        }
        language
    }
}

impl LocalizationProvider for Localizer {
    fn resolve(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(self.resolve_for(self.settings.snapshot()))
    }

    fn localize(&self, key: &str, params: &Params) -> String {
        let guard = self.bundle.read();
        let Some(bundle) = guard.as_ref() else {
            return String::new();
        };
        let Some(template) = bundle.get(key) else {
            debug!(key, language = %bundle.language, "Missing message key");
            return String::new();
        };

        match format_message(template, &bundle.language, params) {
            Ok(text) => text,
            Err(e) => {
                warn!(key, error = %e, "Failed to format message");
                String::new()
            }
        }
    }

    fn language(&self) -> Option<String> {
        self.bundle.read().as_ref().map(|b| b.language.clone())
    }
}
