// Theme preference store: a light/dark mode kept in sync with durable
// storage and a presentation marker, observable by any number of consumers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::PreferenceError;

/// The two supported presentation modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl Default for ThemeMode {
    fn default() -> Self {
        ThemeMode::Light
    }
}

impl ThemeMode {
    /// The opposite mode. Applying this twice returns the starting mode.
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, ThemeMode::Dark)
    }

    /// The stored string form, `"light"` or `"dark"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// Parses the stored form. Anything other than `"light"` or `"dark"`
    /// is rejected so a stale or hand-edited preference value falls back
    /// to detection instead of leaking through.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable storage for the theme preference, a single slot holding the
/// stored string form.
///
/// Writes are best-effort from the store's point of view; a failed write
/// never blocks a theme change.
pub trait PreferenceStorage: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, value: &str) -> Result<(), PreferenceError>;
}

/// Ambient hint from the host environment about the preferred appearance.
pub trait ColorSchemeProbe: Send + Sync {
    /// `Some(true)` when the environment prefers a dark appearance,
    /// `Some(false)` for light, `None` when no signal is available.
    fn prefers_dark(&self) -> Option<bool>;
}

/// Receives the boolean dark-mode marker whenever the theme changes.
pub trait RootPresentation: Send + Sync {
    /// Sets or clears the marker. Implementations must be idempotent:
    /// repeating a call with the same value leaves the same state behind.
    fn set_dark(&self, dark: bool);
}

/// Storage stub for contexts without a home directory. Reads nothing,
/// writes succeed without effect.
pub struct NullStorage;

impl PreferenceStorage for NullStorage {
    fn read(&self) -> Option<String> {
        None
    }

    fn write(&self, _value: &str) -> Result<(), PreferenceError> {
        Ok(())
    }
}

/// Probe stub that reports no environment signal.
pub struct NullProbe;

impl ColorSchemeProbe for NullProbe {
    fn prefers_dark(&self) -> Option<bool> {
        None
    }
}

/// Presentation stub for headless contexts.
pub struct NullPresentation;

impl RootPresentation for NullPresentation {
    fn set_dark(&self, _dark: bool) {}
}

/// OS-level color scheme detection.
pub struct SystemColorScheme;

impl ColorSchemeProbe for SystemColorScheme {
    fn prefers_dark(&self) -> Option<bool> {
        match dark_light::detect() {
            dark_light::Mode::Dark => Some(true),
            dark_light::Mode::Light => Some(false),
            dark_light::Mode::Default => None,
        }
    }
}

/// Shared dark-mode flag an embedding UI reads when picking its palette.
///
/// Clones share the same flag, so one clone can live inside the store as
/// its presentation target while the UI keeps another to read from.
#[derive(Clone, Default)]
pub struct PresentationFlag(Arc<AtomicBool>);

impl PresentationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dark(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl RootPresentation for PresentationFlag {
    fn set_dark(&self, dark: bool) {
        self.0.store(dark, Ordering::Relaxed);
    }
}

/// Resolves the starting mode without touching the presentation layer:
/// a valid stored preference wins, then the environment signal, then light.
pub fn resolve_initial(
    storage: &dyn PreferenceStorage,
    probe: &dyn ColorSchemeProbe,
) -> ThemeMode {
    if let Some(mode) = storage.read().as_deref().and_then(ThemeMode::parse) {
        return mode;
    }
    match probe.prefers_dark() {
        Some(true) => ThemeMode::Dark,
        Some(false) => ThemeMode::Light,
        None => ThemeMode::default(),
    }
}

/// Identifier handed out by [`ThemeStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(ThemeMode) + Send + Sync>;

/// The process-wide theme preference.
///
/// Construct one at startup and hand it out behind an `Arc`. Every
/// [`toggle`](ThemeStore::toggle) persists the new value, updates the
/// presentation marker, and notifies listeners in subscription order, all
/// before it returns.
pub struct ThemeStore {
    current: RwLock<ThemeMode>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    storage: Box<dyn PreferenceStorage>,
    presentation: Box<dyn RootPresentation>,
}

impl ThemeStore {
    /// Builds a store from explicit capability providers. The initial mode
    /// is resolved through [`resolve_initial`] and the presentation marker
    /// applied once before the store is returned.
    pub fn new(
        storage: Box<dyn PreferenceStorage>,
        probe: &dyn ColorSchemeProbe,
        presentation: Box<dyn RootPresentation>,
    ) -> Self {
        let initial = resolve_initial(storage.as_ref(), probe);
        presentation.set_dark(initial.is_dark());
        Self {
            current: RwLock::new(initial),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            storage,
            presentation,
        }
    }

    /// Store wired to the user's preference file, the OS color scheme, and
    /// a shared presentation flag. The flag is returned alongside the store
    /// so the UI can read it when rendering.
    pub fn system() -> (Self, PresentationFlag) {
        let flag = PresentationFlag::new();
        let store = Self::new(
            Box::new(crate::config::FilePreferences::new()),
            &SystemColorScheme,
            Box::new(flag.clone()),
        );
        (store, flag)
    }

    /// Store with no storage, signal, or presentation target. Always starts
    /// light. Intended for contexts without a display and for tests.
    pub fn detached() -> Self {
        Self::new(Box::new(NullStorage), &NullProbe, Box::new(NullPresentation))
    }

    pub fn current(&self) -> ThemeMode {
        *self.current.read()
    }

    /// Registers a change listener and immediately invokes it with the
    /// current mode, then on every later change, synchronously on the
    /// toggling thread. Listeners must not toggle the store from inside
    /// their callback.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(ThemeMode) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        listener(self.current());
        self.listeners.write().push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().retain(|(lid, _)| *lid != id);
    }

    /// Flips between light and dark. The new value is persisted and the
    /// presentation marker updated before listeners run. A storage failure
    /// only costs durability: the in-memory mode and the marker still
    /// change, and listeners are still notified.
    pub fn toggle(&self) {
        let next = {
            let mut current = self.current.write();
            *current = current.toggled();
            *current
        };
        if let Err(err) = self.storage.write(next.as_str()) {
            log::warn!("failed to persist theme preference: {err}");
        }
        self.presentation.set_dark(next.is_dark());
        for (_, listener) in self.listeners.read().iter() {
            listener(next);
        }
    }
}
