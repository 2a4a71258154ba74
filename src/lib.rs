// survey-client library - theme preferences and survey API access shared
// by the CLI and any embedding UI.

pub mod api;
pub mod config;
pub mod theme;

// Re-export commonly used types
pub use api::{
    ApiError, Certificate, CertificateUpload, Question, QuestionList, QuestionResponse,
    QuestionResponseList, SurveyApi, SurveySubmission,
};
pub use config::{FilePreferences, PreferenceError};
pub use theme::{
    resolve_initial, ColorSchemeProbe, PreferenceStorage, PresentationFlag, RootPresentation,
    SubscriptionId, SystemColorScheme, ThemeMode, ThemeStore,
};
