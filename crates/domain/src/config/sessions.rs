use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session persistence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Directory holding one JSON record per session.
    #[serde(default = "d_sessions_dir")]
    pub dir: PathBuf,
    /// Title given to sessions created without one.
    #[serde(default = "d_title")]
    pub default_title: String,
    /// Open a brand-new session with `onboarding_message` instead of a
    /// model call while no core profile fact is stored.
    #[serde(default)]
    pub require_profile: bool,
    #[serde(default = "d_onboarding_message")]
    pub onboarding_message: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: d_sessions_dir(),
            default_title: d_title(),
            require_profile: false,
            onboarding_message: d_onboarding_message(),
        }
    }
}

fn d_sessions_dir() -> PathBuf {
    PathBuf::from("data/sessions")
}
fn d_title() -> String {
    "New conversation".into()
}
fn d_onboarding_message() -> String {
    "Hello! This looks like our first real conversation. Before we start, \
     tell me a little about yourself: who you are, what you work on, and \
     anything you would like me to always keep in mind or avoid. I will \
     remember it for every conversation that follows."
        .into()
}
