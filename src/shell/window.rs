use serde_json::Value;
use url::Url;

use crate::shell::StartupArgs;

/// Startup flag asking for the developer tools.
pub const DEV_TOOLS_FLAG: &str = "dev-tools";

/// Key of the main config able to veto the developer tools.
pub const DEV_TOOLS_KEY: &str = "devTools";

/// Options of the single top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub auto_hide_menu_bar: bool,
    pub resizable: bool,
    pub fullscreenable: bool,
    /// Whether `width` and `height` describe the web content instead of the
    /// outer frame.
    pub use_content_size: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "electron-app".into(),
            width: 800.0,
            height: 600.0,
            auto_hide_menu_bar: true,
            resizable: true,
            fullscreenable: true,
            use_content_size: true,
        }
    }
}

/// When to open the developer tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevTools {
    Never,
    Always,
    /// When started with `-dev-tools`.
    Flag,
    /// When the main config sets `devTools` to a truthy value.
    Config,
    /// When started with `-dev-tools`, unless the main config sets `devTools`
    /// to a falsy value.
    #[default]
    FlagUnlessDisabled,
}

impl DevTools {
    pub fn should_open(self, args: &StartupArgs, main_config: &Value) -> bool {
        let setting = main_config.get(DEV_TOOLS_KEY);

        match self {
            DevTools::Never => false,
            DevTools::Always => true,
            DevTools::Flag => args.has(DEV_TOOLS_FLAG),
            DevTools::Config => setting.is_some_and(is_truthy),
            DevTools::FlagUnlessDisabled => {
                args.has(DEV_TOOLS_FLAG) && setting.is_none_or(is_truthy)
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The windowing backend driven by the shell.
pub trait WindowHost {
    type Window;

    fn create_window(&self, options: &WindowOptions) -> anyhow::Result<Self::Window>;

    fn open_devtools(&self, window: &Self::Window) -> anyhow::Result<()>;

    fn navigate(&self, window: &Self::Window, url: &Url) -> anyhow::Result<()>;

    /// Terminates the process.
    fn exit(&self);
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_policy() {
        let flag = StartupArgs::parse(["-dev-tools"]);
        let none = StartupArgs::default();
        let policy = DevTools::default();

        assert!(policy.should_open(&flag, &json!({})));
        assert!(policy.should_open(&flag, &json!({ "devTools": true })));
        assert!(!policy.should_open(&flag, &json!({ "devTools": false })));
        assert!(!policy.should_open(&flag, &json!({ "devTools": 0 })));
        assert!(!policy.should_open(&none, &json!({ "devTools": true })));
    }

    #[test]
    fn test_other_policies() {
        let flag = StartupArgs::parse(["-dev-tools"]);
        let none = StartupArgs::default();
        let disabled = json!({ "devTools": false });
        let enabled = json!({ "devTools": "yes" });

        assert!(!DevTools::Never.should_open(&flag, &enabled));
        assert!(DevTools::Always.should_open(&none, &disabled));
        assert!(DevTools::Flag.should_open(&flag, &disabled));
        assert!(DevTools::Config.should_open(&none, &enabled));
        assert!(!DevTools::Config.should_open(&flag, &json!({})));
    }
}
