//! Desktop shell bootstrap.
//!
//! The shell opens exactly one window, optionally opens the developer tools
//! and navigates the window to the application document, forwarding the
//! render config as query parameters:
//!
//! ```text
//! Uninitialized -> Ready -> WindowOpen -> WindowClosed -> Exited
//! ```
//!
//! The windowing itself sits behind [`WindowHost`], implemented for Tauri in
//! the `desktop` module.

mod args;
mod loader;
mod query;
#[cfg(feature = "tauri")]
pub mod desktop;
mod window;

use camino::Utf8PathBuf;
use url::Url;

use crate::Mode;
use crate::config::{MAIN_CONFIG, RENDER_CONFIG};
use crate::error::ShellError;

pub use crate::shell::args::StartupArgs;
pub use crate::shell::loader::{ConfigLoader, DirLoader, Loaded};
pub use crate::shell::query::{DOCUMENT, document_url, render_value, startup_query};
pub use crate::shell::window::{DEV_TOOLS_FLAG, DEV_TOOLS_KEY, DevTools, WindowHost, WindowOptions};

/// Lifecycle of the shell process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Ready,
    WindowOpen,
    WindowClosed,
    Exited,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Ready => "ready",
            State::WindowOpen => "showing a window",
            State::WindowClosed => "closed",
            State::Exited => "exited",
        }
    }
}

/// Everything the shell needs to start, decided before the event loop runs.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// Flavor of the shell build.
    pub mode: Mode,
    pub args: StartupArgs,
    /// Directory holding the document and the generated configs.
    pub app_dir: Utf8PathBuf,
    pub devtools: DevTools,
    pub window: WindowOptions,
}

impl Bootstrap {
    pub fn new(app_dir: impl Into<Utf8PathBuf>, args: StartupArgs) -> Self {
        Self {
            mode: if cfg!(debug_assertions) {
                Mode::Debug
            } else {
                Mode::Release
            },
            args,
            app_dir: app_dir.into(),
            devtools: DevTools::default(),
            window: WindowOptions::default(),
        }
    }

    pub fn with_devtools(mut self, devtools: DevTools) -> Self {
        self.devtools = devtools;
        self
    }

    pub fn with_window(mut self, window: WindowOptions) -> Self {
        self.window = window;
        self
    }
}

pub struct Shell<H: WindowHost> {
    host: H,
    bootstrap: Bootstrap,
    state: State,
    window: Option<H::Window>,
    url: Option<Url>,
}

impl<H: WindowHost> Shell<H> {
    pub fn new(host: H, bootstrap: Bootstrap) -> Self {
        Self {
            host,
            bootstrap,
            state: State::Uninitialized,
            window: None,
            url: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// The window, while it is open.
    pub fn window(&self) -> Option<&H::Window> {
        self.window.as_ref()
    }

    /// The URL the window was navigated to.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Loads the configs, opens the window and navigates it to the document.
    ///
    /// Can only happen once per process.
    pub fn on_ready(&mut self, loader: &impl ConfigLoader) -> Result<&Url, ShellError> {
        if self.state != State::Uninitialized {
            return Err(ShellError::State(self.state.name()));
        }
        self.state = State::Ready;
        tracing::info!("starting {} shell", self.bootstrap.mode.flavor());

        let main_config = loader.load(MAIN_CONFIG).or_empty("main config");
        let render_config = loader.load(RENDER_CONFIG).or_empty("render config");

        let window = self
            .host
            .create_window(&self.bootstrap.window)
            .map_err(ShellError::Window)?;
        // Kept from here on so the close events can release it.
        let window = self.window.insert(window);
        self.state = State::WindowOpen;

        if self
            .bootstrap
            .devtools
            .should_open(&self.bootstrap.args, &main_config)
        {
            self.host
                .open_devtools(window)
                .map_err(ShellError::Window)?;
        }

        let query = startup_query(&render_config);
        let url = document_url(&self.bootstrap.app_dir, &query)?;
        tracing::debug!("loading URL: {url}");

        self.host
            .navigate(window, &url)
            .map_err(ShellError::Window)?;

        Ok(self.url.insert(url))
    }

    /// Releases the window.
    pub fn on_closed(&mut self) {
        if self.state == State::WindowOpen {
            self.window = None;
            self.state = State::WindowClosed;
        }
    }

    /// Terminates the process once no window is left.
    pub fn on_all_windows_closed(&mut self) {
        if self.state == State::Exited {
            return;
        }

        self.window = None;
        self.state = State::Exited;
        self.host.exit();
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use serde_json::{Value, json};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Create(WindowOptions),
        DevTools(u32),
        Navigate(u32, String),
        Exit,
    }

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
        windows: RefCell<u32>,
    }

    impl WindowHost for Recorder {
        type Window = u32;

        fn create_window(&self, options: &WindowOptions) -> anyhow::Result<u32> {
            self.calls.borrow_mut().push(Call::Create(options.clone()));
            let mut windows = self.windows.borrow_mut();
            *windows += 1;
            Ok(*windows)
        }

        fn open_devtools(&self, window: &u32) -> anyhow::Result<()> {
            self.calls.borrow_mut().push(Call::DevTools(*window));
            Ok(())
        }

        fn navigate(&self, window: &u32, url: &Url) -> anyhow::Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Navigate(*window, url.to_string()));
            Ok(())
        }

        fn exit(&self) {
            self.calls.borrow_mut().push(Call::Exit);
        }
    }

    fn loader(main: Option<Value>, render: Option<Value>) -> impl Fn(&str) -> Loaded {
        move |name: &str| {
            let value = match name {
                MAIN_CONFIG => main.clone(),
                RENDER_CONFIG => render.clone(),
                _ => None,
            };
            value.map_or_else(|| Loaded::Absent(format!("{name} missing")), Loaded::Present)
        }
    }

    fn bootstrap(args: &[&str]) -> Bootstrap {
        Bootstrap::new("/opt/app", StartupArgs::parse(args))
    }

    #[cfg(unix)]
    #[test]
    fn test_lifecycle() {
        let mut shell = Shell::new(Recorder::default(), bootstrap(&["shell", "-dev-tools"]));
        assert_eq!(shell.state(), State::Uninitialized);

        let configs = loader(Some(json!({})), Some(json!({ "a": 1, "b": "two" })));
        let url = shell.on_ready(&configs).unwrap().clone();
        assert_eq!(url.as_str(), "file:///opt/app/index.html?a=1&b=two");
        assert_eq!(shell.state(), State::WindowOpen);
        assert_eq!(shell.window(), Some(&1));

        shell.on_closed();
        assert_eq!(shell.state(), State::WindowClosed);
        assert_eq!(shell.window(), None);

        shell.on_all_windows_closed();
        assert_eq!(shell.state(), State::Exited);

        assert_eq!(
            *shell.host().calls.borrow(),
            vec![
                Call::Create(WindowOptions::default()),
                Call::DevTools(1),
                Call::Navigate(1, url.to_string()),
                Call::Exit,
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_configs_use_defaults() {
        let mut shell = Shell::new(Recorder::default(), bootstrap(&["-dev-tools"]));

        let url = shell.on_ready(&loader(None, None)).unwrap();
        assert_eq!(url.as_str(), "file:///opt/app/index.html");

        let calls = shell.host().calls.borrow();
        assert_eq!(calls[0], Call::Create(WindowOptions::default()));
        // Without a main config nothing vetoes the flag.
        assert_eq!(calls[1], Call::DevTools(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_config_disables_devtools() {
        let mut shell = Shell::new(Recorder::default(), bootstrap(&["-dev-tools"]));

        shell
            .on_ready(&loader(Some(json!({ "devTools": false })), None))
            .unwrap();

        assert!(
            !shell
                .host()
                .calls
                .borrow()
                .iter()
                .any(|call| matches!(call, Call::DevTools(_)))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_second_ready_is_rejected() {
        let mut shell = Shell::new(Recorder::default(), bootstrap(&[]));
        let configs = loader(None, None);

        shell.on_ready(&configs).unwrap();
        assert!(matches!(
            shell.on_ready(&configs),
            Err(ShellError::State(_))
        ));

        let created = shell
            .host()
            .calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .count();
        assert_eq!(created, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_happens_once() {
        let mut shell = Shell::new(Recorder::default(), bootstrap(&[]));
        shell.on_ready(&loader(None, None)).unwrap();

        shell.on_all_windows_closed();
        shell.on_all_windows_closed();

        let exits = shell
            .host()
            .calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Exit))
            .count();
        assert_eq!(exits, 1);
    }

    #[test]
    fn test_failed_window_is_reported() {
        struct Broken;

        impl WindowHost for Broken {
            type Window = ();

            fn create_window(&self, _: &WindowOptions) -> anyhow::Result<()> {
                anyhow::bail!("no display")
            }

            fn open_devtools(&self, _: &()) -> anyhow::Result<()> {
                Ok(())
            }

            fn navigate(&self, _: &(), _: &Url) -> anyhow::Result<()> {
                Ok(())
            }

            fn exit(&self) {}
        }

        let mut shell = Shell::new(Broken, bootstrap(&[]));
        let err = shell.on_ready(&loader(None, None)).err().unwrap();
        assert!(matches!(err, ShellError::Window(_)));
        assert_eq!(shell.state(), State::Ready);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_navigation_keeps_window() {
        struct Blocked(Recorder);

        impl WindowHost for Blocked {
            type Window = u32;

            fn create_window(&self, options: &WindowOptions) -> anyhow::Result<u32> {
                self.0.create_window(options)
            }

            fn open_devtools(&self, window: &u32) -> anyhow::Result<()> {
                self.0.open_devtools(window)
            }

            fn navigate(&self, _: &u32, _: &Url) -> anyhow::Result<()> {
                anyhow::bail!("document blocked")
            }

            fn exit(&self) {
                self.0.exit()
            }
        }

        let mut shell = Shell::new(Blocked(Recorder::default()), bootstrap(&[]));
        let err = shell.on_ready(&loader(None, None)).err().unwrap();
        assert!(matches!(err, ShellError::Window(_)));
        assert_eq!(shell.state(), State::WindowOpen);
        assert_eq!(shell.window(), Some(&1));
        assert_eq!(shell.url(), None);

        shell.on_closed();
        assert_eq!(shell.state(), State::WindowClosed);
        assert_eq!(shell.window(), None);
    }
}
