//! Tauri backend of the shell.

use std::sync::Mutex;

use tauri::{
    AppHandle, Manager, RunEvent, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
    WindowEvent, Wry,
};
use url::Url;

use crate::shell::{Bootstrap, DirLoader, Shell, WindowHost, WindowOptions};

/// Label of the only window.
pub const MAIN_WINDOW: &str = "main";

pub struct TauriHost<R: Runtime = Wry> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriHost<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> WindowHost for TauriHost<R> {
    type Window = WebviewWindow<R>;

    fn create_window(&self, options: &WindowOptions) -> anyhow::Result<Self::Window> {
        // Tauri windows carry no menu bar unless one is attached, and their
        // size always describes the content area.
        let window = WebviewWindowBuilder::new(&self.app, MAIN_WINDOW, WebviewUrl::default())
            .title(&options.title)
            .inner_size(options.width, options.height)
            .resizable(options.resizable)
            .maximizable(options.fullscreenable)
            .build()?;

        Ok(window)
    }

    fn open_devtools(&self, window: &Self::Window) -> anyhow::Result<()> {
        window.open_devtools();
        Ok(())
    }

    fn navigate(&self, window: &Self::Window, url: &Url) -> anyhow::Result<()> {
        window.navigate(url.clone())?;
        Ok(())
    }

    fn exit(&self) {
        self.app.exit(0);
    }
}

type ManagedShell = Mutex<Shell<TauriHost<Wry>>>;

/// Runs the shell until its window is closed.
pub fn run(bootstrap: Bootstrap, context: tauri::Context<Wry>) -> anyhow::Result<()> {
    let loader = DirLoader::new(&bootstrap.app_dir);

    let app = tauri::Builder::default()
        .setup(move |app| {
            let mut shell = Shell::new(TauriHost::new(app.handle().clone()), bootstrap);
            shell.on_ready(&loader)?;
            app.manage(Mutex::new(shell));
            Ok(())
        })
        .build(context)?;

    app.run(|handle, event| match event {
        RunEvent::WindowEvent {
            label,
            event: WindowEvent::Destroyed,
            ..
        } if label == MAIN_WINDOW => with_shell(handle, Shell::on_closed),
        // No exit code means the last window went away.
        RunEvent::ExitRequested { code: None, .. } => {
            with_shell(handle, Shell::on_all_windows_closed)
        }
        _ => {}
    });

    Ok(())
}

fn with_shell(handle: &AppHandle<Wry>, f: impl FnOnce(&mut Shell<TauriHost<Wry>>)) {
    let Some(state) = handle.try_state::<ManagedShell>() else {
        return;
    };

    match state.lock() {
        Ok(mut shell) => f(&mut shell),
        Err(_) => tracing::warn!("shell state is poisoned"),
    };
}
