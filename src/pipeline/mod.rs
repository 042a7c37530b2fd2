//! Build tasks and the profiles composed from them.
//!
//! Every invocation of the CLI maps to a small task graph built by [`plan`]:
//!
//! ```text
//! release:  clean -> generate-config -> bundle-script     -> release
//!                                    -> copy-assets       ->
//!                                    -> copy-shell-assets ->
//! ```
//!
//! The `debug` profile is the same graph without the clean step. The
//! remaining invocations run one or two tasks on their own.

pub mod assets;
pub mod bundle;
pub mod clean;
pub mod generate;
pub mod package;

use camino::Utf8PathBuf;

use crate::engine::{Diagnostics, Handle};
use crate::error::KilnError;
use crate::pipeline::bundle::Bundle;
use crate::pipeline::generate::ConfigSource;
use crate::pipeline::package::Artifact;
use crate::{Blueprint, Environment, Mode, ProjectConfig};

/// A named entry point of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Subcommand)]
pub enum Invocation {
    /// Remove the output directory.
    Clean,
    /// Write the generated config files.
    #[command(alias = "create-url-params")]
    CreateConfig,
    /// Bundle the application script and copy its static files.
    BuildApplication,
    /// Copy the static files of the shell.
    #[command(alias = "build-electron")]
    BuildShell,
    /// Development build.
    Debug,
    /// Clean production build.
    Release,
    /// Package the application tree into a bundle directory.
    PackageDebug,
    /// Package the application tree into a zip archive.
    PackageRelease,
}

impl Invocation {
    pub fn mode(self) -> Mode {
        match self {
            Invocation::Release | Invocation::PackageRelease => Mode::Release,
            _ => Mode::Debug,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Invocation::Clean => "clean",
            Invocation::CreateConfig => "create-config",
            Invocation::BuildApplication => "build-application",
            Invocation::BuildShell => "build-shell",
            Invocation::Debug => "debug",
            Invocation::Release => "release",
            Invocation::PackageDebug => "package-debug",
            Invocation::PackageRelease => "package-release",
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a run produced. Fields of tasks that were not part of the run stay
/// empty.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub cleaned: bool,
    pub configs: Vec<Utf8PathBuf>,
    pub bundle: Option<Bundle>,
    pub assets: Vec<Utf8PathBuf>,
    pub artifact: Option<Artifact>,
}

/// Builds the task graph for an invocation. The returned handle points at the
/// final task, which collects the results of the others.
pub fn plan(invocation: Invocation, sources: Vec<ConfigSource>) -> (Blueprint, Handle<BuildSummary>) {
    let mut blueprint = Blueprint::new();

    let mut cleaned = None;
    let mut configs = None;
    let mut bundle = None;
    let mut assets = None;
    let mut shell = None;
    let mut artifact = None;

    match invocation {
        Invocation::Clean => {
            cleaned = Some(task_clean(&mut blueprint));
        }
        Invocation::CreateConfig => {
            configs = Some(task_generate(&mut blueprint, None, sources));
        }
        Invocation::BuildApplication => {
            bundle = Some(task_bundle(&mut blueprint, None));
            assets = Some(task_copy_assets(&mut blueprint, None));
        }
        Invocation::BuildShell => {
            shell = Some(task_copy_shell_assets(&mut blueprint, None));
        }
        Invocation::Debug | Invocation::Release => {
            if invocation == Invocation::Release {
                cleaned = Some(task_clean(&mut blueprint));
            }

            let generated = task_generate(&mut blueprint, cleaned, sources);
            bundle = Some(task_bundle(&mut blueprint, Some(generated)));
            assets = Some(task_copy_assets(&mut blueprint, Some(generated)));
            shell = Some(task_copy_shell_assets(&mut blueprint, Some(generated)));
            configs = Some(generated);
        }
        Invocation::PackageDebug | Invocation::PackageRelease => {
            artifact = Some(task_package(&mut blueprint));
        }
    }

    let summary = blueprint
        .task()
        .name(invocation.name())
        .depends_on((cleaned, configs, bundle, assets, shell, artifact))
        .run(|_, (cleaned, configs, bundle, assets, shell, artifact)| {
            let mut copied = Vec::new();
            copied.extend(assets.into_iter().flatten().cloned());
            copied.extend(shell.into_iter().flatten().cloned());

            Ok(BuildSummary {
                cleaned: cleaned.is_some(),
                configs: configs.cloned().unwrap_or_default(),
                bundle: bundle.cloned(),
                assets: copied,
                artifact: artifact.cloned(),
            })
        });

    (blueprint, summary)
}

/// Loads the config sources of the project, plans the invocation and runs it.
pub fn run(
    invocation: Invocation,
    project: ProjectConfig,
) -> Result<(BuildSummary, Diagnostics), KilnError> {
    let sources = ConfigSource::from_project(&project);
    let env = Environment::new(invocation.mode(), project);

    let (blueprint, summary) = plan(invocation, sources);
    tracing::debug!("task graph:\n{blueprint}");

    let pipeline = blueprint.finish()?;
    let (outputs, diagnostics) = pipeline.run(&env)?;
    let summary = outputs.get(summary).cloned().unwrap_or_default();

    Ok((summary, diagnostics))
}

fn task_clean(blueprint: &mut Blueprint) -> Handle<()> {
    blueprint.task().name("clean").run(|ctx| {
        clean::clean(&ctx.env.project.dist_dir())?;
        Ok(())
    })
}

fn task_generate(
    blueprint: &mut Blueprint,
    after: Option<Handle<()>>,
    sources: Vec<ConfigSource>,
) -> Handle<Vec<Utf8PathBuf>> {
    blueprint
        .task()
        .name("generate-config")
        .depends_on(after)
        .run(move |ctx, _| {
            ctx.progress(format!("generating {} configs", sources.len()));
            Ok(generate::generate_configs(ctx.env, &sources))
        })
}

fn task_bundle(blueprint: &mut Blueprint, after: Option<Handle<Vec<Utf8PathBuf>>>) -> Handle<Bundle> {
    blueprint
        .task()
        .name("bundle-script")
        .depends_on(after)
        .run(|ctx, _| {
            ctx.progress(format!("running {}", ctx.env.project.bundler.program));
            Ok(bundle::bundle_script(ctx.env)?)
        })
}

fn task_copy_assets(
    blueprint: &mut Blueprint,
    after: Option<Handle<Vec<Utf8PathBuf>>>,
) -> Handle<Vec<Utf8PathBuf>> {
    blueprint
        .task()
        .name("copy-assets")
        .depends_on(after)
        .run(|ctx, _| {
            let project = &ctx.env.project;
            Ok(assets::copy_assets(
                &project.resolve(&project.src_app),
                &project.app_out(),
                &project.app_assets,
            )?)
        })
}

fn task_copy_shell_assets(
    blueprint: &mut Blueprint,
    after: Option<Handle<Vec<Utf8PathBuf>>>,
) -> Handle<Vec<Utf8PathBuf>> {
    blueprint
        .task()
        .name("copy-shell-assets")
        .depends_on(after)
        .run(|ctx, _| {
            let project = &ctx.env.project;
            Ok(assets::copy_assets(
                &project.resolve(&project.src_shell),
                &project.app_out(),
                &project.shell_assets,
            )?)
        })
}

fn task_package(blueprint: &mut Blueprint) -> Handle<Artifact> {
    blueprint
        .task()
        .name("package")
        .run(|ctx| Ok(package::package(ctx.env)?))
}

#[cfg(test)]
mod test {
    use std::fs;

    use camino::Utf8Path;

    use super::*;

    fn names(invocation: Invocation) -> Vec<String> {
        plan(invocation, Vec::new()).0.task_names()
    }

    #[test]
    fn test_plans() {
        assert_eq!(names(Invocation::Clean), ["clean", "clean"]);
        assert_eq!(
            names(Invocation::BuildApplication),
            ["bundle-script", "copy-assets", "build-application"]
        );
        assert_eq!(
            names(Invocation::Debug),
            [
                "generate-config",
                "bundle-script",
                "copy-assets",
                "copy-shell-assets",
                "debug"
            ]
        );
        assert_eq!(
            names(Invocation::Release),
            [
                "clean",
                "generate-config",
                "bundle-script",
                "copy-assets",
                "copy-shell-assets",
                "release"
            ]
        );
        assert_eq!(names(Invocation::PackageRelease), ["package", "package-release"]);
    }

    fn edges(invocation: Invocation) -> Vec<(String, String)> {
        let mut edges = plan(invocation, Vec::new()).0.edges();
        edges.sort();
        edges
    }

    fn edge(from: &str, to: &str) -> (String, String) {
        (from.to_string(), to.to_string())
    }

    #[test]
    fn test_profile_dependencies() {
        let steps = [
            edge("generate-config", "bundle-script"),
            edge("generate-config", "copy-assets"),
            edge("generate-config", "copy-shell-assets"),
        ];

        let debug = edges(Invocation::Debug);
        for step in &steps {
            assert!(debug.contains(step), "missing {step:?}");
        }
        assert!(!debug.iter().any(|(from, _)| from == "clean"));

        let release = edges(Invocation::Release);
        for step in &steps {
            assert!(release.contains(step), "missing {step:?}");
        }
        assert!(release.contains(&edge("clean", "generate-config")));

        // The application steps only wait on each other in the profiles.
        let application = edges(Invocation::BuildApplication);
        assert!(
            application
                .iter()
                .all(|(_, to)| to == "build-application")
        );
    }

    #[test]
    fn test_modes() {
        assert_eq!(Invocation::Release.mode(), Mode::Release);
        assert_eq!(Invocation::PackageRelease.mode(), Mode::Release);
        assert_eq!(Invocation::Debug.mode(), Mode::Debug);
        assert_eq!(Invocation::CreateConfig.mode(), Mode::Debug);
    }

    fn touch(path: &Utf8Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn fixture(root: &Utf8Path) -> ProjectConfig {
        touch(&root.join("src/app/index.js"), "console.log(1)");
        touch(&root.join("src/app/index.html"), "<html>");
        touch(&root.join("src/shell/main.js"), "main()");
        touch(&root.join("mainConfig.json"), r#"{ "devTools": true }"#);

        let mut project = ProjectConfig::at(root);
        // Stands in for the bundler, accepts any arguments.
        project.bundler.program = "true".into();
        project
    }

    #[test]
    fn test_create_config_only_writes_configs() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let (summary, _) = run(Invocation::CreateConfig, fixture(root)).unwrap();

        // renderConfig.json has no source file and is skipped.
        assert_eq!(summary.configs, vec![root.join("dist/app/mainConfig.json")]);
        assert!(!root.join("dist/app/index.html").exists());
        assert_eq!(
            fs::read_to_string(root.join("dist/app/mainConfig.json")).unwrap(),
            "{\n    \"devTools\": true\n}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_debug_profile() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let (summary, diagnostics) = run(Invocation::Debug, fixture(root)).unwrap();

        assert!(!summary.cleaned);
        assert_eq!(
            summary.bundle.map(|bundle| bundle.path),
            Some(root.join("dist/app/app.js"))
        );
        assert_eq!(
            summary.assets,
            vec![root.join("dist/app/index.html"), root.join("dist/app/main.js")]
        );
        assert!(root.join("dist/app/mainConfig.json").is_file());
        assert_eq!(diagnostics.execution_times.len(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_release_leaves_no_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        touch(&root.join("dist/app/stale.html"), "old");

        let (summary, _) = run(Invocation::Release, fixture(root)).unwrap();

        assert!(summary.cleaned);
        assert!(!root.join("dist/app/stale.html").exists());
        assert!(root.join("dist/app/index.html").is_file());
        assert_eq!(
            fs::read_to_string(root.join("dist/app/mainConfig.json")).unwrap(),
            r#"{"devTools":true}"#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_bundler_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut project = fixture(root);
        project.bundler.program = "false".into();

        let err = run(Invocation::BuildApplication, project).err().unwrap();
        assert!(matches!(&err, KilnError::Task { task, .. } if task == "bundle-script"));
    }

    #[cfg(unix)]
    #[test]
    fn test_package_after_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        run(Invocation::Debug, fixture(root)).unwrap();

        let (summary, _) = run(Invocation::PackageDebug, fixture(root)).unwrap();
        let artifact = summary.artifact.unwrap();
        assert!(!artifact.archived);
        assert!(artifact.path.join("app/index.html").is_file());

        let (summary, _) = run(Invocation::PackageRelease, fixture(root)).unwrap();
        let artifact = summary.artifact.unwrap();
        assert!(artifact.archived);
        assert!(artifact.digest.is_some());
        assert_eq!(artifact.path, root.join("dist/package/electron-app-win32-x64.zip"));
    }

    #[test]
    fn test_package_without_build_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let err = run(Invocation::PackageRelease, ProjectConfig::at(root)).err().unwrap();
        assert!(matches!(&err, KilnError::Task { task, .. } if task == "package"));
        assert!(err.to_string().contains("Nothing to package"));
    }
}
