use std::path::Path;

use crate::{
    cmd::{CommandRunner, SystemRunner},
    editor::{EditableOption, OptionEditor},
    error::InstallerError,
    host::HostFacts,
    options::InstallOptions,
    progress::{ProgressRunner, ProgressView, SpinnerView, StepOutcome},
    prompt::{Prompt, TerminalPrompt},
    steps::{
        activate, files,
        generate::{self, Artifacts},
        health::{self, HealthPolicy, HealthProbe, HttpProbe},
        preflight,
        report::{self, InstallReport},
    },
    templates::Templates,
    ui::{Palette, Tone},
};

/// How an installation session ended.
#[derive(Debug)]
pub enum Outcome {
    Cancelled,
    Installed(InstallReport),
}

/// Drives one installation session: edit, generate, write, activate.
pub struct Installer<'a, V> {
    palette: Palette,
    prompt: &'a mut dyn Prompt,
    runner: &'a dyn CommandRunner,
    probe: &'a dyn HealthProbe,
    health: HealthPolicy,
    progress: ProgressRunner<V>,
    has_firewall: bool,
}

impl<'a, V: ProgressView> Installer<'a, V> {
    pub fn new(
        palette: Palette,
        prompt: &'a mut dyn Prompt,
        runner: &'a dyn CommandRunner,
        probe: &'a dyn HealthProbe,
        progress: ProgressRunner<V>,
        has_firewall: bool,
    ) -> Self {
        Self {
            palette,
            prompt,
            runner,
            probe,
            health: HealthPolicy::default(),
            progress,
            has_firewall,
        }
    }

    pub fn with_health_policy(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    #[cfg(test)]
    pub fn progress(&self) -> &ProgressRunner<V> {
        &self.progress
    }

    pub fn run(
        &mut self,
        mut options: InstallOptions,
        templates: &Templates,
        current_exe: &Path,
    ) -> Result<Outcome, InstallerError> {
        let palette = self.palette;

        // ── Edit ──────────────────────────────────────────────────────────────
        println!("Installation of the luna Agent will use the following default options:");
        let confirmed = OptionEditor::new(
            EditableOption::for_host(self.has_firewall),
            palette,
            &mut *self.prompt,
        )
        .run(&mut options)?;

        if !confirmed {
            palette.println("\nInstallation cancelled", Tone::Red);
            return Ok(Outcome::Cancelled);
        }

        options.finalize();
        let options = options;
        log::debug!(
            "installing into {} with service {}",
            options.install_directory.display(),
            options.service_name
        );
        println!();

        // ── Generate ──────────────────────────────────────────────────────────
        let mut artifacts = Artifacts::default();
        let generated = self.progress.run("Generating file contents", || {
            match generate::render_all(templates, &options) {
                Ok(rendered) => {
                    artifacts = rendered;
                    StepOutcome::done()
                }
                Err(e) => StepOutcome::failed(&palette, e),
            }
        });
        if !generated {
            return Err(InstallerError::StepFailed(
                "cannot continue without generating file contents".into(),
            ));
        }

        // ── Filesystem ────────────────────────────────────────────────────────
        if !self.progress.run("Creating installation directory", || {
            files::create_directory(&options, &palette)
        }) {
            return Err(InstallerError::StepFailed(
                "cannot continue without creating installation directory".into(),
            ));
        }

        if !self.progress.run("Creating installation files", || {
            match files::write_all(&options, &artifacts, current_exe) {
                Ok(()) => StepOutcome::done(),
                Err(e) => StepOutcome::failed(&palette, e),
            }
        }) {
            return Err(InstallerError::StepFailed(
                "cannot continue without necessary installation files".into(),
            ));
        }

        // ── Activation (soft failures only) ───────────────────────────────────
        let runner = self.runner;
        let firewall_rule_added = self.has_firewall
            && options.add_firewall_rule
            && self.progress.run("Adding firewall rule", || {
                activate::allow_port(runner, options.port, &palette)
            });

        let mut service_started = None;
        let mut healthy = None;
        if options.enable_service {
            let started = self.progress.run("Enabling and starting service", || {
                activate::enable_service(runner, &options.service_name, &palette)
            });
            service_started = Some(started);

            if started {
                let probe = self.probe;
                let policy = self.health;
                let token = Some(options.auth_token.as_str()).filter(|t| !t.is_empty());
                healthy = Some(self.progress.run("Checking if agent is running", || {
                    match health::verify(probe, options.port, token, &policy) {
                        Ok(_) => StepOutcome::success("OK"),
                        Err(e) => StepOutcome::failed_as(
                            palette.paint(format!("FAILED AFTER {} TRIES", policy.attempts), Tone::Red),
                            e,
                        ),
                    }
                }));
            }
        }

        Ok(Outcome::Installed(InstallReport {
            registry_entry: String::from_utf8_lossy(&artifacts.registry_entry).into_owned(),
            options,
            firewall_rule_added,
            service_started,
            healthy,
        }))
    }
}

/// The `install` command: preconditions, host probing, then the session.
pub fn init(palette: Palette) -> Result<(), InstallerError> {
    println!();

    let current_exe = preflight::check()?;
    let templates = Templates::load()?;
    let facts = HostFacts::probe();
    let options = InstallOptions::from_host(&facts);

    let policy = HealthPolicy::default();
    let mut prompt = TerminalPrompt::new(palette);
    let runner = SystemRunner;
    let probe = HttpProbe::new(policy.timeout);

    let mut installer = Installer::new(
        palette,
        &mut prompt,
        &runner,
        &probe,
        ProgressRunner::new(SpinnerView::new(palette)),
        facts.has_firewall,
    )
    .with_health_policy(policy);

    match installer.run(options, &templates, &current_exe)? {
        Outcome::Cancelled => {}
        Outcome::Installed(summary) => report::announce(&summary, &palette),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, time::Duration};

    use super::*;
    use crate::{
        cmd::recording::RecordingRunner,
        progress::recording::RecordingView,
        prompt::scripted::ScriptedPrompt,
        steps::health::scripted::ScriptedProbe,
    };

    struct Sandbox {
        _root: tempfile::TempDir,
        options: InstallOptions,
        exe: PathBuf,
    }

    fn sandbox() -> Sandbox {
        let root = tempfile::tempdir().unwrap();
        let units = root.path().join("systemd");
        fs::create_dir(&units).unwrap();
        let exe = root.path().join("luna-agent");
        fs::write(&exe, b"agent binary").unwrap();

        let options = InstallOptions {
            install_directory: root.path().join("opt/luna-agent"),
            service_path: units.join("luna-agent.service"),
            hostname: "pi".into(),
            local_address: "10.0.0.5".into(),
            ..InstallOptions::default()
        };
        Sandbox {
            _root: root,
            options,
            exe,
        }
    }

    fn quick() -> HealthPolicy {
        HealthPolicy {
            settle: Duration::ZERO,
            interval: Duration::ZERO,
            ..HealthPolicy::default()
        }
    }

    fn install(
        answers: &[&str],
        sandbox: &Sandbox,
        runner: &RecordingRunner,
        probe: &ScriptedProbe,
        has_firewall: bool,
    ) -> (Result<Outcome, InstallerError>, Vec<String>) {
        let templates = Templates::load().unwrap();
        let mut prompt = ScriptedPrompt::new(answers);
        let progress = ProgressRunner::with_tick(RecordingView::default(), Duration::from_millis(5));
        let mut installer = Installer::new(
            Palette::plain(),
            &mut prompt,
            runner,
            probe,
            progress,
            has_firewall,
        )
        .with_health_policy(quick());

        let result = installer.run(sandbox.options.clone(), &templates, &sandbox.exe);
        let labels = installer
            .progress()
            .view()
            .finished()
            .iter()
            .map(|(label, _)| label.to_string())
            .collect();
        (result, labels)
    }

    fn installed(result: Result<Outcome, InstallerError>) -> InstallReport {
        match result.unwrap() {
            Outcome::Installed(report) => report,
            Outcome::Cancelled => panic!("installation was cancelled"),
        }
    }

    #[test]
    fn confirm_immediately_installs_and_verifies() {
        let sb = sandbox();
        let runner = RecordingRunner::default();
        let probe = ScriptedProbe::healthy();

        let (result, labels) = install(&["install"], &sb, &runner, &probe, false);
        let report = installed(result);
        let o = &report.options;

        let config = fs::read_to_string(&o.config_path).unwrap();
        assert!(config.contains("port: 27973"));
        assert_eq!(o.auth_token.len(), 32);
        assert!(config.contains(&format!("token: {}", o.auth_token)));

        let unit = fs::read_to_string(&sb.options.service_path).unwrap();
        assert!(unit.contains(&format!("ExecStart={}", o.binary_path.display())));
        assert_eq!(fs::read(&o.binary_path).unwrap(), b"agent binary");
        assert!(o.uninstall_script_path.is_file());

        assert_eq!(runner.calls(), vec![vec!["systemctl", "enable", "--now", "luna-agent"]]);
        assert_eq!(probe.call_count(), 1);
        assert_eq!(
            probe.calls.lock().unwrap()[0],
            (27973, Some(o.auth_token.clone()))
        );

        assert_eq!(report.service_started, Some(true));
        assert_eq!(report.healthy, Some(true));
        assert!(!report.firewall_rule_added);
        assert!(report.registry_entry.contains("url: http://10.0.0.5:27973"));
        assert_eq!(
            labels,
            [
                "Generating file contents",
                "Creating installation directory",
                "Creating installation files",
                "Enabling and starting service",
                "Checking if agent is running",
            ]
        );
    }

    #[test]
    fn cancel_touches_nothing() {
        let sb = sandbox();
        let runner = RecordingRunner::default();
        let probe = ScriptedProbe::healthy();

        let (result, labels) = install(&["q"], &sb, &runner, &probe, true);
        assert!(matches!(result.unwrap(), Outcome::Cancelled));
        assert!(labels.is_empty());
        assert!(!sb.options.install_directory.exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn firewall_failure_is_soft() {
        let sb = sandbox();
        let runner = RecordingRunner::default().failing("ufw", 1, "ERROR: not enabled");
        let probe = ScriptedProbe::healthy();

        let mut options = sb.options.clone();
        options.add_firewall_rule = true;
        let sb = Sandbox { options, ..sb };

        let (result, labels) = install(&["i"], &sb, &runner, &probe, true);
        let report = installed(result);

        assert!(!report.firewall_rule_added);
        assert_eq!(report.healthy, Some(true));
        assert!(labels.contains(&"Adding firewall rule".to_string()));
        assert_eq!(runner.calls()[0], vec!["ufw", "allow", "27973/tcp"]);
    }

    #[test]
    fn service_failure_skips_health_check() {
        let sb = sandbox();
        let runner = RecordingRunner::default().failing("systemctl", 1, "boom");
        let probe = ScriptedProbe::healthy();

        let (result, labels) = install(&["i"], &sb, &runner, &probe, false);
        let report = installed(result);

        assert_eq!(report.service_started, Some(false));
        assert_eq!(report.healthy, None);
        assert_eq!(probe.call_count(), 0);
        assert!(!labels.contains(&"Checking if agent is running".to_string()));
    }

    #[test]
    fn unhealthy_agent_is_reported_not_fatal() {
        let sb = sandbox();
        let runner = RecordingRunner::default();
        let probe = ScriptedProbe::failing_with(&[500, 500, 500]);

        let (result, _) = install(&["i"], &sb, &runner, &probe, false);
        let report = installed(result);
        assert_eq!(report.healthy, Some(false));
        assert_eq!(probe.call_count(), 3);
    }

    #[test]
    fn disabled_service_and_token_skip_activation() {
        let sb = sandbox();
        let runner = RecordingRunner::default();
        let probe = ScriptedProbe::healthy();

        let (result, _) = install(&["5", "no", "6", "no", "install"], &sb, &runner, &probe, false);
        let report = installed(result);

        assert!(report.options.auth_token.is_empty());
        assert_eq!(report.service_started, None);
        assert!(runner.calls().is_empty());
        let config = fs::read_to_string(&report.options.config_path).unwrap();
        assert!(!config.contains("token"));
    }

    #[test]
    fn file_failure_aborts_before_activation() {
        let sb = sandbox();
        let mut options = sb.options.clone();
        options.service_path = sb.options.install_directory.join("missing/luna-agent.service");
        let sb = Sandbox { options, ..sb };
        let runner = RecordingRunner::default();
        let probe = ScriptedProbe::healthy();

        let (result, labels) = install(&["i"], &sb, &runner, &probe, false);
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "cannot continue without necessary installation files");
        assert_eq!(labels.last().map(String::as_str), Some("Creating installation files"));
        assert!(runner.calls().is_empty());
    }
}
