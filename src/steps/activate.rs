use crate::{
    cmd::{CommandOutput, CommandRunner},
    error::InstallerError,
    host::FIREWALL_TOOL,
    progress::StepOutcome,
    ui::{Palette, Tone},
};

/// `FAILED (exit status N)` with the command's stderr underneath.
fn command_outcome(palette: &Palette, result: Result<CommandOutput, InstallerError>) -> StepOutcome {
    match result {
        Ok(out) if out.success() => StepOutcome::done(),
        Ok(out) => {
            let detail = if out.stderr.is_empty() {
                out.status_text()
            } else {
                out.stderr.clone()
            };
            StepOutcome::failed_as(
                palette.paint(format!("FAILED ({})", out.status_text()), Tone::Red),
                detail,
            )
        }
        Err(e) => StepOutcome::failed(palette, e),
    }
}

/// `ufw allow <port>/tcp`.
pub fn allow_port(runner: &dyn CommandRunner, port: u16, palette: &Palette) -> StepOutcome {
    let rule = format!("{port}/tcp");
    command_outcome(palette, runner.run(FIREWALL_TOOL, &["allow", &rule]))
}

/// `systemctl enable --now <name>`.
pub fn enable_service(runner: &dyn CommandRunner, service_name: &str, palette: &Palette) -> StepOutcome {
    command_outcome(
        palette,
        runner.run("systemctl", &["enable", "--now", service_name]),
    )
}
