use crate::{
    options::InstallOptions,
    ui::{print_banner, Palette, Tone},
};

/// What a finished installation did, used for the closing summary.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub options: InstallOptions,
    pub firewall_rule_added: bool,
    /// `None` when the service step was not requested.
    pub service_started: Option<bool>,
    /// `None` when the health check did not run.
    pub healthy: Option<bool>,
    pub registry_entry: String,
}

pub fn print(report: &InstallReport, palette: &Palette) {
    print!("{}", render(report, palette));
}

/// The summary as printed, one line per entry.
pub fn render(report: &InstallReport, palette: &Palette) -> String {
    let o = &report.options;
    let mut out = String::new();

    if !report.firewall_rule_added {
        out.push_str(&format!(
            "\n{}Make sure port {} is open to incoming connections\n",
            palette.paint("NOTE: ", Tone::Red),
            palette.paint(format!("{}/tcp", o.port), Tone::Cyan),
        ));
    }
    if report.service_started == Some(false) || report.healthy == Some(false) {
        out.push_str(&format!(
            "{}Check the service status with {}\n",
            palette.paint("NOTE: ", Tone::Red),
            palette.paint(format!("systemctl status {}", o.service_name), Tone::Cyan),
        ));
    }

    out.push_str(&format!(
        "\nTo uninstall the agent run {}\n",
        palette.paint(format!("sudo {}", o.uninstall_script_path.display()), Tone::Cyan)
    ));
    out.push_str("\nAdd the following entry to your servers list in luna.yml:\n\n");
    out.push_str(&palette.paint(&report.registry_entry, Tone::Cyan));
    out.push('\n');
    out
}

/// Banner plus summary.
pub fn announce(report: &InstallReport, palette: &Palette) {
    print_banner(palette, "Installation completed");
    print(report, palette);
}
