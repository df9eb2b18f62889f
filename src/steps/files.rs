use std::path::Path;

use crate::{
    error::InstallerError,
    fsops::{copy_file, create_file_if_absent, ensure_dir},
    options::InstallOptions,
    progress::StepOutcome,
    steps::generate::Artifacts,
    ui::Palette,
};

pub const DIRECTORY_MODE: u32 = 0o755;
pub const UNIT_MODE: u32 = 0o644;
pub const BINARY_MODE: u32 = 0o755;
/// The config holds the auth token.
pub const CONFIG_MODE: u32 = 0o600;
pub const SCRIPT_MODE: u32 = 0o744;

/// Creates the install directory unless it is already there.
pub fn create_directory(options: &InstallOptions, palette: &Palette) -> StepOutcome {
    match ensure_dir(&options.install_directory, DIRECTORY_MODE) {
        Ok(true) => StepOutcome::done(),
        Ok(false) => StepOutcome::success("SKIPPED (already exists)"),
        Err(e) => StepOutcome::failed(palette, e),
    }
}

/// Writes the unit, binary, config and uninstall script. Existing unit,
/// config and script files are kept; the binary is always replaced.
pub fn write_all(
    options: &InstallOptions,
    artifacts: &Artifacts,
    current_exe: &Path,
) -> Result<(), InstallerError> {
    create_file_if_absent(&options.service_path, &artifacts.service_unit, UNIT_MODE)?;
    copy_file(current_exe, &options.binary_path, BINARY_MODE)?;
    create_file_if_absent(&options.config_path, &artifacts.config, CONFIG_MODE)?;
    create_file_if_absent(
        &options.uninstall_script_path,
        &artifacts.uninstall_script,
        SCRIPT_MODE,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use super::*;

    fn options_in(root: &Path) -> InstallOptions {
        let mut o = InstallOptions {
            install_directory: root.join("agent"),
            service_path: root.join("luna-agent.service"),
            ..InstallOptions::default()
        };
        o.finalize();
        o
    }

    fn artifacts() -> Artifacts {
        Artifacts {
            service_unit: b"unit\n".to_vec(),
            config: b"config\n".to_vec(),
            registry_entry: b"entry".to_vec(),
            uninstall_script: b"script\n".to_vec(),
        }
    }

    #[test]
    fn directory_step_reports_skip_when_present() {
        let root = tempfile::tempdir().unwrap();
        let o = options_in(root.path());
        let p = Palette::plain();

        assert_eq!(create_directory(&o, &p), StepOutcome::done());
        assert_eq!(create_directory(&o, &p).text, "SKIPPED (already exists)");
    }

    #[test]
    fn writes_every_file_with_its_mode() {
        let root = tempfile::tempdir().unwrap();
        let o = options_in(root.path());
        let exe = root.path().join("exe");
        fs::write(&exe, b"\x7fELF").unwrap();
        fs::create_dir(&o.install_directory).unwrap();

        write_all(&o, &artifacts(), &exe).unwrap();

        for (path, contents, mode) in [
            (&o.service_path, &b"unit\n"[..], UNIT_MODE),
            (&o.binary_path, &b"\x7fELF"[..], BINARY_MODE),
            (&o.config_path, &b"config\n"[..], CONFIG_MODE),
            (&o.uninstall_script_path, &b"script\n"[..], SCRIPT_MODE),
        ] {
            assert_eq!(fs::read(path).unwrap(), contents, "{}", path.display());
            let actual = fs::metadata(path).unwrap().permissions().mode() & 0o777;
            assert_eq!(actual, mode, "{}", path.display());
        }
    }

    #[test]
    fn rerun_keeps_edited_config_but_replaces_binary() {
        let root = tempfile::tempdir().unwrap();
        let o = options_in(root.path());
        let exe = root.path().join("exe");
        fs::create_dir(&o.install_directory).unwrap();
        fs::write(&exe, b"v1").unwrap();
        write_all(&o, &artifacts(), &exe).unwrap();

        fs::write(&o.config_path, b"hand edited").unwrap();
        fs::write(&exe, b"v2").unwrap();
        write_all(&o, &artifacts(), &exe).unwrap();

        assert_eq!(fs::read(&o.config_path).unwrap(), b"hand edited");
        assert_eq!(fs::read(&o.binary_path).unwrap(), b"v2");
    }

    #[test]
    fn missing_install_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let o = options_in(root.path());
        let exe = root.path().join("exe");
        fs::write(&exe, b"x").unwrap();

        assert!(write_all(&o, &artifacts(), &exe).is_err());
    }
}
