use std::path::PathBuf;

use crate::{
    error::{EditError, InstallerError},
    host::FIREWALL_TOOL,
    options::{service_name, InstallOptions},
    paths,
    prompt::Prompt,
    ui::{Palette, Tone},
};

// ── Editable options ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    InstallDirectory,
    ConfigFile,
    ServiceFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    RandomToken,
    FirewallRule,
    EnableService,
}

/// One numbered line of the options list. Knows how to describe itself and
/// how to apply an answer to the shared [`InstallOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableOption {
    Path(PathField),
    Port,
    Toggle(Toggle),
}

impl EditableOption {
    /// The options shown for this host. The firewall line only appears when
    /// the firewall tool is installed.
    pub fn for_host(has_firewall: bool) -> Vec<EditableOption> {
        let mut list = vec![
            EditableOption::Path(PathField::InstallDirectory),
            EditableOption::Path(PathField::ConfigFile),
            EditableOption::Path(PathField::ServiceFile),
            EditableOption::Port,
            EditableOption::Toggle(Toggle::RandomToken),
        ];
        if has_firewall {
            list.push(EditableOption::Toggle(Toggle::FirewallRule));
        }
        list.push(EditableOption::Toggle(Toggle::EnableService));
        list
    }

    /// Current `(title, value)` pair.
    pub fn describe(&self, o: &InstallOptions, palette: &Palette) -> (String, String) {
        match self {
            EditableOption::Path(field) => {
                let title = match field {
                    PathField::InstallDirectory => "Install at directory",
                    PathField::ConfigFile => "Create configuration file at",
                    PathField::ServiceFile => "Create service file at",
                };
                (title.to_string(), field.current(o).display().to_string())
            }
            EditableOption::Port => ("Port to listen on".to_string(), o.port.to_string()),
            EditableOption::Toggle(toggle) => {
                let title = match toggle {
                    Toggle::RandomToken => {
                        "Use a randomly generated authentication token".to_string()
                    }
                    Toggle::FirewallRule => format!(
                        "Run {}",
                        palette.paint(format!("{FIREWALL_TOOL} allow {}/tcp", o.port), Tone::Cyan)
                    ),
                    Toggle::EnableService => format!(
                        "Run {}",
                        palette.paint(
                            format!("systemctl enable --now {}", service_name(&o.service_path)),
                            Tone::Cyan
                        )
                    ),
                };
                (title, yes_no(toggle.get(o)).to_string())
            }
        }
    }

    /// What the user is asked when editing this option.
    pub fn question(&self, palette: &Palette) -> String {
        let what = match self {
            EditableOption::Path(PathField::InstallDirectory) => "installation path",
            EditableOption::Path(PathField::ConfigFile) => "path for the config",
            EditableOption::Path(PathField::ServiceFile) => "path for the service",
            EditableOption::Port => {
                return "Enter a new port number or leave blank to use the current value"
                    .to_string()
            }
            EditableOption::Toggle(toggle) => {
                let action = match toggle {
                    Toggle::RandomToken => "to use a random token, {no} to remove authentication",
                    Toggle::FirewallRule => {
                        "to add a firewall rule for the port, {no} to skip this step"
                    }
                    Toggle::EnableService => {
                        "to enable and start the service, {no} to skip this step"
                    }
                };
                return format!(
                    "Enter {} {} or leave blank to go back without making changes",
                    palette.input_option("yes"),
                    action.replace("{no}", &palette.input_option("no"))
                );
            }
        };
        format!("Enter a new {what} or leave blank to go back without making changes")
    }

    /// Validates `input` and mutates `o`. A blank answer changes nothing and
    /// is not an error.
    pub fn apply(&self, o: &mut InstallOptions, input: &str) -> Result<(), EditError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        match self {
            EditableOption::Path(field) => {
                let path = paths::resolve(input)?;
                if paths::file_exists(&path) {
                    return Err(EditError::FileExists(path.display().to_string()));
                }
                match field {
                    PathField::InstallDirectory => o.install_directory = path,
                    PathField::ConfigFile => {
                        o.custom_config_path = true;
                        o.config_path = path;
                    }
                    PathField::ServiceFile => o.service_path = path,
                }
            }
            EditableOption::Port => o.port = parse_port(input)?,
            EditableOption::Toggle(toggle) => toggle.set(o, parse_yes_no(input)?),
        }
        Ok(())
    }
}

impl PathField {
    fn current(self, o: &InstallOptions) -> PathBuf {
        match self {
            PathField::InstallDirectory => o.install_directory.clone(),
            PathField::ConfigFile => o.effective_config_path(),
            PathField::ServiceFile => o.service_path.clone(),
        }
    }
}

impl Toggle {
    fn get(self, o: &InstallOptions) -> bool {
        match self {
            Toggle::RandomToken => o.random_token,
            Toggle::FirewallRule => o.add_firewall_rule,
            Toggle::EnableService => o.enable_service,
        }
    }

    fn set(self, o: &mut InstallOptions, value: bool) {
        match self {
            Toggle::RandomToken => o.random_token = value,
            Toggle::FirewallRule => o.add_firewall_rule = value,
            Toggle::EnableService => o.enable_service = value,
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

pub fn parse_port(input: &str) -> Result<u16, EditError> {
    match input.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(EditError::InvalidPort(input.to_string())),
    }
}

fn parse_yes_no(input: &str) -> Result<bool, EditError> {
    match input.to_lowercase().as_str() {
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        _ => Err(EditError::InvalidChoice(input.to_string())),
    }
}

// ── Editor loop ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Nothing,
    Install,
    Quit,
    Edit(usize),
    Invalid,
}

/// Lower-cases and unwraps `[...]`. The flag reports whether brackets were
/// stripped.
fn parse_command(input: &str, count: usize) -> (Command, bool) {
    let mut input = input.trim().to_lowercase();
    if input.is_empty() {
        return (Command::Nothing, false);
    }

    let bracketed = input.len() >= 3 && input.starts_with('[') && input.ends_with(']');
    if bracketed {
        input = input[1..input.len() - 1].to_string();
    }

    let command = match input.as_str() {
        "install" | "i" => Command::Install,
        "quit" | "q" => Command::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Command::Edit(n - 1),
            _ => Command::Invalid,
        },
    };
    (command, bracketed)
}

/// The numbered options screen.
pub struct OptionEditor<'a> {
    options: Vec<EditableOption>,
    palette: Palette,
    prompt: &'a mut dyn Prompt,
    /// Path fields the user changed this session, re-checked on confirm.
    edited_paths: Vec<PathField>,
}

impl<'a> OptionEditor<'a> {
    pub fn new(options: Vec<EditableOption>, palette: Palette, prompt: &'a mut dyn Prompt) -> Self {
        Self {
            options,
            palette,
            prompt,
            edited_paths: Vec::new(),
        }
    }

    /// Loops until the user confirms (`true`) or quits (`false`).
    pub fn run(&mut self, o: &mut InstallOptions) -> Result<bool, InstallerError> {
        let p = self.palette;
        let mut hinted = false;

        loop {
            println!();
            for (i, option) in self.options.iter().enumerate() {
                let (title, value) = option.describe(o, &p);
                println!("{} {}", p.input_option(&(i + 1).to_string()), p.key_value(&title, &value));
            }

            let input = self.prompt.ask(&format!(
                "You can begin the installation with the above options by typing {},\n\
                 edit any of the above options by entering their number, or quit the installer by typing {}",
                p.input_option("install"),
                p.input_option("quit"),
            ))?;

            let (command, bracketed) = parse_command(&input, self.options.len());
            if bracketed && !hinted {
                hinted = true;
                p.println(
                    "\nTIP: The square brackets are decorative, you don't have to type them, just the text inside them",
                    Tone::Muted,
                );
            }

            match command {
                Command::Nothing => continue,
                Command::Install => match self.occupied_path(o) {
                    None => return Ok(true),
                    Some(e) => p.println(format!("\nCannot install: {e}"), Tone::Red),
                },
                Command::Quit => return Ok(false),
                Command::Invalid => p.println("\nInvalid option", Tone::Red),
                Command::Edit(index) => self.edit(self.options[index], o)?,
            }
        }
    }

    /// Asks again until the answer is accepted; a blank answer always is.
    fn edit(&mut self, option: EditableOption, o: &mut InstallOptions) -> Result<(), InstallerError> {
        let question = option.question(&self.palette);
        loop {
            let answer = self.prompt.ask(&question)?;
            match option.apply(o, &answer) {
                Ok(()) => {
                    if let EditableOption::Path(field) = option {
                        if !answer.trim().is_empty() && !self.edited_paths.contains(&field) {
                            self.edited_paths.push(field);
                        }
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("rejected edit of {option:?}: {e}");
                    self.palette
                        .println(format!("\nError editing option: {e}"), Tone::Red);
                }
            }
        }
    }

    /// A file that appeared at a user-chosen path since it was accepted.
    /// Default paths are not checked, so a reinstall keeps working.
    fn occupied_path(&self, o: &InstallOptions) -> Option<EditError> {
        self.edited_paths.iter().find_map(|field| {
            let path = field.current(o);
            paths::file_exists(&path).then(|| EditError::FileExists(path.display().to_string()))
        })
    }
}
