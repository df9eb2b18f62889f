use crate::{
    error::TemplateError,
    options::InstallOptions,
    templates::{Artifact, Templates},
};

/// Rendered contents of every artifact, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub service_unit: Vec<u8>,
    pub config: Vec<u8>,
    pub registry_entry: Vec<u8>,
    pub uninstall_script: Vec<u8>,
}

/// Files on disk end with a newline; the registry entry is only printed.
pub fn render_all(templates: &Templates, options: &InstallOptions) -> Result<Artifacts, TemplateError> {
    let file = |artifact| -> Result<Vec<u8>, TemplateError> {
        let mut bytes = templates.render(artifact, options)?;
        bytes.push(b'\n');
        Ok(bytes)
    };

    Ok(Artifacts {
        service_unit: file(Artifact::ServiceUnit)?,
        config: file(Artifact::AgentConfig)?,
        registry_entry: templates.render(Artifact::RegistryEntry, options)?,
        uninstall_script: file(Artifact::UninstallScript)?,
    })
}
