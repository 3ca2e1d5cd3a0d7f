//! Patient command handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use medkit_domain::{DeviceProfile, Identifier, Image, Name, NameFormat, PatientProfile};

use crate::cli::{GlobalOpts, PatientsArgs, PatientsCommand, PhotoArgs};
use crate::error::CliError;
use crate::output;
use crate::store::Session;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PatientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Birthdate")]
    birthdate: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Notify")]
    notify: String,
}

impl PatientRow {
    fn new(p: &PatientProfile, format: NameFormat, color: bool) -> Self {
        Self {
            id: p.identifier.to_string(),
            name: p.name.formatted(format),
            birthdate: p.birthdate.map(|d| d.to_string()).unwrap_or_default(),
            devices: p.devices.len(),
            notify: output::flag(p.notification_enabled, color),
        }
    }
}

fn photo_summary(photo: Option<&Image>) -> String {
    match photo {
        Some(Image::Symbolic(name)) => format!("named '{name}'"),
        Some(Image::Data(data)) => format!("data ({} bytes)", data.len()),
        None => "-".into(),
    }
}

fn detail(p: &PatientProfile, format: NameFormat, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:            {}", p.identifier);
    let _ = writeln!(out, "Name:          {}", p.name.formatted(format));
    let birthdate = p.birthdate.map_or_else(|| "-".into(), |d| d.to_string());
    let _ = writeln!(out, "Birthdate:     {birthdate}");
    let _ = writeln!(out, "Photo:         {}", photo_summary(p.photo.as_ref()));
    let _ = writeln!(
        out,
        "Notifications: {}",
        output::flag(p.notification_enabled, color)
    );
    if p.devices.is_empty() {
        let _ = write!(out, "Devices:       -");
    } else {
        let _ = write!(out, "Devices:");
        for d in &p.devices {
            let _ = write!(
                out,
                "\n  {}  {}  {}  {}",
                d.identifier,
                d.name.as_deref().unwrap_or("-"),
                d.model.as_deref().unwrap_or("-"),
                d.manufacturer.as_deref().unwrap_or("-"),
            );
        }
    }
    out
}

fn render_patient(profile: &PatientProfile, format: NameFormat, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        profile,
        |p| detail(p, format, color),
        |p| p.identifier.to_string(),
    );
    output::print_output(&out, global.quiet);
}

/// Merge optional name parts over the current name.
fn merged_name(current: Name, first: Option<String>, last: Option<String>) -> Name {
    Name {
        first: first.or(current.first),
        last: last.or(current.last),
    }
}

fn photo_from_args(args: PhotoArgs) -> Result<Option<Image>, CliError> {
    if args.clear {
        return Ok(None);
    }
    if let Some(path) = args.file {
        let data = std::fs::read(&path)?;
        return Ok(Some(Image::from_bytes(data)));
    }
    Ok(args.named.map(Image::named))
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    session: &Session,
    args: PatientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let runtime = session.runtime();
    let directory = runtime.directory();
    let format = runtime.config().name_format;

    match args.command {
        PatientsCommand::List { text } => {
            let patients = directory.search(text.as_deref()).await?;
            let profiles: Vec<PatientProfile> = patients.iter().map(|p| p.profile()).collect();
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &profiles,
                |p| PatientRow::new(p, format, color),
                |p| p.identifier.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PatientsCommand::Get { id } => {
            let patient = util::find_patient(directory, &id).await?;
            render_patient(&patient.profile(), format, global);
            Ok(())
        }

        PatientsCommand::Show { file } => {
            let value = util::read_json_file(&file)?;
            let profile = PatientProfile::from_value(value)?;
            let patient = directory.find_patient(profile);
            render_patient(&patient.profile(), format, global);
            Ok(())
        }

        PatientsCommand::Add {
            id,
            first,
            last,
            birthdate,
            from_file,
        } => {
            let profile = if let Some(path) = from_file {
                PatientProfile::from_value(util::read_json_file(&path)?)?
            } else {
                let identifier = id.map_or_else(Identifier::generate, Identifier::new);
                let mut profile = PatientProfile::new(identifier, Name { first, last });
                profile.birthdate = birthdate;
                profile
            };

            let patient = directory.find_patient(profile);
            directory.add_patient(&patient).await?;
            output::status(global, &format!("Patient '{}' added", patient.identifier()));
            output::print_output(&patient.identifier().to_string(), global.quiet);
            Ok(())
        }

        PatientsCommand::Remove { id } => {
            let patient = util::find_patient(directory, &id).await?;
            let prompt = format!(
                "Remove patient '{}' ({})?",
                id,
                runtime.display_name(&patient)
            );
            if !util::confirm(&prompt, "patients remove", global)? {
                return Ok(());
            }
            directory.remove_patient(&patient).await?;
            output::status(global, &format!("Patient '{id}' removed"));
            Ok(())
        }

        PatientsCommand::Rename { id, first, last } => {
            if first.is_none() && last.is_none() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "give --first, --last or both".into(),
                });
            }
            let patient = util::find_patient(directory, &id).await?;
            patient
                .update_name(merged_name(patient.name(), first, last))
                .await?;
            output::status(
                global,
                &format!("Patient '{id}' renamed to {}", runtime.display_name(&patient)),
            );
            Ok(())
        }

        PatientsCommand::Photo { id, photo } => {
            let patient = util::find_patient(directory, &id).await?;
            let image = photo_from_args(photo)?;
            let cleared = image.is_none();
            patient.update_photo(image).await?;
            let verb = if cleared { "cleared" } else { "updated" };
            output::status(global, &format!("Photo for patient '{id}' {verb}"));
            Ok(())
        }

        PatientsCommand::Notify { id, state } => {
            let patient = util::find_patient(directory, &id).await?;
            patient.enable_notification(state.enabled()).await?;
            let verb = if state.enabled() { "enabled" } else { "disabled" };
            output::status(global, &format!("Notifications {verb} for patient '{id}'"));
            Ok(())
        }

        PatientsCommand::AssignDevice {
            id,
            devices,
            name,
            model,
            manufacturer,
        } => {
            let patient = util::find_patient(directory, &id).await?;
            let mut resolved: Vec<_> = devices
                .iter()
                .map(|device_id| {
                    runtime.devices().resolve(DeviceProfile {
                        identifier: Identifier::new(device_id.as_str()),
                        name: name.clone(),
                        model: model.clone(),
                        manufacturer: manufacturer.clone(),
                    })
                })
                .collect();

            if resolved.len() == 1 {
                if let Some(device) = resolved.pop() {
                    patient.assign_device(device).await?;
                }
            } else {
                patient.assign_devices(resolved).await?;
            }
            output::status(
                global,
                &format!("Assigned {} to patient '{id}'", devices.join(", ")),
            );
            Ok(())
        }
    }
}
