use sysinfo::Components;

/// Prints every temperature sensor the host exposes.
pub fn print() {
    let components = Components::new_with_refreshed_list();
    let readings: Vec<(String, f32)> = components
        .list()
        .iter()
        .map(|c| (c.label().to_string(), c.temperature()))
        .collect();
    print!("{}", render(&readings));
}

pub fn render(readings: &[(String, f32)]) -> String {
    if readings.is_empty() {
        return "No sensors found\n".to_string();
    }

    let mut out = String::from("Sensors found:\n");
    for (label, celsius) in readings {
        out.push_str(&format!(" {label}: {celsius:.1}°C\n"));
    }
    out
}
