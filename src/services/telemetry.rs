/// Structured usage events, written to the `telemetry` log target.
#[derive(Debug, Clone, Default)]
pub struct Telemetry;

impl Telemetry {
    pub fn track_event(&self, name: &str, properties: &[(&str, &str)]) {
        let props = properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!(target: "telemetry", "event={} {}", name, props);
    }
}
