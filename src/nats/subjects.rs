// Topic <-> subject mapping
//
// Topics use '/' between levels and '+' as the single-level wildcard.
// NATS subjects use '.' between tokens and '*' as the single-token wildcard.
// Entity ids never contain either separator, so the mapping is lossless.

/// `heating_system/u1/control` -> `heating_system.u1.control`
pub fn topic_to_subject(topic: &str) -> String {
    topic
        .split('/')
        .map(|level| if level == "+" { "*" } else { level })
        .collect::<Vec<_>>()
        .join(".")
}

/// `temperature_meter.u1` -> `temperature_meter/u1`
pub fn subject_to_topic(subject: &str) -> String {
    subject.replace('.', "/")
}
