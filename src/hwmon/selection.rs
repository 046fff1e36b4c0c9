// Sensor selection by label substring.
//
// Policy: walk the sensors in provider order and take the first one whose
// kind matches and whose name contains any of the rule's labels. Provider
// naming is vendor-specific, so the label lists come from config
// (`[sensors]`); changing them changes which sensor is reported.

use super::{Sensor, SensorKind};

#[derive(Debug, Clone, PartialEq)]
pub struct SensorRule {
    pub kind: SensorKind,
    pub labels: Vec<String>,
}

impl SensorRule {
    pub fn new<I, S>(kind: SensorKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, sensor: &Sensor) -> bool {
        sensor.kind == self.kind && self.labels.iter().any(|l| sensor.name.contains(l.as_str()))
    }
}

/// First sensor matching `rule`, or `None`.
pub fn select_sensor<'a>(sensors: &'a [Sensor], rule: &SensorRule) -> Option<&'a Sensor> {
    sensors.iter().find(|s| rule.matches(s))
}
