/// One aggregated telemetry record, built fresh every polling cycle.
///
/// Every field defaults to zero, so a record is always fully populated even
/// when the node answered nothing at all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Minutes spent disconnected from the mesh.
    pub disconnected_total: f64,
    /// Minutes spent connected to the mesh.
    pub connected_total: f64,
    /// Received signal level from the parent, dBm.
    pub rsl_in: i64,
    /// Received signal level at the parent, dBm.
    pub rsl_out: i64,
    pub rpl_rank: u64,
    pub hopcount: u64,
}

impl Sample {
    /// Channel field assignment used by the ingestion endpoint
    /// (`field1`..`field8`).
    pub fn channel_fields(&self) -> [(&'static str, String); 8] {
        [
            ("field1", self.temperature.to_string()),
            ("field2", self.humidity.to_string()),
            ("field3", self.disconnected_total.to_string()),
            ("field4", self.rsl_in.to_string()),
            ("field5", self.rsl_out.to_string()),
            ("field6", self.rpl_rank.to_string()),
            ("field7", self.hopcount.to_string()),
            ("field8", self.connected_total.to_string()),
        ]
    }

    #[cfg(test)]
    pub(crate) fn is_finite(&self) -> bool {
        [
            self.temperature,
            self.humidity,
            self.disconnected_total,
            self.connected_total,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}
