use crate::extract::{
    extract_duration, extract_json_object, extract_neighbor_fields, json_f64, json_u64,
};
use crate::sample::Sample;
use crate::transport::{CoapTransport, Resource};

/// The si7021 endpoint reports milli-degrees and milli-percent.
const MILLI_PER_UNIT: f64 = 1000.0;

/// Builds one [`Sample`] per call from five sequential node queries.
#[derive(Debug, Clone)]
pub struct Collector<T> {
    transport: T,
}

impl<T: CoapTransport> Collector<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Never fails: every value that cannot be fetched or parsed is zero.
    pub async fn collect_sample(&self) -> Sample {
        let (temperature, humidity) = self.read_sensor().await;

        let disconnected_total =
            extract_duration(&self.transport.fetch(Resource::DisconnectedTotal).await);
        let connected_total =
            extract_duration(&self.transport.fetch(Resource::ConnectedTotal).await);

        let (rsl_in, rsl_out, rpl_rank) =
            extract_neighbor_fields(&self.transport.fetch(Resource::Neighbor).await);

        let hopcount = self.read_hopcount().await;

        let sample = Sample {
            temperature,
            humidity,
            disconnected_total,
            connected_total,
            rsl_in,
            rsl_out,
            rpl_rank,
            hopcount,
        };

        tracing::info!(
            temperature_c = sample.temperature,
            humidity_pct = sample.humidity,
            disconnected_total_min = sample.disconnected_total,
            rsl_in_dbm = sample.rsl_in,
            rsl_out_dbm = sample.rsl_out,
            rpl_rank = sample.rpl_rank,
            hopcount = sample.hopcount,
            connected_total_min = sample.connected_total,
            "collected node data"
        );

        sample
    }

    async fn read_sensor(&self) -> (f64, f64) {
        let raw = self.transport.fetch(Resource::Sensor).await;
        match extract_json_object(&raw).filter(|object| !object.is_empty()) {
            Some(object) => (
                json_f64(&object, "temperature_mc") / MILLI_PER_UNIT,
                json_f64(&object, "humidity_mrh") / MILLI_PER_UNIT,
            ),
            None => {
                tracing::warn!("could not parse sensor JSON");
                (0.0, 0.0)
            }
        }
    }

    async fn read_hopcount(&self) -> u64 {
        let raw = self.transport.fetch(Resource::Status).await;
        match extract_json_object(&raw).filter(|object| !object.is_empty()) {
            Some(object) => json_u64(&object, "hopcount"),
            None => {
                tracing::warn!("could not parse hopcount JSON");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    fn healthy_node() -> ScriptedTransport {
        ScriptedTransport::new()
            .respond(
                Resource::Sensor,
                "Response: 2.05 Content\n{\"temperature_mc\": 23500, \"humidity_mrh\": 55200}",
            )
            .respond(Resource::DisconnectedTotal, "0-00:01:30")
            .respond(Resource::ConnectedTotal, "0-00:18:09")
            .respond(
                Resource::Neighbor,
                r#"{"type": "parent", "rsl_in": -70, "rsl_out": -65, "rpl_rank": 512}"#,
            )
            .respond(
                Resource::Status,
                r#"{"connected": "0-00:18:09", "hopcount": 2, "ip": "fd12::2"}"#,
            )
    }

    #[tokio::test]
    async fn sensor_milli_units_are_scaled() {
        let collector = Collector::new(healthy_node());
        let sample = collector.collect_sample().await;
        assert_eq!(sample.temperature, 23.5);
        assert_eq!(sample.humidity, 55.2);
    }

    #[tokio::test]
    async fn healthy_node_fills_every_field() {
        let collector = Collector::new(healthy_node());
        let sample = collector.collect_sample().await;
        assert_eq!(
            sample,
            Sample {
                temperature: 23.5,
                humidity: 55.2,
                disconnected_total: 1.5,
                connected_total: 18.15,
                rsl_in: -70,
                rsl_out: -65,
                rpl_rank: 512,
                hopcount: 2,
            }
        );
    }

    #[tokio::test]
    async fn resources_are_queried_once_in_order() {
        let collector = Collector::new(healthy_node());
        collector.collect_sample().await;
        assert_eq!(collector.transport().calls(), Resource::ALL.to_vec());
    }

    #[tokio::test]
    async fn dead_node_yields_zeroed_sample() {
        let collector = Collector::new(ScriptedTransport::new());
        let sample = collector.collect_sample().await;
        assert_eq!(sample, Sample::default());
        assert!(sample.is_finite());
    }

    #[tokio::test]
    async fn garbage_responses_yield_zeroed_sample() {
        let mut transport = ScriptedTransport::new();
        for resource in Resource::ALL {
            transport = transport.respond(resource, "4.04 Not Found {broken");
        }
        let sample = Collector::new(transport).collect_sample().await;
        assert_eq!(sample, Sample::default());
    }

    #[tokio::test]
    async fn missing_subfields_default_to_zero() {
        let transport = healthy_node()
            .respond(Resource::Sensor, r#"{"temperature_mc": 21000}"#)
            .respond(Resource::Status, r#"{"hopcount": "not-a-number"}"#);
        let sample = Collector::new(transport).collect_sample().await;
        assert_eq!(sample.temperature, 21.0);
        assert_eq!(sample.humidity, 0.0);
        assert_eq!(sample.hopcount, 0);
        assert_eq!(sample.rpl_rank, 512);
    }
}
