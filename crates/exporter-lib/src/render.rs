//! Text exposition through the `prometheus` encoder

use crate::family::{MetricFamily, MetricKind};
use prometheus::proto;
use prometheus::{Encoder, TextEncoder};
use thiserror::Error;

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Errors raised while rendering families
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode metric families: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl MetricFamily {
    /// Convert into the protobuf model used by the `prometheus` encoders
    ///
    /// Label pairs come out sorted by name because sample labels are kept in
    /// a sorted map.
    pub fn to_proto(&self) -> proto::MetricFamily {
        let mut mf = proto::MetricFamily::default();
        mf.set_name(self.name.clone());
        mf.set_help(self.help.clone());
        mf.set_field_type(match self.kind {
            MetricKind::Gauge => proto::MetricType::GAUGE,
            MetricKind::Counter => proto::MetricType::COUNTER,
        });

        for sample in &self.samples {
            let mut metric = proto::Metric::default();
            for (name, value) in &sample.labels {
                let mut pair = proto::LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                metric.mut_label().push(pair);
            }
            match self.kind {
                MetricKind::Gauge => {
                    let mut gauge = proto::Gauge::default();
                    gauge.set_value(sample.value);
                    metric.set_gauge(gauge);
                }
                MetricKind::Counter => {
                    let mut counter = proto::Counter::default();
                    counter.set_value(sample.value);
                    metric.set_counter(counter);
                }
            }
            mf.mut_metric().push(metric);
        }

        mf
    }
}

/// Encode families in the text exposition format, skipping empty ones
pub fn encode_text(families: &[MetricFamily]) -> Result<String, RenderError> {
    let protos: Vec<proto::MetricFamily> = families
        .iter()
        .filter(|f| !f.is_empty())
        .map(MetricFamily::to_proto)
        .collect();

    encode_protos(&protos)
}

/// Encode already-gathered protobuf families (e.g. from a `prometheus::Registry`)
pub fn encode_protos(families: &[proto::MetricFamily]) -> Result<String, RenderError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
