//! Data model shared by the pipeline stages and the measurement log

pub mod entity;
pub mod measurement;
pub mod metric;
pub mod value;

pub use entity::{
    Attributes, Entity, EntityAnnotation, EntityStatus, EntityUserData, RawEntity,
};
pub use measurement::{Measurement, ScaleMeasurement, SourceResult};
pub use metric::{Metric, SourceConfig, StatusPolicy};
pub use value::{
    format_number, parse_number, parse_version, Addition, Direction, MetricValue, Scale,
};
