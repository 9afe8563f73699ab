use shared::metrics_defs::{MetricDef, MetricType};

pub const SEARCH_REQUESTS: MetricDef = MetricDef {
    name: "federation.search.requests",
    metric_type: MetricType::Counter,
    description: "Federated search requests. Tagged with status.",
};

pub const SEARCH_DURATION: MetricDef = MetricDef {
    name: "federation.search.duration",
    metric_type: MetricType::Histogram,
    description: "Federated search duration in seconds, fan-out included.",
};

pub const FANOUT_WIDTH: MetricDef = MetricDef {
    name: "federation.fanout.width",
    metric_type: MetricType::Histogram,
    description: "Number of participant calls issued for one search",
};

pub const CALL_DURATION: MetricDef = MetricDef {
    name: "federation.call.duration",
    metric_type: MetricType::Histogram,
    description: "Participant call duration in seconds. Tagged with participant, outcome.",
};

pub const CALL_ERRORS: MetricDef = MetricDef {
    name: "federation.call.errors",
    metric_type: MetricType::Counter,
    description: "Failed participant calls. Tagged with participant, kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    SEARCH_REQUESTS,
    SEARCH_DURATION,
    FANOUT_WIDTH,
    CALL_DURATION,
    CALL_ERRORS,
];
