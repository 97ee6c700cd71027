use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Duration of GetRandomPosts requests by outcome (ok, invalid, unavailable).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_request_duration_seconds",
        "Ranked feed request duration segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register feed_request_duration_seconds");

    /// Total ranked feed requests by outcome.
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Total ranked feed requests segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register feed_request_total");

    /// Size of the candidate set scored per request.
    pub static ref FEED_CANDIDATE_COUNT: HistogramVec = register_histogram_vec!(
        "feed_candidate_count",
        "Number of posts scored per ranked feed request",
        &["viewer"],
        vec![0.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .expect("failed to register feed_candidate_count");

    /// Cursor resolution results (none, resumed, reset).
    pub static ref FEED_CURSOR_EVENTS: IntCounterVec = register_int_counter_vec!(
        "feed_cursor_events_total",
        "Cursor resolutions segmented by result",
        &["result"]
    )
    .expect("failed to register feed_cursor_events_total");
}
