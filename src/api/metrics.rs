use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

lazy_static::lazy_static! {
    static ref STARTED_AT: i64 = chrono::Utc::now().timestamp();
}

/// Pins the process start time; called once from `main`.
pub fn mark_started() {
    lazy_static::initialize(&STARTED_AT);
}

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub process_start_time_seconds: i64,
}

fn render(metrics: &MetricsResponse) -> String {
    format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP error responses\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n\
         \n\
         # HELP process_start_time_seconds Start time of the process since unix epoch\n\
         # TYPE process_start_time_seconds gauge\n\
         process_start_time_seconds {}\n",
        metrics.http_requests_total, metrics.http_errors_total, metrics.process_start_time_seconds
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus text exposition", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    let metrics = MetricsResponse {
        http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
        http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
        process_start_time_seconds: *STARTED_AT,
    };

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prometheus_text() {
        let text = render(&MetricsResponse {
            http_requests_total: 12,
            http_errors_total: 3,
            process_start_time_seconds: 1_700_000_000,
        });
        assert!(text.contains("http_requests_total 12\n"));
        assert!(text.contains("http_errors_total 3\n"));
        assert!(text.contains("# TYPE process_start_time_seconds gauge"));
    }

    #[test]
    fn test_counters_only_grow() {
        let before = ERROR_COUNT.load(Ordering::Relaxed);
        increment_error_count();
        assert!(ERROR_COUNT.load(Ordering::Relaxed) > before);
    }
}
