//! Worker loop: request execution, filtering, probing, emission

use crate::detection::{self, CalibrationCache};
use crate::http::{HttpResponse, Transport};
use crate::models::{Finding, ScanConfig};
use crate::scanner::events::ScanEvent;
use crate::scanner::scoring;
use crate::scanner::stats::Stats;
use crate::scanner::tracker::OutstandingTasks;
use crate::scanner::{extract_path, is_directory, join_url, Task, USER_AGENTS};
use chrono::Local;
use rand::rngs::SmallRng;
use rand::Rng;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const MAX_CONSECUTIVE_ERRORS: u32 = 5;
const ERROR_BACKOFF: Duration = Duration::from_secs(2);
const FUZZ_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// Everything a worker needs; cloned once per spawned worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub config: Arc<ScanConfig>,
    pub transport: Arc<Transport>,
    pub stats: Arc<Stats>,
    pub calibration: Arc<CalibrationCache>,
    pub results: mpsc::Sender<Finding>,
    pub recursion: Option<mpsc::UnboundedSender<Task>>,
    pub outstanding: Arc<OutstandingTasks>,
    pub cancel: CancellationToken,
    pub events: Option<mpsc::Sender<ScanEvent>>,
}

/// Consumes tasks until the channel closes. After cancellation the loop
/// keeps draining, decrementing the outstanding counter without issuing
/// requests, so the closer can observe completion.
pub(crate) async fn run_worker(
    ctx: WorkerContext,
    tasks: async_channel::Receiver<Task>,
    mut rng: SmallRng,
) {
    let mut consecutive_errors: u32 = 0;

    while let Ok(task) = tasks.recv().await {
        if ctx.cancel.is_cancelled() {
            ctx.outstanding.done();
            continue;
        }
        process_task(&ctx, &task, &mut rng, &mut consecutive_errors).await;
        ctx.outstanding.done();
    }
}

async fn process_task(
    ctx: &WorkerContext,
    task: &Task,
    rng: &mut SmallRng,
    consecutive_errors: &mut u32,
) {
    let url = join_url(&task.target, &task.path);

    if let Some(events) = &ctx.events {
        let _ = events.try_send(ScanEvent::UrlTrying { url: url.clone() });
    }

    let user_agent = USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())];
    let headers = request_headers(&ctx.config, user_agent, &[]);

    let response = ctx.transport.execute(Method::GET, &url, &headers).await;
    ctx.stats.incr_processed();

    let response = match response {
        Ok(response) => {
            *consecutive_errors = 0;
            response
        }
        Err(e) => {
            debug!("request failed for {url}: {e}");
            ctx.stats.incr_errors();
            *consecutive_errors += 1;
            if *consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                tokio::select! {
                    _ = sleep(ERROR_BACKOFF) => {}
                    _ = ctx.cancel.cancelled() => {}
                }
                *consecutive_errors = 0;
            }
            return;
        }
    };

    let body = response.body_text();
    let mut finding = build_finding(&url, "GET", user_agent, &response, &body);

    // Drop soft-404s matching the target's calibration signatures.
    let signatures = ctx.calibration.get(&task.target).await;
    if detection::matches_signature(finding.status_code, finding.size, &signatures) {
        return;
    }

    if finding.status_code == 405 {
        method_fuzz(ctx, &url, user_agent).await;
    }

    if !is_interesting(finding.status_code) {
        return;
    }

    ctx.stats.incr_found();

    if finding.status_code == 200 && !body.is_empty() {
        let secrets = detection::detect_secrets(&body);
        if !secrets.is_empty() {
            finding.secret_found = true;
            finding.secret_types = secrets;
            ctx.stats.incr_secrets();
        }
    }

    if finding.status_code == 401 || finding.status_code == 403 {
        attempt_bypass(ctx, &url, user_agent).await;
    }

    if let Some(recursion) = &ctx.recursion {
        if task.depth < ctx.config.max_depth && is_directory(finding.status_code, &url) {
            ctx.outstanding.add(1);
            let child = Task {
                target: task.target.clone(),
                path: extract_path(&url),
                depth: task.depth + 1,
            };
            if recursion.send(child).is_err() {
                ctx.outstanding.done();
            }
        }
    }

    emit(ctx, finding).await;
}

/// Probes alternative verbs on a 405; the first 200/201/204 wins and is
/// emitted as a critical method-fuzz finding.
async fn method_fuzz(ctx: &WorkerContext, url: &str, user_agent: &str) {
    for method in FUZZ_METHODS {
        let verb = method.as_str().to_string();
        let headers = request_headers(&ctx.config, user_agent, &[]);
        let Ok(response) = ctx.transport.execute(method, url, &headers).await else {
            continue;
        };
        if !matches!(response.status, 200 | 201 | 204) {
            continue;
        }

        let body = response.body_text();
        let mut finding = build_finding(url, &verb, user_agent, &response, &body);
        finding.critical = true;

        let secrets = detection::detect_secrets(&body);
        if !secrets.is_empty() {
            finding.secret_found = true;
            finding.secret_types = secrets;
            ctx.stats.incr_secrets();
        }

        ctx.stats.incr_found();
        emit(ctx, finding).await;
        return;
    }
}

/// Reissues a forbidden request with spoofed origin headers. A 200 or 302
/// answer is emitted as a critical bypass finding.
async fn attempt_bypass(ctx: &WorkerContext, url: &str, user_agent: &str) {
    let path = extract_path(url);
    let spoof: [(String, String); 5] = [
        ("X-Forwarded-For".to_string(), "127.0.0.1".to_string()),
        ("X-Original-URL".to_string(), path.clone()),
        ("X-Rewrite-URL".to_string(), path.clone()),
        (
            "X-Custom-IP-Authorization".to_string(),
            "127.0.0.1".to_string(),
        ),
        ("Client-IP".to_string(), "127.0.0.1".to_string()),
    ];

    let headers = request_headers(&ctx.config, user_agent, &spoof);
    let Ok(response) = ctx.transport.execute(Method::GET, url, &headers).await else {
        return;
    };
    if !matches!(response.status, 200 | 302) {
        return;
    }

    let body = response.body_text();
    let mut finding = build_finding(
        &format!("{url} [BYPASS]"),
        "GET+BYPASS",
        user_agent,
        &response,
        &body,
    );
    finding.critical = true;

    let secrets = detection::detect_secrets(&body);
    if !secrets.is_empty() {
        finding.secret_found = true;
        finding.secret_types = secrets;
        ctx.stats.incr_secrets();
    }

    emit(ctx, finding).await;
}

/// Scores the finding and hands it to the aggregator. A cancelled scan
/// drops the emission instead of blocking.
async fn emit(ctx: &WorkerContext, mut finding: Finding) {
    scoring::assign_severity(&mut finding);
    tokio::select! {
        _ = ctx.results.send(finding) => {}
        _ = ctx.cancel.cancelled() => {}
    }
}

fn is_interesting(status_code: u16) -> bool {
    (200..400).contains(&status_code) || matches!(status_code, 401 | 403)
}

fn build_finding(
    url: &str,
    method: &str,
    user_agent: &str,
    response: &HttpResponse,
    body: &str,
) -> Finding {
    let mut finding = Finding::new(url, method, response.status);
    finding.size = response.body.len();
    finding.word_count = body.split_whitespace().count();
    finding.line_count = body.matches('\n').count() + 1;
    finding.timestamp = Local::now().to_rfc3339();
    finding.server = response.header("server");
    finding.powered_by = response.header("x-powered-by");
    finding.user_agent = user_agent.to_string();
    finding.waf_detected = detection::detect_waf(&response.headers);
    finding
}

fn request_headers(
    config: &ScanConfig,
    user_agent: &str,
    extra: &[(String, String)],
) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(1 + config.custom_headers.len() + extra.len());
    headers.push(("User-Agent".to_string(), user_agent.to_string()));
    for (key, value) in &config.custom_headers {
        headers.push((key.clone(), value.clone()));
    }
    for (key, value) in extra {
        headers.push((key.clone(), value.clone()));
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interesting_statuses() {
        assert!(is_interesting(200));
        assert!(is_interesting(301));
        assert!(is_interesting(401));
        assert!(is_interesting(403));
        assert!(!is_interesting(404));
        assert!(!is_interesting(500));
    }
}
