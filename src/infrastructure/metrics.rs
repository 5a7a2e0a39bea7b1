// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let addr: SocketAddr = "0.0.0.0:9000".parse().expect("Invalid metrics address");

    // Start the exporter
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
    }

    describe_counter!(
        "provision_jobs_started_total",
        "Total number of scrape jobs admitted and started"
    );
    describe_counter!(
        "provision_jobs_succeeded_total",
        "Total number of scrape jobs that exited 0 and uploaded a result"
    );
    describe_counter!(
        "provision_jobs_failed_total",
        "Total number of scrape jobs that failed or exited non-zero"
    );
    describe_counter!(
        "provision_admission_rejected_total",
        "Total number of submissions rejected at admission"
    );

    info!("Metrics exporter listening on {}", addr);
}
