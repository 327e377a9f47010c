//! `GET /`: a server-rendered status page.

use std::fmt::Write;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use kanau::processor::Processor;
use payflow_core::entities::invoice_records::{GetInvoiceStats, ListRecentInvoiceRecords};
use payflow_core::entities::{InvoiceRecord, InvoiceStats};
use payflow_core::framework::DatabaseProcessor;
use payflow_core::processors::SchedulerState;
use payflow_core::telemetry::{CountersSnapshot, SchedulerRun, WebhookEventRecord};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::state::AppState;

const RECENT_INVOICES: u32 = 20;

/// Everything the page shows, gathered before rendering.
pub struct DashboardView {
    pub mock_mode: bool,
    pub scheduler: SchedulerState,
    pub stats: InvoiceStats,
    pub counters: CountersSnapshot,
    pub scheduler_runs: Vec<SchedulerRun>,
    pub webhook_events: Vec<WebhookEventRecord>,
    pub invoices: Vec<InvoiceRecord>,
}

#[derive(Debug)]
pub struct DashboardError(sqlx::Error);

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Dashboard database error");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, DashboardError> {
    let db = DatabaseProcessor {
        pool: state.db.clone(),
    };
    let stats = db.process(GetInvoiceStats).await.map_err(DashboardError)?;
    let invoices = db
        .process(ListRecentInvoiceRecords {
            limit: RECENT_INVOICES,
        })
        .await
        .map_err(DashboardError)?;

    let scheduler = *state.scheduler_state.borrow();
    let view = DashboardView {
        mock_mode: state.mock_mode,
        scheduler,
        stats,
        counters: state.counters.snapshot(),
        scheduler_runs: state.scheduler_runs.newest_first().await,
        webhook_events: state.webhook_events.newest_first().await,
        invoices,
    };
    Ok(Html(render(&view)))
}

pub fn render(view: &DashboardView) -> String {
    let mut out = String::with_capacity(16 * 1024);
    // writing into a String cannot fail
    let _ = write_page(&mut out, view);
    out
}

fn write_page(out: &mut String, view: &DashboardView) -> std::fmt::Result {
    out.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
        "<meta charset=\"utf-8\">\n<meta http-equiv=\"refresh\" content=\"30\">\n",
        "<title>payflow</title>\n<style>\n",
        "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\n",
        "table{border-collapse:collapse;margin-bottom:2rem}\n",
        "th,td{border:1px solid #ccc;padding:.3rem .6rem;text-align:left}\n",
        ".banner{padding:.6rem 1rem;margin-bottom:1.5rem;font-weight:bold}\n",
        ".mock{background:#fff3cd}.real{background:#d1e7dd}\n",
        ".error,.rejected{color:#b02a37}.success,.received{color:#146c43}\n",
        "</style>\n</head>\n<body>\n<h1>payflow</h1>\n",
    ));

    if view.mock_mode {
        out.push_str("<div class=\"banner mock\">MOCK MODE: talking to the mock processor</div>\n");
    } else {
        out.push_str("<div class=\"banner real\">LIVE: talking to the payment processor</div>\n");
    }

    let scheduler = match view.scheduler {
        SchedulerState::Idle => "idle".to_string(),
        SchedulerState::Running { end_at } => format!("running until {}", timestamp(end_at)),
        SchedulerState::Stopped => "stopped".to_string(),
    };
    writeln!(out, "<p>Scheduler: {}</p>", escape(&scheduler))?;

    let InvoiceStats {
        total,
        issued,
        received,
        volume,
    } = view.stats;
    out.push_str("<h2>Ledger</h2>\n<table>\n");
    writeln!(out, "<tr><th>Invoices</th><td>{total}</td></tr>")?;
    writeln!(out, "<tr><th>Issued</th><td>{issued}</td></tr>")?;
    writeln!(out, "<tr><th>Received</th><td>{received}</td></tr>")?;
    writeln!(out, "<tr><th>Received volume</th><td>{}</td></tr>", money(volume))?;
    out.push_str("</table>\n");

    let counters = &view.counters;
    out.push_str("<h2>Webhooks</h2>\n<table>\n");
    writeln!(out, "<tr><th>Received</th><td>{}</td></tr>", counters.received)?;
    writeln!(out, "<tr><th>Rejected</th><td>{}</td></tr>", counters.rejected)?;
    writeln!(out, "<tr><th>Errors</th><td>{}</td></tr>", counters.errors)?;
    writeln!(
        out,
        "<tr><th>Credited</th><td>{}</td></tr>",
        money(counters.credited_cents)
    )?;
    writeln!(
        out,
        "<tr><th>Last event</th><td>{}</td></tr>",
        counters.last_event_at.map_or_else(|| "never".to_string(), timestamp)
    )?;
    out.push_str("</table>\n");

    out.push_str("<h2>Scheduler runs</h2>\n");
    if view.scheduler_runs.is_empty() {
        out.push_str("<p>No runs yet.</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>Time</th><th>Status</th><th>Invoices</th><th>Detail</th></tr>\n");
        for run in &view.scheduler_runs {
            let detail = run.error.clone().unwrap_or_else(|| run.invoice_ids.join(", "));
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"{status}\">{status}</td><td>{}</td><td>{}</td></tr>",
                timestamp(run.timestamp),
                run.invoice_count,
                escape(&detail),
                status = run.status.as_str(),
            )?;
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Webhook events</h2>\n");
    if view.webhook_events.is_empty() {
        out.push_str("<p>No events yet.</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>Time</th><th>Type</th><th>Invoice</th><th>Amount</th></tr>\n");
        for event in &view.webhook_events {
            let class = if event.is_rejected() { " class=\"rejected\"" } else { "" };
            writeln!(
                out,
                "<tr><td>{}</td><td{class}>{}</td><td>{}</td><td>{}</td></tr>",
                timestamp(event.timestamp),
                escape(&event.event_type),
                escape(event.invoice_id.as_deref().unwrap_or("-")),
                money(event.amount),
            )?;
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Recent invoices</h2>\n");
    if view.invoices.is_empty() {
        out.push_str("<p>No invoices yet.</p>\n");
    } else {
        out.push_str(
            "<table>\n<tr><th>Id</th><th>Payer</th><th>Amount</th><th>Status</th><th>Created</th><th>Transfer</th></tr>\n",
        );
        for invoice in &view.invoices {
            writeln!(
                out,
                "<tr><td>{}</td><td>{} ({})</td><td>{}</td><td class=\"{status}\">{status}</td><td>{}</td><td>{}</td></tr>",
                escape(&invoice.id),
                escape(&invoice.payer_name),
                escape(&invoice.payer_tax_id),
                money(invoice.amount),
                timestamp(invoice.created_at),
                escape(invoice.transfer_id.as_deref().unwrap_or("-")),
                status = invoice.status.as_str(),
            )?;
        }
        out.push_str("</table>\n");
    }

    out.push_str("</body>\n</html>\n");
    Ok(())
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}R$ {}.{:02}", abs / 100, abs % 100)
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] UTC"
    ))
    .unwrap_or_default()
}
