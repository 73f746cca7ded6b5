//! Read-only HTTP status dashboard
//!
//! Serves one request at a time and only ever reads the status table, so it
//! shares nothing with the collector but the table and its lock. Rendering
//! is a pure step over a snapshot; the snapshot itself may be torn across
//! concurrent heartbeats, which is acceptable for display.

use crate::{MasterError, SlotRecord, StatusTable};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Render the status table snapshot as a self-refreshing HTML page
pub fn render_page(records: &[SlotRecord]) -> String {
    let mut rows = String::new();
    for (slot, record) in records.iter().enumerate() {
        if record.active {
            rows.push_str(&format!(
                "<div>Client {slot}: {} | CPU {:.1}% | RAM {:.1}%</div>",
                record.address, record.cpu_pct, record.ram_pct
            ));
        }
    }
    if rows.is_empty() {
        rows.push_str("<div>No agents connected.</div>");
    }
    format!(
        "<html><meta http-equiv='refresh' content='2'>\
         <body><h1>Sentinel</h1>{rows}</body></html>"
    )
}

/// Serve the dashboard forever. Bind failure is fatal; per-request failures
/// are logged and the loop continues.
pub async fn run_dashboard(
    addr: SocketAddr,
    table: Arc<StatusTable>,
) -> Result<(), MasterError> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");

    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "dashboard accept failed");
                continue;
            }
        };
        debug!(%peer, "dashboard request");

        let body = render_page(&table.snapshot());
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            warn!(%peer, error = %e, "dashboard write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_only_active_slots() {
        let mut records = vec![SlotRecord::default(); 3];
        records[1] = SlotRecord {
            active: true,
            address: "10.0.0.7:5001".into(),
            cpu_pct: 42.0,
            ram_pct: 77.5,
        };

        let page = render_page(&records);
        assert!(page.contains("Client 1: 10.0.0.7:5001 | CPU 42.0% | RAM 77.5%"));
        assert!(!page.contains("Client 0"));
        assert!(!page.contains("Client 2"));
    }

    #[test]
    fn test_render_empty_table() {
        let page = render_page(&vec![SlotRecord::default(); 4]);
        assert!(page.contains("No agents connected."));
    }
}
