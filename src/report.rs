//! Read-only HTTP view over the ARP tables and watched interfaces.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use actix_web::dev::ServerHandle;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;
use tracing::{error, info};

use crate::error::ReportError;
use crate::interfaces::InterfaceSet;
use crate::models::ArpFrame;
use crate::store::{ArpStore, ArpTables};

#[derive(Clone)]
pub struct Reporter {
    tables: Arc<ArpTables>,
    watched: Arc<InterfaceSet>,
}

impl Reporter {
    pub fn new(tables: Arc<ArpTables>, watched: Arc<InterfaceSet>) -> Self {
        Self { tables, watched }
    }

    fn store(&self, name: &str) -> Option<&ArpStore> {
        match name {
            "requests" => Some(self.tables.requests()),
            "replies" => Some(self.tables.replies()),
            "gratuitous" => Some(self.tables.gratuitous()),
            _ => None,
        }
    }
}

#[get("/api/interfaces")]
async fn api_interfaces(reporter: web::Data<Reporter>) -> impl Responder {
    HttpResponse::Ok().json(reporter.watched.snapshot())
}

// Newest observation first.
#[get("/api/arp/{table}")]
async fn api_arp(reporter: web::Data<Reporter>, table: web::Path<String>) -> impl Responder {
    let Some(store) = reporter.store(&table) else {
        return HttpResponse::NotFound().body(format!("unknown ARP table: {table}"));
    };
    let frames = store.sorted();
    let body: Vec<&ArpFrame> = frames.iter().map(Arc::as_ref).collect();
    HttpResponse::Ok().json(body)
}

#[get("/api/summary")]
async fn api_summary(reporter: web::Data<Reporter>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "interfaces": reporter.watched.len(),
        "requests": reporter.tables.requests().len(),
        "replies": reporter.tables.replies().len(),
        "gratuitous": reporter.tables.gratuitous().len(),
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(api_interfaces)
        .service(api_arp)
        .service(api_summary);
}

/// Reporting endpoint running on its own thread and actix system.
pub struct ReportServer {
    handle: ServerHandle,
    thread: JoinHandle<()>,
    addr: SocketAddr,
}

impl ReportServer {
    /// Binds `addr` and serves until [`ReportServer::stop`]. Bind failures are
    /// returned here rather than from the server thread.
    pub fn spawn(reporter: Reporter, addr: SocketAddr) -> Result<Self, ReportError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("report-http".to_string())
            .spawn(move || {
                let system = actix_web::rt::System::new();
                system.block_on(async move {
                    let data = web::Data::new(reporter);
                    let server = HttpServer::new(move || {
                        App::new().app_data(data.clone()).configure(routes)
                    })
                    .workers(1)
                    .disable_signals()
                    .bind(addr);

                    let server = match server {
                        Ok(server) => server,
                        Err(err) => {
                            let _ = ready_tx.send(Err(ReportError::Bind(err)));
                            return;
                        }
                    };
                    let bound = server.addrs().first().copied().unwrap_or(addr);
                    let server = server.run();
                    let _ = ready_tx.send(Ok((server.handle(), bound)));

                    if let Err(err) = server.await {
                        error!(error = %err, "reporting endpoint failed");
                    }
                });
            })
            .map_err(ReportError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok((handle, addr))) => {
                info!(%addr, "reporting endpoint listening");
                Ok(Self {
                    handle,
                    thread,
                    addr,
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(ReportError::Startup)
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections, drains in-flight requests and joins the thread.
    pub fn stop(self) {
        futures::executor::block_on(self.handle.stop(true));
        let _ = self.thread.join();
        info!(addr = %self.addr, "reporting endpoint stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArpOperation, MacAddr, RawArp};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_and_read_body_json, call_service, init_service, TestRequest};
    use chrono::{TimeZone, Utc};
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};

    fn reporter() -> Reporter {
        let tables = Arc::new(ArpTables::new());
        let watched = Arc::new(InterfaceSet::new());
        watched.append("eth0", Ipv4Addr::new(10, 0, 0, 2));

        for (secs, sender) in [(10, 1u8), (20, 3u8)] {
            let raw = RawArp {
                operation: 2,
                sender_mac: MacAddr::new([sender; 6]),
                sender_ip: Ipv4Addr::new(10, 0, 0, sender),
                target_mac: MacAddr::new([0x02; 6]),
                target_ip: Ipv4Addr::new(10, 0, 0, 5),
            };
            let at = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
            tables
                .replies()
                .put(ArpFrame::new("eth0", ArpOperation::Reply, &raw, at));
        }
        Reporter::new(tables, watched)
    }

    #[actix_web::test]
    async fn lists_replies_newest_first() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(reporter()))
                .configure(routes),
        )
        .await;

        let req = TestRequest::get().uri("/api/arp/replies").to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;

        let frames = body.as_array().expect("array");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["sender_ip"], "10.0.0.3");
        assert_eq!(frames[1]["sender_ip"], "10.0.0.1");
        assert_eq!(frames[0]["operation"], "reply");
    }

    #[actix_web::test]
    async fn summary_and_interfaces() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(reporter()))
                .configure(routes),
        )
        .await;

        let req = TestRequest::get().uri("/api/summary").to_request();
        let summary: serde_json::Value = call_and_read_body_json(&app, req).await;
        assert_eq!(summary["interfaces"], 1);
        assert_eq!(summary["replies"], 2);
        assert_eq!(summary["requests"], 0);
        assert_eq!(summary["gratuitous"], 0);

        let req = TestRequest::get().uri("/api/interfaces").to_request();
        let ifaces: serde_json::Value = call_and_read_body_json(&app, req).await;
        assert_eq!(ifaces[0]["name"], "eth0");
        assert_eq!(ifaces[0]["address"], "10.0.0.2");
    }

    #[actix_web::test]
    async fn unknown_table_is_not_found() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(reporter()))
                .configure(routes),
        )
        .await;

        let req = TestRequest::get().uri("/api/arp/everything").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn server_serves_until_stopped() {
        let server = ReportServer::spawn(reporter(), "127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /api/summary HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.contains("\"replies\":2"), "{response}");

        server.stop();
        assert!(TcpStream::connect(addr).is_err());
    }

    #[test]
    fn bind_conflict_is_reported() {
        let first = ReportServer::spawn(reporter(), "127.0.0.1:0".parse().unwrap()).unwrap();
        let taken = first.local_addr();

        match ReportServer::spawn(reporter(), taken) {
            Err(ReportError::Bind(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("bound an address already in use"),
        }
        first.stop();
    }
}
