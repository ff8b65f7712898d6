//! Stand-in for the EchoMill server used by the integration tests
//!
//! Speaks the same HTTP surface as the real engine, without matching:
//! `mock-server <port> <instruments-config>`. Orders rest on the book until
//! cancelled, which is enough to exercise status, depth and cancel flows.

use anyhow::{bail, Context};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize)]
struct Instrument {
    symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OrderRequest {
    symbol: String,
    side: i64,
    price: i64,
    qty: i64,
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct DepthQuery {
    levels: Option<usize>,
}

#[derive(Default)]
struct Book {
    orders: Vec<OrderRequest>,
}

#[derive(Clone)]
struct AppState {
    symbols: Arc<HashSet<String>>,
    book: Arc<Mutex<Book>>,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn status(State(state): State<AppState>) -> Response {
    let count = state.book.lock().map(|b| b.orders.len()).unwrap_or(0);
    Json(json!({ "status": "ok", "orders": count })).into_response()
}

async fn add_order(State(state): State<AppState>, Json(order): Json<OrderRequest>) -> Response {
    if !state.symbols.contains(&order.symbol) {
        return error(StatusCode::BAD_REQUEST, "Unknown symbol");
    }
    let Ok(mut book) = state.book.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "book poisoned");
    };
    book.orders.push(order);
    Json(json!({ "status": "accepted", "trades": [] })).into_response()
}

async fn cancel_order(State(state): State<AppState>, Json(req): Json<CancelRequest>) -> Response {
    let Ok(mut book) = state.book.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "book poisoned");
    };
    match book.orders.iter().position(|o| o.id == req.id) {
        Some(index) => {
            book.orders.remove(index);
            Json(json!({ "status": "cancelled" })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

fn levels<'a>(orders: impl Iterator<Item = &'a OrderRequest>) -> BTreeMap<i64, (i64, usize)> {
    let mut levels = BTreeMap::new();
    for order in orders {
        let level = levels.entry(order.price).or_insert((0, 0));
        level.0 += order.qty;
        level.1 += 1;
    }
    levels
}

fn as_json<'a>(levels: impl Iterator<Item = (&'a i64, &'a (i64, usize))>, depth: usize) -> Value {
    levels
        .take(depth)
        .map(|(price, (qty, count))| json!({ "price": price, "qty": qty, "count": count }))
        .collect()
}

async fn depth(State(state): State<AppState>, Query(query): Query<DepthQuery>) -> Response {
    let depth = query.levels.unwrap_or(5);
    let Ok(book) = state.book.lock() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "book poisoned");
    };
    let bids = levels(book.orders.iter().filter(|o| o.side != -1));
    let asks = levels(book.orders.iter().filter(|o| o.side == -1));
    Json(json!({
        "bids": as_json(bids.iter().rev(), depth),
        "asks": as_json(asks.iter(), depth),
    }))
    .into_response()
}

async fn trades() -> Response {
    Json(json!({ "trades": [] })).into_response()
}

async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not Found")
}

fn load_instruments(path: &str) -> anyhow::Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let instruments: Vec<Instrument> =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path))?;
    Ok(instruments.into_iter().map(|i| i.symbol).collect())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    println!("Interrupt signal received. Stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("Usage: mock-server <port> <config_path>");
    }
    let port: u16 = args[1].parse().context("invalid port")?;

    println!("EchoMill mock server");
    println!("Loading config from {}...", args[2]);
    let symbols = load_instruments(&args[2])?;
    println!("Loaded {} instruments.", symbols.len());

    let state = AppState {
        symbols: Arc::new(symbols),
        book: Arc::new(Mutex::new(Book::default())),
    };

    let app = Router::new()
        .route("/status", get(status))
        .route("/orders", post(add_order).delete(cancel_order))
        .route("/depth", get(depth))
        .route("/trades", get(trades))
        .fallback(not_found)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("binding port {}", port))?;
    println!("Starting server on port {}...", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Server stopped.");
    Ok(())
}
