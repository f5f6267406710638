//! HTTP server for attribution analysis
//! Simple HTTP/1.1 server on tokio with one task per connection

use attribution_analysis::config::{PipelineSource, ServerConfig};
use attribution_analysis::db::{init_pool, PgPipelineResolver};
use attribution_analysis::logging;
use attribution_analysis::pipeline::{InMemoryPipelineResolver, PipelineResolver};
use attribution_analysis::reporting::{HttpVisualizationProvider, VisualizationProvider};
use attribution_analysis::request::AttributionRequestBody;
use attribution_analysis::AttributionAnalysisService;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

struct AppState {
    service: AttributionAnalysisService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    logging::init_tracing();

    let config = ServerConfig::parse();

    let pipelines: Arc<dyn PipelineResolver> = match config.pipeline_source()? {
        PipelineSource::File(path) => Arc::new(InMemoryPipelineResolver::load(&path)?),
        PipelineSource::Database(url) => Arc::new(PgPipelineResolver::new(init_pool(&url).await?)),
    };
    let provider: Arc<dyn VisualizationProvider> = Arc::new(HttpVisualizationProvider::new(
        config.visualization_url.clone(),
        config.visualization_api_key.clone(),
    )?);
    info!("📊 Visualization provider: {}", config.visualization_url);

    let state = Arc::new(AppState {
        service: AttributionAnalysisService::new(pipelines, provider),
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Attribution server listening on http://{}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("📥 New connection from: {}", addr);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                warn!("Connection from {} failed: {}", addr, e);
            }
        });
    }
}

/// Position of the blank line ending the headers
fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];
    loop {
        let n = stream.read(&mut temp_buf).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&temp_buf[..n]);
        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }
        if let Some(end) = header_end(&buffer) {
            let headers = String::from_utf8_lossy(&buffer[..end]);
            if buffer.len() >= end + content_length(&headers) {
                break;
            }
        }
    }
    Ok(buffer)
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> std::io::Result<()> {
    let request_bytes = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(result) => result?,
        Err(_) => {
            let response = create_response(408, "Request Timeout", r#"{"success":false,"message":"Request timeout"}"#);
            return stream.write_all(response.as_bytes()).await;
        }
    };

    let request = String::from_utf8_lossy(&request_bytes);
    let response = handle_request(&request, &state).await;
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

async fn handle_request(request: &str, state: &AppState) -> String {
    let Some(request_line) = request.lines().next() else {
        return create_response(400, "Bad Request", "{}");
    };
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", "{}");
    }

    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or("/");
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    let body = request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");

    debug!("{} {}", method, path);

    match (method, path) {
        ("OPTIONS", _) => create_response(200, "OK", ""),
        ("GET", "/api/health") => create_response(200, "OK", r#"{"status":"ok"}"#),
        ("POST", "/api/reporting/attribution") => {
            let body: AttributionRequestBody = match serde_json::from_str(body) {
                Ok(body) => body,
                Err(e) => {
                    warn!("⚠️  Malformed request body: {}", e);
                    let message = serde_json::json!({
                        "success": false,
                        "message": format!("Invalid JSON body: {}", e),
                    });
                    return create_response(400, status_text(400), &message.to_string());
                }
            };
            let response = state.service.create_attribution_analysis_visual(&body).await;
            match serde_json::to_string(&response.body) {
                Ok(json) => create_response(response.status, status_text(response.status), &json),
                Err(e) => {
                    error!("❌ Failed to serialize response: {}", e);
                    create_response(500, "Internal Server Error", "{}")
                }
            }
        }
        _ => create_response(404, "Not Found", r#"{"success":false,"message":"Not found"}"#),
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        _ => "Internal Server Error",
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
