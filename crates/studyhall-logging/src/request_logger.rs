use anyhow::{Context, Result};
use chrono::Utc;
use colored::{Color, Colorize};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{get_logs_dir, safe_truncate};

const MAX_CONSOLE_BODY: usize = 5000;
const MAX_CONSOLE_CHUNK: usize = 200;

fn describe_url(url: &str) -> Vec<(&'static str, String)> {
    let mut fields = vec![("URL", url.to_string())];
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        fields.push(("Host", parsed_url.host_str().unwrap_or("unknown").to_string()));
        fields.push((
            "Port",
            parsed_url.port().map(|p| p.to_string()).unwrap_or_else(|| {
                if parsed_url.scheme() == "https" {
                    "443 (default)".to_string()
                } else {
                    "80 (default)".to_string()
                }
            }),
        ));
        fields.push(("Scheme", parsed_url.scheme().to_string()));
    }
    fields
}

fn print_body(body: &str) {
    if body.chars().count() > MAX_CONSOLE_BODY {
        println!("{}", safe_truncate(body, MAX_CONSOLE_BODY));
        println!("\n{}", format!("... (truncated, total {} bytes)", body.len()).bright_black());
    } else {
        println!("{}", body);
    }
}

fn rule(color: Color) {
    println!("{}", "═".repeat(80).color(color));
}

/// Boxed console section used by `--verbose`
fn print_section(title: &str, color: Color, body: impl FnOnce()) {
    println!();
    rule(color);
    println!("{}", title.color(color).bold());
    rule(color);
    body();
    rule(color);
    println!();
}

/// Dump an `/ask/stream` request to the console when `verbose`
pub fn log_request<T: Serialize>(url: &str, body: &T, verbose: bool) {
    if !verbose {
        return;
    }
    print_section("🔍 HTTP REQUEST DEBUG", Color::BrightCyan, || {
        for (name, value) in describe_url(url) {
            println!("{}: {}", name.bright_yellow(), value);
        }
        println!("\n{}", "Headers:".bright_yellow());
        println!("  Content-Type: application/json");
        println!("\n{}", "Request Body:".bright_yellow());
        match serde_json::to_string_pretty(body) {
            Ok(json) => print_body(&json),
            Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
        }
    });
}

/// Write one `req-<timestamp>.txt` file describing an ask into `logs_dir`
pub fn write_request_log<T: Serialize>(logs_dir: &Path, url: &str, body: &T) -> Result<PathBuf> {
    let now = Utc::now();
    let filename = format!("req-{}.txt", now.format("%Y%m%d-%H%M%S%.3f"));
    let file_path = logs_dir.join(filename);

    let mut log_content = String::new();
    log_content.push_str("HTTP REQUEST LOG\n");
    log_content.push_str("================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n\n", now.to_rfc3339()));

    for (name, value) in describe_url(url) {
        log_content.push_str(&format!("{}: {}\n", name, value));
    }

    log_content.push_str("\nHeaders:\n");
    log_content.push_str("  Content-Type: application/json\n\n");

    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(body) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => {
            log_content.push_str(&format!("Error serializing request: {}\n", e));
        }
    }

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

    Ok(file_path)
}

/// `--log-requests`: keep a copy of each ask under `~/.studyhall/logs`
pub fn log_request_to_file<T: Serialize>(url: &str, body: &T) -> Result<PathBuf> {
    let logs_dir = get_logs_dir()?;
    let file_path = write_request_log(&logs_dir, url, body)?;

    if let Some(name) = file_path.file_name() {
        println!("{}", format!("📝 Request logged to: {}", name.to_string_lossy()).bright_blue());
    }

    Ok(file_path)
}

/// Dump a catalog or failed ask response when `verbose`. JSON bodies
/// are pretty-printed.
pub fn log_response(status: &reqwest::StatusCode, body: &str, verbose: bool) {
    if !verbose {
        return;
    }
    print_section("📥 HTTP RESPONSE DEBUG", Color::BrightGreen, || {
        println!(
            "{}: {} {}",
            "Status".bright_yellow(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        );
        println!("\n{}", "Response Body:".bright_yellow());
        match serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
        {
            Some(pretty) => print_body(&pretty),
            None => print_body(body),
        }
    });
}

/// Echo one raw `/ask/stream` body chunk when `verbose`
pub fn log_stream_chunk(chunk_num: usize, data: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!(
        "{}",
        format!(
            "📦 Stream Chunk #{}: {}",
            chunk_num,
            if data.chars().count() > MAX_CONSOLE_CHUNK {
                format!("{}... ({} bytes)", safe_truncate(data, MAX_CONSOLE_CHUNK), data.len())
            } else {
                data.to_string()
            }
        )
        .bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_request_log_contents() {
        let dir = TempDir::new().unwrap();
        let body = serde_json::json!({"unit_id": 5, "question": "What is recursion?"});

        let path = write_request_log(dir.path(), "http://localhost:8000/ask/stream", &body).unwrap();
        let contents = fs::read_to_string(&path).unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("req-"));
        assert!(contents.contains("URL: http://localhost:8000/ask/stream"));
        assert!(contents.contains("Host: localhost"));
        assert!(contents.contains("Port: 8000"));
        assert!(contents.contains("\"question\": \"What is recursion?\""));
    }

    #[test]
    fn test_describe_url_default_port() {
        let fields = describe_url("https://api.example.com/ask/stream");
        assert!(fields.contains(&("Port", "443 (default)".to_string())));
    }
}
