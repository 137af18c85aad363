//! Shared helpers for the integration tests: a scripted stand-in for the
//! inference service and builders for office-format fixtures.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Route library logs to the test harness; `RUST_LOG` overrides the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

// ── Mock inference service ───────────────────────────────────────────────────

/// One step of a scripted response body.
#[derive(Debug, Clone)]
pub enum Chunk {
    Bytes(Vec<u8>),
    Delay(Duration),
}

impl Chunk {
    pub fn text(s: &str) -> Self {
        Chunk::Bytes(s.as_bytes().to_vec())
    }

    /// One NDJSON frame, newline included.
    pub fn frame(fragment: &str, done: bool) -> Self {
        let line = serde_json::json!({ "model": "mock", "response": fragment, "done": done });
        Chunk::Bytes(format!("{line}\n").into_bytes())
    }
}

/// A scripted HTTP/1.1 response. The body is sent chunk by chunk and the
/// connection is closed afterwards, so an unfinished stream is simply a
/// script that stops early.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    /// Delay before the status line is written.
    pub head_delay: Duration,
    pub chunks: Vec<Chunk>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            head_delay: Duration::ZERO,
            chunks: Vec::new(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::new(status).chunk(Chunk::text(body))
    }

    /// A streaming reply of `(fragment, done)` frames.
    pub fn frames(frames: &[(&str, bool)]) -> Self {
        frames
            .iter()
            .fold(Self::new(200), |r, (f, d)| r.chunk(Chunk::frame(f, *d)))
    }

    pub fn chunk(mut self, chunk: Chunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn head_delay(mut self, delay: Duration) -> Self {
        self.head_delay = delay;
        self
    }
}

/// What the service received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Serves one scripted reply per connection, in order; the last reply is
/// repeated once the script runs out.
pub struct MockService {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockService {
    pub async fn start(script: Vec<Reply>) -> Self {
        assert!(!script.is_empty(), "a mock needs at least one reply");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let reply = script[served.min(script.len() - 1)].clone();
                served += 1;
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve(socket, reply, recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    reply: Reply,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let request = read_request(&mut socket).await?;
    recorded.lock().unwrap().push(request);

    tokio::time::sleep(reply.head_delay).await;
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n",
        reply.status,
        reason_phrase(reply.status)
    );
    socket.write_all(head.as_bytes()).await?;
    socket.flush().await?;

    for chunk in reply.chunks {
        match chunk {
            Chunk::Bytes(bytes) => {
                socket.write_all(&bytes).await?;
                socket.flush().await?;
            }
            Chunk::Delay(d) => tokio::time::sleep(d).await,
        }
    }
    socket.shutdown().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut tmp).await?;
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut first = lines.next().unwrap_or_default().split_whitespace();
    let method = first.next().unwrap_or_default().to_string();
    let path = first.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    Ok(RecordedRequest { method, path, body })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// An address nothing listens on: bind an ephemeral port, then release it.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ── Document fixtures ────────────────────────────────────────────────────────

fn write_package(suffix: &str, parts: &[(&str, String)]) -> NamedTempFile {
    let file = NamedTempFile::with_suffix(suffix).unwrap();
    let mut zip = ZipWriter::new(file.reopen().unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    file
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn column_name(mut idx: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            return name;
        }
        idx = idx / 26 - 1;
    }
}

/// A single-sheet `.xlsx`. `None` leaves the cell out of the sheet entirely.
/// Values that parse as numbers are written as numeric cells.
pub fn xlsx(rows: &[&[Option<&str>]]) -> NamedTempFile {
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        let mut cells = String::new();
        for (c, cell) in row.iter().enumerate() {
            let Some(value) = cell else { continue };
            let reference = format!("{}{}", column_name(c), r + 1);
            if value.parse::<f64>().is_ok() {
                cells.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                cells.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    xml_escape(value)
                ));
            }
        }
        sheet_rows.push_str(&format!(r#"<row r="{}">{cells}</row>"#, r + 1));
    }

    write_package(
        ".xlsx",
        &[
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
                ),
            ),
        ],
    )
}

/// A `.pptx` with one slide per entry; each slide holds one text shape per
/// string, with `\n` splitting paragraphs.
pub fn pptx(slides: &[&[&str]]) -> NamedTempFile {
    let mut parts = Vec::new();
    let mut ids = String::new();
    let mut rels = String::new();

    for (i, shapes) in slides.iter().enumerate() {
        let n = i + 1;
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 255 + n));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{n}.xml"/>"#
        ));

        let mut tree = String::new();
        for (s, text) in shapes.iter().enumerate() {
            let paragraphs: String = text
                .split('\n')
                .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", xml_escape(p)))
                .collect();
            tree.push_str(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="Shape {s}"/></p:nvSpPr><p:txBody><a:bodyPr/>{paragraphs}</p:txBody></p:sp>"#,
                s + 2
            ));
        }
        parts.push((
            format!("ppt/slides/slide{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{tree}</p:spTree></p:cSld></p:sld>"#
            ),
        ));
    }

    parts.push((
        "ppt/presentation.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
        ),
    ));
    parts.push((
        "ppt/_rels/presentation.xml.rels".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        ),
    ));

    let borrowed: Vec<(&str, String)> = parts
        .iter()
        .map(|(name, body)| (name.as_str(), body.clone()))
        .collect();
    write_package(".pptx", &borrowed)
}

/// A `.docx` with one paragraph per string.
pub fn docx(paragraphs: &[&str]) -> NamedTempFile {
    use docx_rs::{Docx, Paragraph, Run};

    let file = NamedTempFile::with_suffix(".docx").unwrap();
    let doc = paragraphs.iter().fold(Docx::new(), |doc, text| {
        doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)))
    });
    doc.build().pack(file.as_file()).unwrap();
    file
}

/// A file with arbitrary bytes and the given suffix.
pub fn file_with(suffix: &str, bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
