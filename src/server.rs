use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use ledger_reconciler::{
    init_logging, output_file_name, reconcile_bytes, LedgerConfig, LedgerError, LedgerResult,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DEFAULT_MAX_UPLOAD_MB: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => LedgerConfig::load_from_file(&path)
            .with_context(|| format!("無法載入設定檔: {}", path))?,
        Err(_) => LedgerConfig::default(),
    };
    let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

    let app = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_mb * 1024 * 1024))
        .with_state(Arc::new(config));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3002".to_string());
    let addr = format!("0.0.0.0:{}", port);

    info!("📍 服務地址: http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("無法綁定 {}", addr))?;
    info!("✅ 對賬服務啟動成功");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(r#"<!doctype html>
<html lang="zh-TW">
<head>
<meta charset="utf-8"/>
<title>帳冊對賬</title>
<meta name="viewport" content="width=device-width, initial-scale=1"/>
<style>
:root{--ink:#1f2933;--muted:#7b8794;--accent:#0f766e;--line:#cbd2d9}
html,body{margin:0;background:#f5f7fa;color:var(--ink);font:15px/1.5 "Noto Sans TC","PingFang TC",system-ui,sans-serif}
main{max-width:560px;margin:48px auto;background:#fff;border-top:4px solid var(--accent);padding:28px 32px}
h1{font-size:20px;margin:0 0 20px}
form{display:grid;gap:14px}
input[type=file]{padding:8px;border:1px dashed var(--line);background:#fafbfc}
button{justify-self:start;padding:8px 20px;border:0;background:var(--accent);color:#fff;font-size:15px}
p.hint{margin:0;color:var(--muted);font-size:13px}
</style>
</head>
<body>
<main>
  <h1>帳冊對賬</h1>
  <form action="/upload" method="post" enctype="multipart/form-data">
    <input name="file" type="file" accept=".xlsx" required />
    <p class="hint">帳冊需包含『費用編號表』與『客戶列表』分頁；輸出會附上『營收統計』。</p>
    <button type="submit">開始對賬</button>
  </form>
</main>
</body>
</html>"#)
}

async fn upload(State(config): State<Arc<LedgerConfig>>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let orig_name = field.file_name().unwrap_or("upload.xlsx").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        info!("received file: {} ({} bytes)", orig_name, bytes.len());
                        upload = Some((orig_name, bytes.to_vec()));
                    }
                    Err(e) => return Html(format!("上傳失敗：{}", e)).into_response(),
                }
            }
            Ok(None) => break,
            Err(e) => return Html(format!("上傳失敗：{}", e)).into_response(),
        }
    }

    let Some((orig_name, bytes)) = upload else {
        return Html("上傳失敗：未收到文件").into_response();
    };

    let content = match reconcile_to_xlsx(bytes, config).await {
        Ok(content) => content,
        Err(e) => {
            if matches!(e, LedgerError::Write(_)) {
                error!(file = %orig_name, error = %e, "產生 Excel 失敗");
            } else {
                warn!(file = %orig_name, error = %e, "對賬失敗");
            }
            return Html(format!("生成失敗：{}", e)).into_response();
        }
    };

    let filename = output_file_name(&orig_name, chrono::Local::now().naive_local());
    (
        [
            ("Content-Type", XLSX_MIME.to_string()),
            ("Content-Disposition", content_disposition(&filename)),
        ],
        content,
    )
        .into_response()
}

/// 對賬與寫檔都是同步運算，放到 blocking 執行緒，不佔住 async worker
async fn reconcile_to_xlsx(bytes: Vec<u8>, config: Arc<LedgerConfig>) -> LedgerResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let report = reconcile_bytes(&bytes, &config)?;
        info!(
            customers = report.customers.len(),
            invalid = report.invalid_customers(),
            "reconciled upload"
        );
        report.to_xlsx()
    })
    .await
    .map_err(|e| LedgerError::Unreadable(format!("對賬工作中斷: {}", e)))?
}

/// 檔名含中文，依 RFC 5987 以 filename* 傳遞，並附 ASCII 後備檔名
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    let mut encoded = String::with_capacity(filename.len() * 3);
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"._-".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}
