use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use ledger_reconciler::{init_logging, output_file_name, reconcile_file, LedgerConfig};

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(about = "帳單對賬：依客戶列表比對分頁、回填費用類別並產生營收統計")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 對賬並輸出新的 Excel 帳單
    Run {
        /// 輸入檔案路徑（.xlsx）
        #[arg(short, long)]
        input: PathBuf,
        /// 輸出檔案路徑，預設為 對賬後_{原檔名}_{時間}.xlsx（與輸入檔同目錄）
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 設定檔路徑（JSON）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// 只輸出營收統計（JSON），不寫檔
    Summary {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { input, output, config } => {
            let config = load_config(config.as_deref())?;
            let report = reconcile_file(input, &config)
                .with_context(|| format!("對賬失敗: {}", input.display()))?;
            for warning in &report.warnings {
                eprintln!("⚠️  {}", warning);
            }
            let bytes = report.to_xlsx().context("產生 Excel 失敗")?;

            let output = match output {
                Some(p) => p.clone(),
                None => default_output(input),
            };
            write_atomically(&output, &bytes)?;
            info!(output = %output.display(), bytes = bytes.len(), "written");
            println!("✅ 新賬單生成成功: {}", output.display());
        }
        Commands::Summary { input, config } => {
            let config = load_config(config.as_deref())?;
            let report = reconcile_file(input, &config)
                .with_context(|| format!("對賬失敗: {}", input.display()))?;
            let out = serde_json::json!({
                "sheets": report.summary.rows,
                "grand_total": report.summary.grand_total(),
                "invalid_customers": report.invalid_customers(),
                "warnings": report.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LedgerConfig> {
    match path {
        Some(p) => LedgerConfig::load_from_file(p)
            .with_context(|| format!("無法載入設定檔: {}", p.display())),
        None => Ok(LedgerConfig::default()),
    }
}

fn default_output(input: &Path) -> PathBuf {
    let name = input.file_name().and_then(|n| n.to_str()).unwrap_or("ledger");
    let file = output_file_name(name, chrono::Local::now().naive_local());
    input.with_file_name(file)
}

// 先寫暫存檔再改名，失敗時不留下半成品
fn write_atomically(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("無法建立暫存檔: {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.persist(output)
        .with_context(|| format!("無法寫入輸出檔: {}", output.display()))?;
    Ok(())
}
