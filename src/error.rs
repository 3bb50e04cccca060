use thiserror::Error;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// 上傳的容器本身無法解析（非 xlsx、檔案損壞等）
    #[error("讀取 Excel 檔案錯誤: {0}")]
    Unreadable(String),

    #[error("找不到『{0}』分頁。")]
    MissingSheet(String),

    #[error("『{sheet}』中缺少必需欄位：{}", .columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },

    #[error("讀取分頁 {sheet} 失敗: {reason}")]
    SheetRead { sheet: String, reason: String },

    #[error("設定檔錯誤: {0}")]
    Config(String),

    #[error("寫入 Excel 失敗: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

impl LedgerError {
    pub fn missing_columns(sheet: &str, columns: &[&str]) -> Self {
        Self::MissingColumns {
            sheet: sheet.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// 分頁層級的錯誤：記錄後略過該分頁，不中止整個對賬
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SheetRead { .. })
            || matches!(self, Self::MissingColumns { sheet, .. } if !crate::schema::is_reserved_sheet(sheet))
    }
}
