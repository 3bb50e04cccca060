use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::aggregate::{CustomerList, CustomerRecord, GlobalSummary, GlobalSummaryRow};
use crate::assemble::{present, to_xlsx_bytes};
use crate::catalog::FeeCatalog;
use crate::config::LedgerConfig;
use crate::enrich::{enrich_sheet, SheetTotals};
use crate::error::{LedgerError, LedgerResult};
use crate::matcher::{CheckFlag, MatchOutcome, SheetMatcher};
use crate::schema::SUMMARY_SHEET;
use crate::workbook::LedgerBook;

pub const OUTPUT_PREFIX: &str = "對賬後";

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub book: LedgerBook,
    pub summary: GlobalSummary,
    pub customers: Vec<CustomerRecord>,
    /// 分頁層級、已略過的錯誤
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    pub fn to_xlsx(&self) -> LedgerResult<Vec<u8>> {
        to_xlsx_bytes(&self.book)
    }

    pub fn invalid_customers(&self) -> usize {
        self.customers.iter().filter(|c| c.check_flag == CheckFlag::Invalid).count()
    }
}

pub fn reconcile_file(path: impl AsRef<Path>, config: &LedgerConfig) -> LedgerResult<ReconcileReport> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| LedgerError::Unreadable(format!("{}: {}", path.display(), e)))?;
    reconcile_bytes(&bytes, config)
}

pub fn reconcile_bytes(bytes: &[u8], config: &LedgerConfig) -> LedgerResult<ReconcileReport> {
    let book = LedgerBook::from_xlsx_bytes(bytes)?;
    reconcile_book(book, config)
}

/// 依客戶列表順序逐一比對、加工、彙總。只有兩個保留分頁的結構錯誤會中止整個對賬。
pub fn reconcile_book(mut book: LedgerBook, config: &LedgerConfig) -> LedgerResult<ReconcileReport> {
    config.validate()?;
    let catalog = FeeCatalog::load(&book, config)?;
    let mut customers = CustomerList::load(&book)?;
    info!(sheets = book.len(), customers = customers.len(), fees = catalog.len(), "開始對賬");

    // 營收統計每次重新產生
    if book.remove(SUMMARY_SHEET).is_some() {
        debug!("discarded existing summary sheet");
    }

    let mut matcher = SheetMatcher::new(&book, config.prefix_len);
    let mut summary = GlobalSummary::default();
    let mut warnings = Vec::new();

    for record in customers.records.iter_mut() {
        let sheet_name = match matcher.resolve(&record.name) {
            MatchOutcome::Blank => continue,
            MatchOutcome::NoMatch { code } => {
                debug!(customer = %record.name, code = %code, "no matching sheet");
                record.code = Some(code);
                record.check_flag = CheckFlag::Invalid;
                continue;
            }
            MatchOutcome::AlreadyProcessed { code, sheet } => {
                debug!(customer = %record.name, sheet = %sheet, "sheet already reconciled");
                record.code = Some(code);
                continue;
            }
            MatchOutcome::Matched { code, sheet } => {
                record.code = Some(code);
                sheet
            }
        };

        match reconcile_sheet(&mut book, &sheet_name, &catalog, config) {
            Ok(Some(totals)) => {
                record.apply_totals(&totals, config);
                if let Some(sheet) = book.get(&sheet_name) {
                    summary.push(GlobalSummaryRow::from_sheet(sheet));
                }
            }
            Ok(None) => {
                debug!(sheet = %sheet_name, "matched sheet has no data rows");
                record.check_flag = CheckFlag::Invalid;
            }
            Err(e) if e.is_recoverable() => {
                warn!(sheet = %sheet_name, error = %e, "略過客戶分頁");
                warnings.push(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    let records = customers.records.clone();
    book.insert(customers.into_sheet());
    book.insert(summary.to_sheet());
    present(&mut book);

    let report = ReconcileReport { book, summary, customers: records, warnings };
    info!(
        reconciled = report.summary.rows.len(),
        invalid = report.invalid_customers(),
        skipped = report.warnings.len(),
        "對賬完成"
    );
    Ok(report)
}

/// 空分頁回傳 `Ok(None)`
fn reconcile_sheet(
    book: &mut LedgerBook,
    name: &str,
    catalog: &FeeCatalog,
    config: &LedgerConfig,
) -> LedgerResult<Option<SheetTotals>> {
    if book.readable(name)?.is_empty() {
        return Ok(None);
    }
    let sheet = book
        .get_mut(name)
        .ok_or_else(|| LedgerError::MissingSheet(name.to_string()))?;
    enrich_sheet(sheet, catalog, config).map(Some)
}

/// `對賬後_{原檔名}_{時間戳}.xlsx`
pub fn output_file_name(input_name: &str, at: NaiveDateTime) -> String {
    let base = Path::new(input_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input_name);
    let cut = base.len().saturating_sub(5);
    let base = match base.get(cut..) {
        Some(ext) if ext.eq_ignore_ascii_case(".xlsx") => &base[..cut],
        _ => base,
    };
    format!("{}_{}_{}.xlsx", OUTPUT_PREFIX, base, at.format("%Y%m%d_%H%M%S"))
}
