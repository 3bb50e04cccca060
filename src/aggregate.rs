use serde::Serialize;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::enrich::SheetTotals;
use crate::error::LedgerResult;
use crate::matcher::CheckFlag;
use crate::schema::{
    Anchor, LayoutBuilder, CHECK_FLAG, CUSTOMER_CODE, CUSTOMER_NAME, CUSTOMER_SHEET, DESCRIPTION,
    GRAND_TOTAL_LABEL, INVALID_MARKER, LABEL_BRANCH, LABEL_TAXED, LABEL_UNTAXED,
    RECEIVABLE_TAXED, RECEIVABLE_UNTAXED, SUMMARY_BRANCH, SUMMARY_SHEET, SUMMARY_SHEET_ID,
    SUMMARY_TAXED, SUMMARY_UNTAXED, TOTAL,
};
use crate::workbook::{Cell, LedgerBook, Sheet};

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub name: Cell,
    pub code: Option<String>,
    pub check_flag: CheckFlag,
    pub receivable_untaxed: f64,
    pub receivable_taxed: f64,
}

impl CustomerRecord {
    fn new(name: Cell) -> Self {
        Self {
            name,
            code: None,
            check_flag: CheckFlag::None,
            receivable_untaxed: 0.0,
            receivable_taxed: 0.0,
        }
    }

    pub fn apply_totals(&mut self, totals: &SheetTotals, config: &LedgerConfig) {
        self.receivable_untaxed = totals.branch_subtotal;
        self.receivable_taxed = config.taxed(totals.branch_subtotal);
    }
}

/// 客戶列表：保留原始分頁，對賬過程中只改動記錄，輸出時才投影成新欄位順序
#[derive(Debug, Clone)]
pub struct CustomerList {
    sheet: Sheet,
    pub records: Vec<CustomerRecord>,
}

impl CustomerList {
    pub fn load(book: &LedgerBook) -> LedgerResult<Self> {
        let sheet = book.readable(CUSTOMER_SHEET)?.clone();
        let idx = sheet.require(&[CUSTOMER_NAME])?;
        let records = sheet
            .rows
            .iter()
            .map(|row| CustomerRecord::new(row.get(idx[0]).clone()))
            .collect();
        Ok(Self { sheet, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 請檢查欄插在客戶編號前（沒有客戶編號則放最前面），應收賬款兩欄附加在最後
    pub fn into_sheet(self) -> Sheet {
        let Self { mut sheet, records } = self;
        let layout = LayoutBuilder::from_header(&sheet.header)
            .insert(Anchor::Before(CUSTOMER_CODE), &[CHECK_FLAG])
            .append(&[RECEIVABLE_UNTAXED, RECEIVABLE_TAXED])
            .build();
        layout.project(&mut sheet, |column, row| {
            let record = &records[row];
            match column {
                CHECK_FLAG => match record.check_flag {
                    CheckFlag::Invalid => Cell::text(INVALID_MARKER),
                    CheckFlag::None => Cell::text(""),
                },
                RECEIVABLE_UNTAXED => Cell::Number(record.receivable_untaxed),
                RECEIVABLE_TAXED => Cell::Number(record.receivable_taxed),
                _ => Cell::Empty,
            }
        });
        sheet
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalSummaryRow {
    pub sheet: String,
    pub untaxed_revenue: f64,
    pub total_revenue: f64,
    pub branch_revenue: f64,
}

impl GlobalSummaryRow {
    /// 從分頁尾端的小計列取回數值；缺少的小計列視為 0
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let desc_col = sheet.column(DESCRIPTION);
        let total_col = sheet.column(TOTAL);
        let lookup = |label: &str| -> f64 {
            let (Some(d), Some(t)) = (desc_col, total_col) else { return 0.0 };
            sheet
                .rows
                .iter()
                .rev()
                .find(|row| matches!(row.get(d), Cell::Text(s) if s.trim() == label))
                .map(|row| row.get(t).as_f64())
                .unwrap_or(0.0)
        };
        Self {
            sheet: sheet.name.clone(),
            untaxed_revenue: lookup(LABEL_UNTAXED),
            total_revenue: lookup(LABEL_TAXED),
            branch_revenue: lookup(LABEL_BRANCH),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalSummary {
    pub rows: Vec<GlobalSummaryRow>,
}

impl GlobalSummary {
    pub fn push(&mut self, row: GlobalSummaryRow) {
        debug!(sheet = %row.sheet, untaxed = row.untaxed_revenue, "summary row added");
        self.rows.push(row);
    }

    pub fn grand_total(&self) -> GlobalSummaryRow {
        self.rows.iter().fold(
            GlobalSummaryRow { sheet: GRAND_TOTAL_LABEL.to_string(), ..Default::default() },
            |mut acc, row| {
                acc.untaxed_revenue += row.untaxed_revenue;
                acc.total_revenue += row.total_revenue;
                acc.branch_revenue += row.branch_revenue;
                acc
            },
        )
    }

    pub fn to_sheet(&self) -> Sheet {
        let header = [SUMMARY_SHEET_ID, SUMMARY_UNTAXED, SUMMARY_TAXED, SUMMARY_BRANCH]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut sheet = Sheet::new(SUMMARY_SHEET, header);
        let grand_total = self.grand_total();
        for row in self.rows.iter().chain(std::iter::once(&grand_total)) {
            sheet.push_row(vec![
                Cell::text(row.sheet.clone()),
                Cell::Number(row.untaxed_revenue),
                Cell::Number(row.total_revenue),
                Cell::Number(row.branch_revenue),
            ]);
        }
        sheet
    }
}
