//! 客戶分頁加工：回填費用類別與項目名、計算營收小計與佔比欄，並在表尾附上三列小計。

use serde::Serialize;
use tracing::debug;

use crate::catalog::{Attribution, FeeCatalog};
use crate::config::{round_half_even, round_to, LedgerConfig};
use crate::error::LedgerResult;
use crate::schema::{
    Anchor, LayoutBuilder, CATEGORY, DESCRIPTION, DETAIL_REQUIRED, DISPLAY_NAME, FEE_CODE,
    LABEL_BRANCH, LABEL_TAXED, LABEL_UNTAXED, PCT_OF_BRANCH, PCT_OF_TOTAL, REMARKS, TOTAL,
};
use crate::workbook::{Cell, Sheet};

pub const ZERO_PERCENT: &str = "0.0%";

/// 單一明細列加工後的結果，衍生欄位只計算一次
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub fee_code: Cell,
    pub fee_description: String,
    pub total: f64,
    pub category: Cell,
    pub display_name: String,
    pub attribution: Option<Attribution>,
    pub pct_of_total: String,
    pub pct_of_branch: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SheetTotals {
    /// 所屬為分倉的費用合計（未稅）
    pub branch_subtotal: f64,
    pub raw_sum: f64,
    pub exempt_sum: f64,
    pub untaxed_revenue: f64,
    pub taxed_revenue: f64,
    pub branch_revenue_taxed: f64,
}

impl SheetTotals {
    pub fn compute(rows: &[DetailRow], exempt_code: &str, config: &LedgerConfig) -> Self {
        // 從 +0.0 起算；空的 f64 `sum()` 會得到 -0.0
        let sum = |pred: &dyn Fn(&DetailRow) -> bool| {
            rows.iter().filter(|r| pred(r)).fold(0.0, |acc, r| acc + r.total)
        };
        let raw_sum = sum(&|_| true);
        let exempt_sum = sum(&|r| r.fee_code.key().as_deref() == Some(exempt_code));
        let branch_subtotal = sum(&|r| r.attribution == Some(Attribution::Branch));
        let revenue = raw_sum - exempt_sum;
        Self {
            branch_subtotal,
            raw_sum,
            exempt_sum,
            untaxed_revenue: round_half_even(revenue),
            taxed_revenue: config.taxed(revenue),
            branch_revenue_taxed: config.taxed(branch_subtotal),
        }
    }
}

/// `total × 倍率 / base × 100` 取一位小數；base 為 0 時固定為 0%
pub fn percent_of(total: f64, base: f64, tax_multiplier: f64) -> String {
    if base == 0.0 {
        return ZERO_PERCENT.to_string();
    }
    let pct = round_to(total * tax_multiplier / base * 100.0, 1);
    // 避免輸出 -0.0%
    let pct = if pct == 0.0 { 0.0 } else { pct };
    format!("{:.1}%", pct)
}

/// 讀出明細列並以費用編號查表；佔比欄留空，待小計算出後再填
pub fn collect_details(sheet: &Sheet, catalog: &FeeCatalog) -> LedgerResult<Vec<DetailRow>> {
    let idx = sheet.require(&DETAIL_REQUIRED)?;
    let (code_i, desc_i, total_i) = (idx[0], idx[1], idx[2]);
    Ok(sheet
        .rows
        .iter()
        .map(|row| {
            let fee_code = row.get(code_i).clone();
            let entry = catalog.lookup(&fee_code);
            DetailRow {
                fee_description: row.get(desc_i).to_string(),
                total: row.get(total_i).as_f64(),
                category: entry.map(|e| e.category.clone()).unwrap_or_else(|| Cell::text("")),
                display_name: entry.map(|e| e.display_name.clone()).unwrap_or_default(),
                attribution: entry.map(|e| e.attribution),
                fee_code,
                pct_of_total: String::new(),
                pct_of_branch: String::new(),
            }
        })
        .collect())
}

/// 加工一個已比對成功且非空的客戶分頁。缺少必需欄位時回傳錯誤且不修改分頁。
pub fn enrich_sheet(
    sheet: &mut Sheet,
    catalog: &FeeCatalog,
    config: &LedgerConfig,
) -> LedgerResult<SheetTotals> {
    let mut details = collect_details(sheet, catalog)?;
    let exempt_code = config.exempt_fee_code.trim();
    let totals = SheetTotals::compute(&details, exempt_code, config);
    for row in details.iter_mut() {
        row.pct_of_total = percent_of(row.total, totals.taxed_revenue, config.tax_multiplier);
        row.pct_of_branch =
            percent_of(row.total, totals.branch_revenue_taxed, config.tax_multiplier);
    }

    let layout = LayoutBuilder::from_header(&sheet.header)
        .insert(Anchor::After(FEE_CODE), &[CATEGORY, DISPLAY_NAME])
        .insert(Anchor::After(REMARKS), &[PCT_OF_TOTAL, PCT_OF_BRANCH])
        .build();
    layout.project(sheet, |column, row| {
        let detail = &details[row];
        match column {
            CATEGORY => detail.category.clone(),
            DISPLAY_NAME => Cell::text(detail.display_name.clone()),
            PCT_OF_TOTAL => Cell::text(detail.pct_of_total.clone()),
            PCT_OF_BRANCH => Cell::text(detail.pct_of_branch.clone()),
            _ => Cell::Empty,
        }
    });

    // 總計欄一律轉為數值
    if let Some(total_col) = layout.column_index(TOTAL) {
        for (row, detail) in sheet.rows.iter_mut().zip(&details) {
            row.set(total_col, Cell::Number(detail.total));
        }
    }

    append_summary_rows(sheet, &totals);
    debug!(
        sheet = %sheet.name,
        rows = details.len(),
        untaxed = totals.untaxed_revenue,
        taxed = totals.taxed_revenue,
        branch = totals.branch_revenue_taxed,
        "sheet enriched"
    );
    Ok(totals)
}

fn append_summary_rows(sheet: &mut Sheet, totals: &SheetTotals) {
    let (Some(desc_col), Some(total_col)) = (sheet.column(DESCRIPTION), sheet.column(TOTAL)) else {
        return;
    };
    let width = sheet.header.len();
    for (label, value) in [
        (LABEL_UNTAXED, totals.untaxed_revenue),
        (LABEL_TAXED, totals.taxed_revenue),
        (LABEL_BRANCH, totals.branch_revenue_taxed),
    ] {
        let mut cells = vec![Cell::Empty; width];
        cells[desc_col] = Cell::text(label);
        cells[total_col] = Cell::Number(value);
        sheet.push_row(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeeCatalogEntry;
    use crate::error::LedgerError;

    fn catalog() -> FeeCatalog {
        FeeCatalog::from_entries(vec![
            FeeCatalogEntry {
                code: "101".into(),
                category: Cell::Number(2.0),
                display_name: "倉租".into(),
                attribution: Attribution::Branch,
            },
            FeeCatalogEntry {
                code: "102".into(),
                category: Cell::Number(1.0),
                display_name: "運費".into(),
                attribution: Attribution::Other,
            },
            FeeCatalogEntry {
                code: "921".into(),
                category: Cell::Number(3.0),
                display_name: "代收代付".into(),
                attribution: Attribution::Other,
            },
        ])
    }

    fn detail_sheet(header: &[&str], rows: Vec<Vec<Cell>>) -> Sheet {
        let mut sheet = Sheet::new("AB倉", header.iter().map(|h| h.to_string()).collect());
        for row in rows {
            sheet.push_row(row);
        }
        sheet
    }

    fn cell_at<'a>(sheet: &'a Sheet, row: usize, column: &str) -> &'a Cell {
        sheet.rows[row].get(sheet.column(column).unwrap())
    }

    #[test]
    fn exempt_code_is_removed_from_revenue() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![
                vec![Cell::Number(101.0), Cell::text("倉租"), Cell::Number(100.0)],
                vec![Cell::Number(102.0), Cell::text("運費"), Cell::Number(200.0)],
                vec![Cell::Number(921.0), Cell::text("代付"), Cell::Number(50.0)],
            ],
        );
        let totals = enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        assert_eq!(totals.raw_sum, 350.0);
        assert_eq!(totals.exempt_sum, 50.0);
        assert_eq!(totals.untaxed_revenue, 300.0);
        assert_eq!(totals.taxed_revenue, 315.0);
        assert_eq!(totals.branch_subtotal, 100.0);
        assert_eq!(totals.branch_revenue_taxed, 105.0);
    }

    #[test]
    fn derived_columns_follow_fee_code_and_percentages_go_last_without_remarks() {
        let mut sheet = detail_sheet(
            &["日期", FEE_CODE, DESCRIPTION, TOTAL],
            vec![vec![Cell::text("3/1"), Cell::Number(101.0), Cell::text("倉租"), Cell::Number(100.0)]],
        );
        enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        assert_eq!(
            sheet.header,
            ["日期", FEE_CODE, CATEGORY, DISPLAY_NAME, DESCRIPTION, TOTAL, PCT_OF_TOTAL, PCT_OF_BRANCH]
        );
        assert_eq!(cell_at(&sheet, 0, DISPLAY_NAME), &Cell::text("倉租"));
        assert_eq!(cell_at(&sheet, 0, PCT_OF_TOTAL), &Cell::text("100.0%"));
    }

    #[test]
    fn percentages_are_placed_after_remarks() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL, REMARKS, "經手人"],
            vec![vec![Cell::Number(102.0), Cell::text("運費"), Cell::Number(10.0)]],
        );
        enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        assert_eq!(
            sheet.header,
            [FEE_CODE, CATEGORY, DISPLAY_NAME, DESCRIPTION, TOTAL, REMARKS, PCT_OF_TOTAL, PCT_OF_BRANCH, "經手人"]
        );
        // 沒有分倉費用時分倉佔比固定為 0%
        assert_eq!(cell_at(&sheet, 0, PCT_OF_BRANCH), &Cell::text(ZERO_PERCENT));
    }

    #[test]
    fn unknown_fee_code_and_text_total_degrade_quietly() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![
                vec![Cell::Number(555.0), Cell::text("未知"), Cell::Number(40.0)],
                vec![Cell::Number(101.0), Cell::text("倉租"), Cell::text("待補")],
            ],
        );
        let totals = enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        assert_eq!(cell_at(&sheet, 0, CATEGORY), &Cell::text(""));
        assert_eq!(cell_at(&sheet, 0, DISPLAY_NAME), &Cell::text(""));
        assert_eq!(cell_at(&sheet, 1, TOTAL), &Cell::Number(0.0));
        assert_eq!(totals.branch_subtotal, 0.0);
        assert_eq!(totals.raw_sum, 40.0);
        // 原有兩列 + 三列小計
        assert_eq!(sheet.rows.len(), 5);
    }

    #[test]
    fn summary_rows_are_appended_in_fixed_order() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![vec![Cell::Number(101.0), Cell::text("倉租"), Cell::Number(200.0)]],
        );
        enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        let labels: Vec<String> = sheet.rows[1..].iter().map(|r| cell_at_row(&sheet, r, DESCRIPTION)).collect();
        assert_eq!(labels, [LABEL_UNTAXED, LABEL_TAXED, LABEL_BRANCH]);
        assert_eq!(cell_at(&sheet, 3, TOTAL), &Cell::Number(210.0));
        assert_eq!(cell_at(&sheet, 3, FEE_CODE), &Cell::Empty);
    }

    fn cell_at_row(sheet: &Sheet, row: &crate::workbook::Row, column: &str) -> String {
        row.get(sheet.column(column).unwrap()).to_string()
    }

    #[test]
    fn percentages_sum_to_roughly_one_hundred() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![
                vec![Cell::Number(101.0), Cell::text("a"), Cell::Number(333.0)],
                vec![Cell::Number(102.0), Cell::text("b"), Cell::Number(333.0)],
                vec![Cell::Number(102.0), Cell::text("c"), Cell::Number(334.0)],
            ],
        );
        enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        let sum: f64 = (0..3)
            .map(|i| cell_at(&sheet, i, PCT_OF_TOTAL).to_string().trim_end_matches('%').parse::<f64>().unwrap())
            .sum();
        assert!((sum - 100.0).abs() <= 0.3, "sum was {}", sum);
    }

    #[test]
    fn missing_required_column_leaves_sheet_untouched() {
        let mut sheet = detail_sheet(&[FEE_CODE, TOTAL], vec![vec![Cell::Number(101.0), Cell::Number(1.0)]]);
        let before = sheet.clone();
        let err = enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap_err();
        assert!(matches!(err, LedgerError::MissingColumns { .. }));
        assert_eq!(sheet, before);
    }

    #[test]
    fn details_carry_description_and_catalog_fields() {
        let sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![
                vec![Cell::Number(101.0), Cell::text("三月倉租"), Cell::Number(80.0)],
                vec![Cell::Number(555.0), Cell::text("雜支"), Cell::text("n/a")],
            ],
        );
        let details = collect_details(&sheet, &catalog()).unwrap();
        assert_eq!(details[0].fee_description, "三月倉租");
        assert_eq!(details[0].display_name, "倉租");
        assert_eq!(details[0].attribution, Some(Attribution::Branch));
        assert_eq!(details[1].fee_description, "雜支");
        assert_eq!(details[1].attribution, None);
        assert_eq!(details[1].total, 0.0);
    }

    #[test]
    fn sheet_without_branch_rows_has_positive_zero_subtotal() {
        let mut sheet = detail_sheet(
            &[FEE_CODE, DESCRIPTION, TOTAL],
            vec![vec![Cell::Number(102.0), Cell::text("運費"), Cell::Number(10.0)]],
        );
        let totals = enrich_sheet(&mut sheet, &catalog(), &LedgerConfig::default()).unwrap();
        assert_eq!(totals.branch_subtotal, 0.0);
        assert!(totals.branch_subtotal.is_sign_positive());
        assert!(totals.exempt_sum.is_sign_positive());
        assert!(totals.branch_revenue_taxed.is_sign_positive());
        let summary = crate::aggregate::GlobalSummaryRow::from_sheet(&sheet);
        assert!(summary.branch_revenue.is_sign_positive());
    }

    #[test]
    fn zero_base_yields_zero_percent() {
        assert_eq!(percent_of(50.0, 0.0, 1.05), ZERO_PERCENT);
        assert_eq!(percent_of(100.0, 210.0, 1.05), "50.0%");
    }
}
