//! 帳本的固定欄位契約，以及依宣告順序重排欄位的 [`LayoutBuilder`]。

use crate::workbook::{Cell, Row, Sheet};

// 保留分頁
pub const FEE_SHEET: &str = "費用編號表";
pub const CUSTOMER_SHEET: &str = "客戶列表";
pub const SUMMARY_SHEET: &str = "營收統計";
pub const RESERVED_SHEETS: [&str; 3] = [FEE_SHEET, CUSTOMER_SHEET, SUMMARY_SHEET];

// 費用編號表
pub const FEE_CODE: &str = "費用編號";
pub const FEE_CATEGORY: &str = "所屬";
pub const FEE_ITEM: &str = "項目";

// 客戶列表
pub const CUSTOMER_NAME: &str = "客戶名稱";
pub const CUSTOMER_CODE: &str = "客戶編號";
pub const CHECK_FLAG: &str = "請檢查";
pub const RECEIVABLE_UNTAXED: &str = "分倉應收賬款（未稅）";
pub const RECEIVABLE_TAXED: &str = "分倉應收賬款（含稅）";
pub const INVALID_MARKER: &str = "***";

// 客戶分頁
pub const DESCRIPTION: &str = "費用";
pub const TOTAL: &str = "總計";
pub const REMARKS: &str = "備註";
pub const CATEGORY: &str = "所屬";
pub const DISPLAY_NAME: &str = "項目名";
pub const PCT_OF_TOTAL: &str = "佔總營收比例";
pub const PCT_OF_BRANCH: &str = "佔分倉營收比例";
pub const DETAIL_REQUIRED: [&str; 3] = [FEE_CODE, DESCRIPTION, TOTAL];

// 分頁小計列標籤（寫在「費用」欄）
pub const LABEL_UNTAXED: &str = "未稅營收";
pub const LABEL_TAXED: &str = "總營收（含稅）";
pub const LABEL_BRANCH: &str = "分倉營收（含稅）";

// 營收統計
pub const SUMMARY_SHEET_ID: &str = "分頁";
pub const SUMMARY_UNTAXED: &str = LABEL_UNTAXED;
pub const SUMMARY_TAXED: &str = LABEL_TAXED;
pub const SUMMARY_BRANCH: &str = LABEL_BRANCH;
pub const GRAND_TOTAL_LABEL: &str = "總計";

pub fn is_reserved_sheet(name: &str) -> bool {
    RESERVED_SHEETS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Original(usize),
    Derived(usize),
}

#[derive(Debug, Clone)]
struct LayoutColumn {
    name: String,
    source: Source,
}

/// 以既有表頭為起點，宣告衍生欄位應插入的位置，最後一次投影出新表。
///
/// 插入的衍生欄位若與原有欄位同名，原欄位會被取代。
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    columns: Vec<LayoutColumn>,
    derived: Vec<String>,
}

pub enum Anchor<'a> {
    After(&'a str),
    Before(&'a str),
}

impl LayoutBuilder {
    pub fn from_header(header: &[String]) -> Self {
        let columns = header
            .iter()
            .enumerate()
            .map(|(i, name)| LayoutColumn { name: name.clone(), source: Source::Original(i) })
            .collect();
        Self { columns, derived: Vec::new() }
    }

    fn take_derived(&mut self, names: &[&str]) -> Vec<LayoutColumn> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            self.columns.retain(|c| c.name.trim() != *name);
            let idx = self.derived.len();
            self.derived.push(name.to_string());
            out.push(LayoutColumn { name: name.to_string(), source: Source::Derived(idx) });
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.trim() == name)
    }

    /// 插到錨點欄位前/後；找不到錨點時 `After` 落在最後、`Before` 落在最前
    pub fn insert(mut self, anchor: Anchor<'_>, names: &[&str]) -> Self {
        let new_cols = self.take_derived(names);
        let at = match anchor {
            Anchor::After(a) => self.position(a).map(|i| i + 1).unwrap_or(self.columns.len()),
            Anchor::Before(a) => self.position(a).unwrap_or(0),
        };
        self.columns.splice(at..at, new_cols);
        self
    }

    pub fn append(mut self, names: &[&str]) -> Self {
        let new_cols = self.take_derived(names);
        self.columns.extend(new_cols);
        self
    }

    pub fn build(self) -> Layout {
        Layout { columns: self.columns, derived: self.derived }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    columns: Vec<LayoutColumn>,
    derived: Vec<String>,
}

impl Layout {
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.trim() == name)
    }

    /// 依版面重建 `sheet`。`derived` 以衍生欄位名稱取值，回傳每列對應的儲存格。
    pub fn project<F>(&self, sheet: &mut Sheet, mut derived: F)
    where
        F: FnMut(&str, usize) -> Cell,
    {
        let rows = std::mem::take(&mut sheet.rows);
        sheet.rows = rows
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let cells = self
                    .columns
                    .iter()
                    .map(|col| match col.source {
                        Source::Original(i) => row.cells.get(i).cloned().unwrap_or_default(),
                        Source::Derived(d) => derived(&self.derived[d], row_idx),
                    })
                    .collect();
                Row { cells, style: row.style }
            })
            .collect();
        sheet.header = self.header();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn inserts_after_anchor_and_appends_when_anchor_missing() {
        let layout = LayoutBuilder::from_header(&header(&["日期", FEE_CODE, DESCRIPTION, TOTAL]))
            .insert(Anchor::After(FEE_CODE), &[CATEGORY, DISPLAY_NAME])
            .insert(Anchor::After(REMARKS), &[PCT_OF_TOTAL])
            .build();
        assert_eq!(
            layout.header(),
            header(&["日期", FEE_CODE, CATEGORY, DISPLAY_NAME, DESCRIPTION, TOTAL, PCT_OF_TOTAL])
        );
    }

    #[test]
    fn before_missing_anchor_goes_to_front() {
        let layout = LayoutBuilder::from_header(&header(&[CUSTOMER_NAME]))
            .insert(Anchor::Before(CUSTOMER_CODE), &[CHECK_FLAG])
            .append(&[RECEIVABLE_UNTAXED])
            .build();
        assert_eq!(layout.header(), header(&[CHECK_FLAG, CUSTOMER_NAME, RECEIVABLE_UNTAXED]));
    }

    #[test]
    fn derived_column_replaces_same_named_source() {
        let mut sheet = Sheet::new("AB", header(&[CATEGORY, FEE_CODE]));
        sheet.rows.push(Row::new(vec![Cell::Text("舊".into()), Cell::Number(1.0)]));
        let layout = LayoutBuilder::from_header(&sheet.header)
            .insert(Anchor::After(FEE_CODE), &[CATEGORY])
            .build();
        layout.project(&mut sheet, |_, _| Cell::Number(2.0));
        assert_eq!(sheet.header, header(&[FEE_CODE, CATEGORY]));
        assert_eq!(sheet.rows[0].cells, vec![Cell::Number(1.0), Cell::Number(2.0)]);
    }
}
