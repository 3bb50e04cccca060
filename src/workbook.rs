//! 帳本在記憶體中的表示：分頁依原始順序存放，各元件以名稱讀寫。

use calamine::{DataType, Reader, Xlsx};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel 序列日期
    DateTime(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// 數值欄位的強制轉換：非數字一律視為 0
    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Number(f) => *f,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Number(f) if f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// 用於比對費用編號：921、921.0 與 "921" 視為同一個鍵
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
            Cell::Number(f) => Some(f.to_string()),
            Cell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Cell::Bool(b) => Some(b.to_string()),
            Cell::DateTime(f) => Some(f.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Cell::Number(n) | Cell::DateTime(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&DataType> for Cell {
    fn from(value: &DataType) -> Self {
        match value {
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Float(f) => Cell::Number(*f),
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Bool(b) => Cell::Bool(*b),
            DataType::DateTime(f) => Cell::DateTime(*f),
            DataType::Empty => Cell::Empty,
            // ISO 日期、錯誤值等照顯示文字保留
            other => {
                let s = other.to_string();
                if s.is_empty() { Cell::Empty } else { Cell::Text(s) }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowStyle {
    #[default]
    Normal,
    /// 整列文字以警示色呈現
    Alert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub style: RowStyle,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells, style: RowStyle::Normal }
    }

    pub fn get(&self, idx: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(idx).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, idx: usize, value: Cell) {
        if self.cells.len() <= idx {
            self.cells.resize(idx + 1, Cell::Empty);
        }
        self.cells[idx] = value;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self { name: name.into(), header, rows: Vec::new() }
    }

    pub fn from_range(name: &str, range: &calamine::Range<DataType>) -> Self {
        let mut rows = range.rows();
        let header = rows
            .next()
            .map(|r| r.iter().map(|c| Cell::from(c).to_string().trim().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|r| Row::new(r.iter().map(Cell::from).collect()))
            // 只略過完全沒有值的列；僅含空白字元的儲存格仍算一列資料
            .filter(|r| !r.cells.iter().all(|c| *c == Cell::Empty))
            .collect();
        Self { name: name.to_string(), header, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    /// 取得必需欄位的索引，缺少時一次回報全部缺少的欄位
    pub fn require(&self, columns: &[&str]) -> LedgerResult<Vec<usize>> {
        let missing: Vec<&str> = columns.iter().copied().filter(|c| self.column(c).is_none()).collect();
        if !missing.is_empty() {
            return Err(LedgerError::missing_columns(&self.name, &missing));
        }
        Ok(columns.iter().filter_map(|c| self.column(c)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(Row::new(cells));
    }
}

/// 以分頁名稱為鍵、保留原始順序的整本帳冊
#[derive(Debug, Clone, Default)]
pub struct LedgerBook {
    sheets: IndexMap<String, Sheet>,
    read_errors: HashMap<String, String>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_xlsx_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| LedgerError::Unreadable(e.to_string()))?;
        let mut book = Self::new();
        for name in workbook.sheet_names().to_vec() {
            match workbook.worksheet_range(&name) {
                Some(Ok(range)) => {
                    let sheet = Sheet::from_range(&name, &range);
                    debug!(sheet = %name, rows = sheet.rows.len(), "loaded sheet");
                    book.insert(sheet);
                }
                Some(Err(e)) => {
                    book.read_errors.insert(name.clone(), e.to_string());
                    book.insert(Sheet::new(name, Vec::new()));
                }
                None => {
                    book.read_errors.insert(name.clone(), "分頁不存在".to_string());
                    book.insert(Sheet::new(name, Vec::new()));
                }
            }
        }
        Ok(book)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.values()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.get_mut(name)
    }

    /// 讀取分頁；若讀檔時該分頁失敗則回報錯誤
    pub fn readable(&self, name: &str) -> LedgerResult<&Sheet> {
        if let Some(reason) = self.read_errors.get(name) {
            return Err(LedgerError::SheetRead { sheet: name.to_string(), reason: reason.clone() });
        }
        self.get(name).ok_or_else(|| LedgerError::MissingSheet(name.to_string()))
    }

    /// 同名分頁會被原地取代，位置不變
    pub fn insert(&mut self, sheet: Sheet) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn remove(&mut self, name: &str) -> Option<Sheet> {
        self.sheets.shift_remove(name)
    }

    /// 將 `name` 移到 `anchor` 之後，其他分頁相對順序不變。任一分頁不存在時回傳 false。
    pub fn move_after(&mut self, name: &str, anchor: &str) -> bool {
        let (Some(from), Some(anchor_idx)) =
            (self.sheets.get_index_of(name), self.sheets.get_index_of(anchor))
        else {
            return false;
        };
        if from == anchor_idx {
            return false;
        }
        let to = if from < anchor_idx { anchor_idx } else { anchor_idx + 1 };
        self.sheets.move_index(from, to);
        true
    }
}
