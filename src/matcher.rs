use std::collections::HashSet;

use crate::schema::is_reserved_sheet;
use crate::workbook::{Cell, LedgerBook};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckFlag {
    #[default]
    None,
    /// 找不到對應分頁，或分頁沒有資料
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// 客戶名稱空白，不做任何處理
    Blank,
    NoMatch { code: String },
    /// 分頁已由前面的客戶處理過
    AlreadyProcessed { code: String, sheet: String },
    Matched { code: String, sheet: String },
}

/// 取客戶名稱前 `prefix_len` 個字作為代碼；名稱空白時回傳 None
pub fn customer_code(name: &Cell, prefix_len: usize) -> Option<String> {
    let name = name.to_string();
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.chars().take(prefix_len).collect())
}

/// 依分頁原始順序找出第一個以客戶代碼開頭的分頁（先到先得，不找最佳匹配）
pub struct SheetMatcher {
    candidates: Vec<String>,
    prefix_len: usize,
    processed: HashSet<String>,
}

impl SheetMatcher {
    pub fn new(book: &LedgerBook, prefix_len: usize) -> Self {
        let candidates = book
            .names()
            .filter(|name| !is_reserved_sheet(name))
            .map(str::to_string)
            .collect();
        Self { candidates, prefix_len, processed: HashSet::new() }
    }

    pub fn resolve(&mut self, customer_name: &Cell) -> MatchOutcome {
        let Some(code) = customer_code(customer_name, self.prefix_len) else {
            return MatchOutcome::Blank;
        };
        let Some(sheet) = self.candidates.iter().find(|s| s.starts_with(&code)).cloned() else {
            return MatchOutcome::NoMatch { code };
        };
        if !self.processed.insert(sheet.clone()) {
            return MatchOutcome::AlreadyProcessed { code, sheet };
        }
        MatchOutcome::Matched { code, sheet }
    }
}
