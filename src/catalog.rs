use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::schema::{FEE_CATEGORY, FEE_CODE, FEE_ITEM, FEE_SHEET};
use crate::workbook::{Cell, LedgerBook};

/// 費用類別在對賬上的意義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// 計入分倉應收賬款
    Branch,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeCatalogEntry {
    pub code: String,
    /// 原始「所屬」值，回填客戶分頁時照原樣輸出
    pub category: Cell,
    pub display_name: String,
    pub attribution: Attribution,
}

/// 費用編號 → (所屬, 項目)，載入後唯讀
#[derive(Debug, Clone, Default)]
pub struct FeeCatalog {
    entries: HashMap<String, FeeCatalogEntry>,
}

impl FeeCatalog {
    pub fn load(book: &LedgerBook, config: &LedgerConfig) -> LedgerResult<Self> {
        let sheet = book.readable(FEE_SHEET)?;
        let idx = sheet.require(&[FEE_CODE, FEE_CATEGORY, FEE_ITEM])?;
        let (code_i, cat_i, item_i) = (idx[0], idx[1], idx[2]);

        let mut entries = HashMap::new();
        for row in &sheet.rows {
            let Some(code) = row.get(code_i).key() else { continue };
            let category = row.get(cat_i).clone();
            let attribution = match category.as_i64() {
                Some(tag) if tag == config.branch_category => Attribution::Branch,
                _ => Attribution::Other,
            };
            let entry = FeeCatalogEntry {
                code: code.clone(),
                category,
                display_name: row.get(item_i).to_string(),
                attribution,
            };
            // 重複編號以最後一筆為準
            if entries.insert(code.clone(), entry).is_some() {
                warn!(code = %code, "費用編號表中有重複的費用編號");
            }
        }
        debug!(entries = entries.len(), "fee catalog loaded");
        Ok(Self { entries })
    }

    pub fn lookup(&self, code: &Cell) -> Option<&FeeCatalogEntry> {
        code.key().and_then(|k| self.entries.get(&k))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<FeeCatalogEntry>) -> Self {
        Self { entries: entries.into_iter().map(|e| (e.code.clone(), e)).collect() }
    }
}
