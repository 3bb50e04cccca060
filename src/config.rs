use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_PREFIX_LEN: usize = 2;
pub const DEFAULT_TAX_MULTIPLIER: f64 = 1.05;
pub const DEFAULT_BRANCH_CATEGORY: i64 = 2;
pub const DEFAULT_EXEMPT_FEE_CODE: &str = "921";

/// 對賬時使用的部署常數。不同版本的帳本命名慣例不一致（客戶代碼取 2 或 4 字），
/// 因此以設定檔提供，而不是寫死在程式裡。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// 客戶名稱取前幾個字作為分頁比對代碼
    pub prefix_len: usize,
    /// 含稅倍率
    pub tax_multiplier: f64,
    /// 「所屬」欄中代表分倉（計入分倉應收）的類別值
    pub branch_category: i64,
    /// 不計入營收的費用編號（代收代付）
    pub exempt_fee_code: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            tax_multiplier: DEFAULT_TAX_MULTIPLIER,
            branch_category: DEFAULT_BRANCH_CATEGORY,
            exempt_fee_code: DEFAULT_EXEMPT_FEE_CODE.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("無法讀取 {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            serde_json::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.prefix_len == 0 {
            return Err(LedgerError::Config("prefix_len 必須大於 0".to_string()));
        }
        if !self.tax_multiplier.is_finite() || self.tax_multiplier <= 0.0 {
            return Err(LedgerError::Config(format!(
                "tax_multiplier 必須為正數，目前為 {}",
                self.tax_multiplier
            )));
        }
        if self.exempt_fee_code.trim().is_empty() {
            return Err(LedgerError::Config("exempt_fee_code 不可為空".to_string()));
        }
        Ok(())
    }

    pub fn taxed(&self, amount: f64) -> f64 {
        round_half_even(amount * self.tax_multiplier)
    }
}

/// 與帳本原本使用的四捨六入五成雙一致（銀行家捨入）
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
