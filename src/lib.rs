pub mod aggregate;
pub mod assemble;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod reconcile;
pub mod schema;
pub mod workbook;

pub use aggregate::{CustomerRecord, GlobalSummary, GlobalSummaryRow};
pub use catalog::{Attribution, FeeCatalog, FeeCatalogEntry};
pub use config::LedgerConfig;
pub use enrich::{DetailRow, SheetTotals};
pub use error::{LedgerError, LedgerResult};
pub use logging::init_logging;
pub use matcher::{CheckFlag, MatchOutcome};
pub use reconcile::{output_file_name, reconcile_book, reconcile_bytes, reconcile_file, ReconcileReport};
pub use workbook::{Cell, LedgerBook, Sheet};
