//! 輸出帳冊：先在記憶體中完成樣式標記與分頁排序，最後一次寫成 xlsx。

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use tracing::{debug, warn};

use crate::error::LedgerResult;
use crate::schema::{CHECK_FLAG, CUSTOMER_SHEET, INVALID_MARKER, SUMMARY_SHEET};
use crate::workbook::{Cell, LedgerBook, RowStyle, Sheet};

const ALERT_COLOR: u32 = 0xFF0000;
const DATE_FORMAT: &str = "yyyy-mm-dd";

/// 客戶列表中請檢查為 *** 的列整列標成警示色（只改樣式，不改值）
pub fn mark_invalid_customers(book: &mut LedgerBook) -> usize {
    let Some(sheet) = book.get_mut(CUSTOMER_SHEET) else {
        return 0;
    };
    let Some(flag_col) = sheet.column(CHECK_FLAG) else {
        return 0;
    };
    let mut marked = 0;
    for row in sheet.rows.iter_mut() {
        if matches!(row.get(flag_col), Cell::Text(s) if s == INVALID_MARKER) {
            row.style = RowStyle::Alert;
            marked += 1;
        }
    }
    marked
}

/// 營收統計緊接在客戶列表之後；任一分頁不存在時略過排序
pub fn order_sheets(book: &mut LedgerBook) {
    if book.get(SUMMARY_SHEET).is_none() || book.get(CUSTOMER_SHEET).is_none() {
        warn!("找不到『{}』或『{}』，略過分頁排序", CUSTOMER_SHEET, SUMMARY_SHEET);
        return;
    }
    book.move_after(SUMMARY_SHEET, CUSTOMER_SHEET);
}

/// 樣式與排序兩個呈現步驟
pub fn present(book: &mut LedgerBook) {
    let marked = mark_invalid_customers(book);
    order_sheets(book);
    debug!(marked, "presentation pass done");
}

pub fn to_xlsx_bytes(book: &LedgerBook) -> LedgerResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let formats = Formats::new();
    for sheet in book.sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &formats)?;
    }
    Ok(workbook.save_to_buffer()?)
}

struct Formats {
    header: Format,
    date: Format,
    alert: Format,
    alert_date: Format,
}

impl Formats {
    fn new() -> Self {
        let alert = Format::new().set_font_color(Color::RGB(ALERT_COLOR));
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format(DATE_FORMAT),
            alert_date: alert.clone().set_num_format(DATE_FORMAT),
            alert,
        }
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, formats: &Formats) -> LedgerResult<()> {
    for (col, name) in sheet.header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &formats.header)?;
    }
    for (i, row) in sheet.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let alert = row.style == RowStyle::Alert;
        for (col, cell) in row.cells.iter().enumerate() {
            let c = col as u16;
            match (cell, alert) {
                (Cell::Empty, false) => {}
                (Cell::Empty, true) => {
                    worksheet.write_blank(r, c, &formats.alert)?;
                }
                (Cell::Text(s), false) => {
                    worksheet.write_string(r, c, s)?;
                }
                (Cell::Text(s), true) => {
                    worksheet.write_string_with_format(r, c, s, &formats.alert)?;
                }
                (Cell::Number(n), false) => {
                    worksheet.write_number(r, c, *n)?;
                }
                (Cell::Number(n), true) => {
                    worksheet.write_number_with_format(r, c, *n, &formats.alert)?;
                }
                (Cell::Bool(b), false) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                (Cell::Bool(b), true) => {
                    worksheet.write_boolean_with_format(r, c, *b, &formats.alert)?;
                }
                (Cell::DateTime(n), false) => {
                    worksheet.write_number_with_format(r, c, *n, &formats.date)?;
                }
                (Cell::DateTime(n), true) => {
                    worksheet.write_number_with_format(r, c, *n, &formats.alert_date)?;
                }
            }
        }
    }
    Ok(())
}
