use anyhow::Result;
use rust_xlsxwriter::Workbook;

// 產生一份示範帳單，供手動測試 reconcile / server 使用
fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "sample_ledger.xlsx".to_string());
    let mut workbook = Workbook::new();

    let fees = workbook.add_worksheet();
    fees.set_name("費用編號表")?;
    for (col, h) in ["費用編號", "所屬", "項目"].iter().enumerate() {
        fees.write_string(0, col as u16, *h)?;
    }
    let fee_rows: [(f64, f64, &str); 5] = [
        (101.0, 2.0, "倉儲費"),
        (102.0, 2.0, "裝卸費"),
        (201.0, 1.0, "運費"),
        (301.0, 3.0, "包材費"),
        (921.0, 3.0, "代收代付"),
    ];
    for (i, (code, category, item)) in fee_rows.iter().enumerate() {
        let r = (i + 1) as u32;
        fees.write_number(r, 0, *code)?;
        fees.write_number(r, 1, *category)?;
        fees.write_string(r, 2, *item)?;
    }

    let customers = workbook.add_worksheet();
    customers.set_name("客戶列表")?;
    customers.write_string(0, 0, "客戶編號")?;
    customers.write_string(0, 1, "客戶名稱")?;
    let customer_rows = [("C001", "好運物流"), ("C002", "大昌貿易"), ("C003", "好運物流二廠"), ("C004", "")];
    for (i, (code, name)) in customer_rows.iter().enumerate() {
        let r = (i + 1) as u32;
        customers.write_string(r, 0, *code)?;
        if !name.is_empty() {
            customers.write_string(r, 1, *name)?;
        }
    }

    let detail = workbook.add_worksheet();
    detail.set_name("好運倉")?;
    for (col, h) in ["費用編號", "費用", "總計", "備註"].iter().enumerate() {
        detail.write_string(0, col as u16, *h)?;
    }
    let detail_rows: [(f64, &str, f64, &str); 5] = [
        (101.0, "三月倉儲", 12000.0, ""),
        (102.0, "三月裝卸", 3500.0, "含加班"),
        (201.0, "北部配送", 8200.0, ""),
        (921.0, "代付關稅", 1500.0, "代收代付"),
        (999.0, "未登錄費用", 300.0, ""),
    ];
    for (i, (code, desc, total, note)) in detail_rows.iter().enumerate() {
        let r = (i + 1) as u32;
        detail.write_number(r, 0, *code)?;
        detail.write_string(r, 1, *desc)?;
        detail.write_number(r, 2, *total)?;
        if !note.is_empty() {
            detail.write_string(r, 3, *note)?;
        }
    }

    workbook.save(&path)?;
    println!("✅ 示範帳單已產生: {}", path);
    Ok(())
}
