//! Purchase-order spreadsheet export.
//!
//! Renders a PO as an xlsx workbook: a header block, then a products table
//! whose size columns are the union of every size name on the order.
//! Size names are de-duplicated case-insensitively after trimming; the
//! display text comes from the first occurrence. The Total Qty column is
//! summed from the rendered cells, not taken from the stored quantity.
//! Columns are auto-sized to their content.

use rust_xlsxwriter::{Format, Url, Workbook, XlsxError};

use crate::error::ApiError;
use crate::files::url_for;
use crate::models::{Product, PurchaseOrder};

fn normalize_size(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Download filename: PO number with spaces replaced by underscores.
pub fn sheet_filename(po_number: &str) -> String {
    format!("{}.xlsx", po_number.replace(' ', "_"))
}

pub const SHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Size columns in first-seen order across the order's products.
fn collect_size_columns(order: &PurchaseOrder) -> Vec<String> {
    let mut seen = Vec::new();
    let mut columns = Vec::new();
    for product in &order.products {
        for size in &product.sizes {
            let key = normalize_size(&size.size_name);
            if !seen.contains(&key) {
                seen.push(key);
                columns.push(size.size_name.trim().to_string());
            }
        }
    }
    columns
}

/// One table row: the per-column quantities (blank where the product has no
/// such size) and their sum.
fn row_cells(product: &Product, columns: &[String]) -> (Vec<Option<u32>>, u64) {
    let mut cells = Vec::with_capacity(columns.len());
    let mut total: u64 = 0;
    for column in columns {
        let matched = product
            .sizes
            .iter()
            .find(|s| normalize_size(&s.size_name) == normalize_size(column));
        if let Some(size) = matched {
            total += u64::from(size.quantity);
        }
        cells.push(matched.map(|s| s.quantity));
    }
    (cells, total)
}

pub fn render_purchase_order_sheet(
    order: &PurchaseOrder,
    public_base_url: &str,
) -> Result<Vec<u8>, ApiError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Purchase Order")?;

    // Header block.
    sheet.write_string_with_format(0, 0, "PO Number:", &bold)?;
    sheet.write_string(0, 1, &order.po_number)?;
    sheet.write_string_with_format(1, 0, "Tracking Number:", &bold)?;
    sheet.write_string(1, 1, order.tracking_number.as_deref().unwrap_or(""))?;
    sheet.write_string_with_format(2, 0, "Status:", &bold)?;
    sheet.write_string(2, 1, order.tracking.status.as_str())?;
    sheet.write_string_with_format(3, 0, "Invoice:", &bold)?;
    match order.invoice_file.as_deref() {
        Some(file) => {
            let link = url_for(public_base_url, file);
            sheet.write_url(3, 1, Url::new(&link).set_text("View Invoice"))?;
        }
        None => {
            sheet.write_string(3, 1, "—")?;
        }
    }

    sheet.write_string_with_format(5, 0, "Products", &bold)?;

    // Products table.
    let size_columns = collect_size_columns(order);
    let header_row: u32 = 7;
    sheet.write_string_with_format(header_row, 0, "Product Name", &bold)?;
    for (index, column) in size_columns.iter().enumerate() {
        sheet.write_string_with_format(header_row, 1 + index as u16, column, &bold)?;
    }
    let total_col = 1 + size_columns.len() as u16;
    sheet.write_string_with_format(header_row, total_col, "Total Qty", &bold)?;
    sheet.write_string_with_format(header_row, total_col + 1, "Product Image", &bold)?;

    for (offset, product) in order.products.iter().enumerate() {
        let row = header_row + 1 + offset as u32;
        sheet.write_string(row, 0, &product.product_name)?;

        let (cells, total) = row_cells(product, &size_columns);
        for (index, cell) in cells.iter().enumerate() {
            if let Some(qty) = cell {
                sheet.write_number(row, 1 + index as u16, f64::from(*qty))?;
            }
        }
        sheet.write_number(row, total_col, total as f64)?;

        if let Some(file) = product.product_image.as_deref() {
            let link = url_for(public_base_url, file);
            sheet.write_url(row, total_col + 1, Url::new(&link).set_text("View Image"))?;
        }
    }

    sheet.autofit();
    Ok(workbook.save_to_buffer()?)
}

impl From<XlsxError> for ApiError {
    fn from(e: XlsxError) -> Self {
        ApiError::Internal(format!("xlsx: {e}"))
    }
}
