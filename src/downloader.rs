use crate::error::{Error, Result};
use crate::model::TableData;

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert the table to CSV
///
/// This function exports the cached table to CSV (Comma-Separated Values):
/// - The header is `name`, one column per dimension in table order, then `annotation`
/// - Missing or NaN values are written as 0, the way the table displays them
/// - Fields with commas, quotes or line breaks are quoted
///
/// # Arguments
/// * `table` - The table as last fetched from the backend
///
/// # Returns
/// * `String` - CSV content, one line per row
///
/// # Examples
/// ```
/// use cartesian_plot::downloader::to_csv;
/// use cartesian_plot::model::{DataPoint, Dimension, TableData};
///
/// let table = TableData {
///     dimensions: vec![Dimension::new(1, "speed")],
///     data_points: vec![DataPoint::new("bob").with("speed", 2.5)],
/// };
/// assert_eq!(to_csv(&table), "name,speed,annotation\nbob,2.5,\n");
/// ```
pub fn to_csv(table: &TableData) -> String {
    let mut csv_content = String::new();

    let mut header = vec![csv_field("name")];
    header.extend(table.dimensions.iter().map(|d| csv_field(&d.name)));
    header.push(csv_field("annotation"));
    csv_content.push_str(&header.join(","));
    csv_content.push('\n');

    for row in &table.data_points {
        let mut fields = vec![csv_field(&row.name)];
        fields.extend(
            table
                .dimensions
                .iter()
                .map(|d| row.display_value(&d.name).to_string()),
        );
        fields.push(csv_field(&row.annotation));
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert the table to an XLSX workbook
///
/// One sheet with the same layout as [`to_csv`]; the header row is bold and
/// values are written as numbers.
///
/// # Arguments
/// * `table` - The table as last fetched from the backend
///
/// # Returns
/// * `Result<Vec<u8>>` - The workbook bytes, or `Error::Render` when the
///   table does not fit a worksheet or the writer fails
///
/// # Examples
/// ```
/// use cartesian_plot::downloader::to_xlsx;
/// use cartesian_plot::model::TableData;
///
/// let bytes = to_xlsx(&TableData::default()).unwrap();
/// assert_eq!(&bytes[..2], b"PK");
/// ```
pub fn to_xlsx(table: &TableData) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let xlsx = |e: rust_xlsxwriter::XlsxError| Error::Render(e.to_string());

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    let column = |index: usize| {
        u16::try_from(index + 1)
            .map_err(|_| Error::Render(format!("{} columns do not fit a worksheet", index + 1)))
    };
    let last_col = column(table.dimensions.len())?;
    worksheet
        .write_string_with_format(0, 0, "name", &bold)
        .map_err(xlsx)?;
    for (c, dimension) in table.dimensions.iter().enumerate() {
        worksheet
            .write_string_with_format(0, column(c)?, &dimension.name, &bold)
            .map_err(xlsx)?;
    }
    worksheet
        .write_string_with_format(0, last_col, "annotation", &bold)
        .map_err(xlsx)?;

    for (r, row) in table.data_points.iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| Error::Render(format!("{} rows do not fit a worksheet", r + 1)))?;
        worksheet.write_string(r, 0, &row.name).map_err(xlsx)?;
        for (c, dimension) in table.dimensions.iter().enumerate() {
            worksheet
                .write_number(r, column(c)?, row.display_value(&dimension.name))
                .map_err(xlsx)?;
        }
        worksheet
            .write_string(r, last_col, &row.annotation)
            .map_err(xlsx)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx)
}
