//! Encodings of the issued-certificates report
//!
//! Every encoder writes [`REPORT_COLUMNS`] followed by the row cells in the
//! same order, so all outputs carry identical content.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppError, AppResult};
use crate::models::{ReportRow, REPORT_COLUMNS};
use crate::services::notification::escape_html;

pub const EMPTY_REPORT_NOTICE: &str = "There are no issued certificates";

fn export_error(format: &str) -> impl Fn(String) -> AppError + '_ {
    move |message| AppError::Export(format!("{} export failed: {}", format, message))
}

fn escape_xml(text: &str) -> String {
    escape_html(text)
}

// ============================================================================
// HTML
// ============================================================================

pub fn render_html(title: &str, rows: &[ReportRow]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>");
    html.push_str(&escape_html(title));
    html.push_str("</title></head><body>\n");
    html.push_str(&format!("<h2>{}</h2>\n", escape_html(title)));

    if rows.is_empty() {
        html.push_str(&format!("<p class=\"notice\">{}</p>\n", EMPTY_REPORT_NOTICE));
    } else {
        html.push_str("<table class=\"generaltable\">\n<thead><tr>");
        for column in REPORT_COLUMNS {
            html.push_str(&format!("<th>{}</th>", escape_html(column)));
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for row in rows {
            html.push_str("<tr>");
            for cell in row.cells() {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("</body></html>\n");
    html
}

// ============================================================================
// Tab-delimited text
// ============================================================================

pub fn render_txt(rows: &[ReportRow]) -> AppResult<Vec<u8>> {
    let error = export_error("Text");
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(vec![]);
    wtr.write_record(REPORT_COLUMNS).map_err(|e| error(e.to_string()))?;
    for row in rows {
        wtr.write_record(row.cells()).map_err(|e| error(e.to_string()))?;
    }
    wtr.into_inner().map_err(|e| error(e.to_string()))
}

// ============================================================================
// Spreadsheets
// ============================================================================

fn zip_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    options: FileOptions,
    content: &str,
) -> Result<(), String> {
    zip.start_file(name, options).map_err(|e| e.to_string())?;
    zip.write_all(content.as_bytes()).map_err(|e| e.to_string())
}

fn ods_row(cells: &[&str]) -> String {
    let mut xml = String::from("<table:table-row>");
    for cell in cells {
        xml.push_str(&format!(
            "<table:table-cell office:value-type=\"string\"><text:p>{}</text:p></table:table-cell>",
            escape_xml(cell)
        ));
    }
    xml.push_str("</table:table-row>");
    xml
}

const ODS_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#;

/// OpenDocument spreadsheet with a single sheet
pub fn render_ods(sheet: &str, rows: &[ReportRow]) -> AppResult<Vec<u8>> {
    let mut content = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<office:document-content \
         xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\" \
         xmlns:table=\"urn:oasis:names:tc:opendocument:xmlns:table:1.0\" \
         xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\" office:version=\"1.2\">\
         <office:body><office:spreadsheet>",
    );
    content.push_str(&format!("<table:table table:name=\"{}\">", escape_xml(sheet)));
    content.push_str(&ods_row(&REPORT_COLUMNS));
    for row in rows {
        content.push_str(&ods_row(&row.cells()));
    }
    content.push_str("</table:table></office:spreadsheet></office:body></office:document-content>\n");

    let build = || -> Result<Vec<u8>, String> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        // The mimetype entry must come first and stay uncompressed
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip_entry(&mut zip, "mimetype", stored, "application/vnd.oasis.opendocument.spreadsheet")?;
        zip_entry(&mut zip, "content.xml", deflated, &content)?;
        zip_entry(&mut zip, "META-INF/manifest.xml", deflated, ODS_MANIFEST)?;
        Ok(zip.finish().map_err(|e| e.to_string())?.into_inner())
    };
    build().map_err(export_error("ODS"))
}

const XLSX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>
"#;

const XLSX_ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>
"#;

const XLSX_WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>
"#;

/// Spreadsheet column letter of a zero-based index
fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn xlsx_row(number: usize, cells: &[&str]) -> String {
    let mut xml = format!("<row r=\"{}\">", number);
    for (i, cell) in cells.iter().enumerate() {
        xml.push_str(&format!(
            "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            column_letter(i),
            number,
            escape_xml(cell)
        ));
    }
    xml.push_str("</row>");
    xml
}

/// Office Open XML workbook with a single sheet of inline strings
pub fn render_xlsx(sheet: &str, rows: &[ReportRow]) -> AppResult<Vec<u8>> {
    // Sheet names are limited to 31 characters
    let sheet_name: String = sheet.chars().take(31).collect();
    let workbook = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<workbook \
         xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>\n",
        escape_xml(&sheet_name)
    );

    let mut worksheet = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<worksheet \
         xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    worksheet.push_str(&xlsx_row(1, &REPORT_COLUMNS));
    for (i, row) in rows.iter().enumerate() {
        worksheet.push_str(&xlsx_row(i + 2, &row.cells()));
    }
    worksheet.push_str("</sheetData></worksheet>\n");

    let build = || -> Result<Vec<u8>, String> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip_entry(&mut zip, "[Content_Types].xml", opts, XLSX_CONTENT_TYPES)?;
        zip_entry(&mut zip, "_rels/.rels", opts, XLSX_ROOT_RELS)?;
        zip_entry(&mut zip, "xl/workbook.xml", opts, &workbook)?;
        zip_entry(&mut zip, "xl/_rels/workbook.xml.rels", opts, XLSX_WORKBOOK_RELS)?;
        zip_entry(&mut zip, "xl/worksheets/sheet1.xml", opts, &worksheet)?;
        Ok(zip.finish().map_err(|e| e.to_string())?.into_inner())
    };
    build().map_err(export_error("XLSX"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ReportRow {
        ReportRow {
            last_name: "Lovelace".to_string(),
            first_name: "Ada".to_string(),
            id_number: "S-1".to_string(),
            groups: "Group A, Group B".to_string(),
            date: "Tuesday, 5 March 2024, 10:30 AM".to_string(),
            grade: "85.00".to_string(),
            code: "aB3dE5gH9k".to_string(),
        }
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(6), "G");
        assert_eq!(column_letter(26), "AA");
    }

    #[test]
    fn text_export_is_tab_separated() {
        let bytes = render_txt(&[row()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), REPORT_COLUMNS.join("\t"));
        assert_eq!(lines.next().unwrap().split('\t').count(), 7);
    }

    #[test]
    fn empty_html_report_shows_notice() {
        let html = render_html("Report", &[]);
        assert!(html.contains(EMPTY_REPORT_NOTICE));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn spreadsheets_are_zip_archives() {
        let ods = render_ods("Report", &[row()]).unwrap();
        let xlsx = render_xlsx("Report", &[row()]).unwrap();
        assert!(ods.starts_with(b"PK"));
        assert!(xlsx.starts_with(b"PK"));
    }
}
