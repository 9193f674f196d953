//! Export archive decoding: a zip whose first entry is a tab-delimited CSV

use crate::api::error::{ApiError, ApiResult};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::Cursor;

/// Status reported when a downloaded archive cannot be read
const DOWNLOAD_STATUS: u16 = 200;

/// Map lowercased `key_field` values to `id_field` values
///
/// Column names are matched case-insensitively against the CSV header.
/// Rows with an empty key are skipped; a repeated key keeps its last id.
pub fn parse_export_archive(
    bytes: &[u8],
    key_field: &str,
    id_field: &str,
) -> ApiResult<HashMap<String, String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ApiError::unparsable(DOWNLOAD_STATUS, format!("export archive: {}", e)))?;
    let entry = archive
        .by_index(0)
        .map_err(|e| ApiError::unparsable(DOWNLOAD_STATUS, format!("export archive entry: {}", e)))?;
    debug!("Reading export entry '{}' ({} bytes)", entry.name(), entry.size());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(entry);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::unparsable(DOWNLOAD_STATUS, format!("export header: {}", e)))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ApiError::unparsable(DOWNLOAD_STATUS, format!("export has no '{}' column", name))
            })
    };
    let key_column = column(key_field)?;
    let id_column = column(id_field)?;

    let mut mapping = HashMap::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| ApiError::unparsable(DOWNLOAD_STATUS, format!("export row: {}", e)))?;
        let (Some(key), Some(id)) = (record.get(key_column), record.get(id_column)) else {
            warn!("Skipping short export row {:?}", record.position());
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        mapping.insert(key.to_lowercase(), id.trim().to_string());
    }

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(csv: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("ProductExport.csv", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(csv.as_bytes()).unwrap();
        writer.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"ignored").unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_first_entry_is_parsed() {
        let bytes = archive("Sku\tProductId\tName\nABC-1\t101\tWidget\nabc-2\t102\tGadget\n");
        let mapping = parse_export_archive(&bytes, "sku", "productid").unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("abc-1").map(String::as_str), Some("101"));
        assert_eq!(mapping.get("abc-2").map(String::as_str), Some("102"));
    }

    #[test]
    fn test_blank_keys_are_skipped() {
        let bytes = archive("Sku\tProductId\n\t103\nX\t104\n");
        let mapping = parse_export_archive(&bytes, "Sku", "ProductId").unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["x"], "104");
    }

    #[test]
    fn test_missing_column_is_error() {
        let bytes = archive("Sku\tName\nA\tWidget\n");
        assert!(parse_export_archive(&bytes, "Sku", "ProductId").is_err());
    }

    #[test]
    fn test_not_a_zip_is_error() {
        let error = parse_export_archive(b"Sku\tProductId\n", "Sku", "ProductId").unwrap_err();
        assert_eq!(error.status(), Some(200));
    }
}
