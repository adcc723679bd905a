use std::collections::HashMap;

use patentupload_protocol::ColumnMapping;

use crate::error::ExcelError;

/// Header columns the import service recognizes out of the box.
pub const DEFAULT_HEADERS: &[&str] = &["申请号", "申请日", "名称", "类型", "法律状态", "申请人"];

/// Identity mappings for [`DEFAULT_HEADERS`].
pub fn default_mappings() -> Vec<ColumnMapping> {
    DEFAULT_HEADERS
        .iter()
        .map(|h| ColumnMapping::new(*h, *h))
        .collect()
}

/// Parses `ORIGINAL:MAPPED`. Both sides are trimmed and must be non-empty.
///
/// Splits on the first `:` so mapped names may contain colons.
pub fn parse_column_mapping(s: &str) -> Result<ColumnMapping, ExcelError> {
    let (original, mapped) = s
        .split_once(':')
        .ok_or_else(|| ExcelError::InvalidMapping(s.to_string()))?;
    let (original, mapped) = (original.trim(), mapped.trim());
    if original.is_empty() || mapped.is_empty() {
        return Err(ExcelError::InvalidMapping(s.to_string()));
    }
    Ok(ColumnMapping::new(original, mapped))
}

/// Header lookup table. A later mapping for the same header wins.
pub fn mapping_table(mappings: &[ColumnMapping]) -> HashMap<String, String> {
    mappings
        .iter()
        .map(|m| (m.original.clone(), m.mapped.clone()))
        .collect()
}
