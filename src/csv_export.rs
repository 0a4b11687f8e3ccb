use crate::models::ProspectDataCache;

pub const EXPORT_HEADER: &str = "cache_key,name,city,state,data_quality,sources,updated_at";

/// Quotes a field when it contains a comma, quote or line break; embedded
/// quotes are doubled.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders cache records as CSV, one row per record. Populated source fields
/// are listed in the `sources` column separated by `;`.
pub fn export_prospect_cache(records: &[ProspectDataCache]) -> String {
    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');

    for record in records {
        let sources = record
            .populated_fields()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let updated_at = record.updated_at.to_rfc3339();
        let row = [
            record.cache_key.as_str(),
            record.prospect.name.as_str(),
            record.prospect.city.as_deref().unwrap_or(""),
            record.prospect.state.as_deref().unwrap_or(""),
            record.data_quality.as_str(),
            sources.as_str(),
            updated_at.as_str(),
        ]
        .iter()
        .map(|field| escape_csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }

    out
}
