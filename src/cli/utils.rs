use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output a collection: JSON as-is, text via one formatted line per item
pub fn output_collection<T: Serialize>(
    output_format: &OutputFormat,
    collection_name: &str,
    items: &[T],
    empty_message: &str,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ collection_name: items }))?
            );
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_message);
            }
            for item in items {
                println!("{}", line(item));
            }
        }
    }
    Ok(())
}

/// Output a single record: JSON as-is, text as `key: value` lines
pub fn output_record<T: Serialize>(
    output_format: &OutputFormat,
    record: &T,
    fields: &[(&str, String)],
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        OutputFormat::Text => {
            for (label, value) in fields {
                println!("{:<12} {}", format!("{}:", label), value);
            }
        }
    }
    Ok(())
}

/// One-based "page X of N (M total)" footer for paged text output
pub fn page_footer(page_number: u32, total_pages: u32, total_elements: u64) -> String {
    format!(
        "page {} of {} ({} total)",
        page_number + 1,
        total_pages.max(1),
        total_elements
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_footer_is_one_based() {
        assert_eq!(page_footer(0, 3, 25), "page 1 of 3 (25 total)");
        assert_eq!(page_footer(0, 0, 0), "page 1 of 1 (0 total)");
    }
}
