use serde_json::{json, Map, Value};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format.
///
/// In text mode each field of `data` is printed as `key: value` on its own
/// line so the values can be pasted into a shell.
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Map<String, Value>>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "message": message });
            if let (Some(fields), Some(target)) = (data, response.as_object_mut()) {
                target.extend(fields);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("✓ {}", message);
            for (key, value) in data.unwrap_or_default() {
                match value {
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
    }
    Ok(())
}
