//! File read/write tools, typed by extension.
//!
//! `.json` and `.csv` get structured handling; everything else is plain
//! text. The csv handling is a deliberately small header-plus-rows codec,
//! enough for the record shapes the pipeline moves around.

use std::path::Path;

use async_trait::async_trait;
use pilot_core::{Tool, ToolInput, ToolOutput};
use serde_json::{Map, Value};
use tracing::debug;

/// Read a file and return its contents, parsed when the extension says how.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file (json, csv, or text by extension). Input: {\"path\": \"<file path>\"}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(path) = input.get("path").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: path");
        };

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolOutput::failure(format!("File not found: {}", path));
            }
            Err(e) => return ToolOutput::failure(format!("Failed to read {}: {}", path, e)),
        };

        debug!(path, bytes = raw.len(), "Read file");
        match extension(path).as_deref() {
            Some("json") => match serde_json::from_str::<Value>(&raw) {
                Ok(content) => {
                    let mut data = ToolInput::new();
                    data.insert("content".to_string(), content);
                    data.insert("file_type".to_string(), Value::String("json".to_string()));
                    ToolOutput::ok(data)
                }
                Err(e) => ToolOutput::failure(format!("Invalid JSON in {}: {}", path, e)),
            },
            Some("csv") => match parse_csv(&raw) {
                Ok((columns, records)) => {
                    let mut data = ToolInput::new();
                    data.insert("rows".to_string(), Value::from(records.len()));
                    data.insert("content".to_string(), Value::Array(records));
                    data.insert(
                        "columns".to_string(),
                        Value::Array(columns.into_iter().map(Value::String).collect()),
                    );
                    data.insert("file_type".to_string(), Value::String("csv".to_string()));
                    ToolOutput::ok(data)
                }
                Err(e) => ToolOutput::failure(format!("Invalid CSV in {}: {}", path, e)),
            },
            _ => {
                let mut data = ToolInput::new();
                data.insert("content".to_string(), Value::String(raw));
                data.insert("file_type".to_string(), Value::String("text".to_string()));
                ToolOutput::ok(data)
            }
        }
    }
}

/// Write content to a file, encoding by extension. Parent directories are
/// created as needed.
pub struct WriteFile;

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file (json, csv, or text by extension). Input: {\"path\": \"<file path>\", \"content\": <content>}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(path) = input.get("path").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: path");
        };
        let Some(content) = input.get("content") else {
            return ToolOutput::failure("Missing required parameter: content");
        };

        let rendered = match extension(path).as_deref() {
            Some("json") => match serde_json::to_string_pretty(content) {
                Ok(rendered) => rendered,
                Err(e) => return ToolOutput::failure(format!("Failed to encode JSON: {}", e)),
            },
            Some("csv") => match render_csv(content) {
                Ok(rendered) => rendered,
                Err(e) => return ToolOutput::failure(e),
            },
            _ => match content {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return ToolOutput::failure(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ));
                }
            }
        }

        if let Err(e) = tokio::fs::write(path, rendered).await {
            return ToolOutput::failure(format!("Failed to write {}: {}", path, e));
        }

        debug!(path, "Wrote file");
        let mut data = ToolInput::new();
        data.insert(
            "message".to_string(),
            Value::String(format!("File successfully written to {}", path)),
        );
        ToolOutput::ok(data)
    }
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Load `.json` or `.csv` file contents as a list of records.
pub(crate) async fn load_records(path: &str) -> Result<Vec<Value>, String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => format!("File not found: {}", path),
            _ => format!("Failed to read {}: {}", path, e),
        })?;

    match extension(path).as_deref() {
        Some("json") => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(single @ Value::Object(_)) => Ok(vec![single]),
            Ok(_) => Err(format!("{} does not contain JSON records", path)),
            Err(e) => Err(format!("Invalid JSON in {}: {}", path, e)),
        },
        Some("csv") => parse_csv(&raw).map(|(_, records)| records),
        _ => Err(format!("Unsupported file type: {}", path)),
    }
}

/// Parse header-plus-rows csv text into column names and one object per row.
/// Numeric-looking fields become JSON numbers.
fn parse_csv(raw: &str) -> Result<(Vec<String>, Vec<Value>), String> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or_else(|| "empty file".to_string())?;
    let columns = split_csv_line(header);

    let mut records = Vec::new();
    for (number, line) in lines.enumerate() {
        let fields = split_csv_line(line);
        if fields.len() != columns.len() {
            return Err(format!(
                "row {} has {} fields, expected {}",
                number + 2,
                fields.len(),
                columns.len()
            ));
        }
        let mut record = Map::new();
        for (column, field) in columns.iter().zip(fields) {
            record.insert(column.clone(), parse_csv_field(field));
        }
        records.push(Value::Object(record));
    }

    Ok((columns, records))
}

fn parse_csv_field(field: String) -> Value {
    if let Ok(n) = field.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = field.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(n) {
            return Value::Number(number);
        }
    }
    Value::String(field)
}

/// Split one csv line; double quotes delimit fields and `""` escapes a quote.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Render an array of flat objects as header-plus-rows csv. Column order
/// comes from the first record.
fn render_csv(content: &Value) -> Result<String, String> {
    let Value::Array(records) = content else {
        return Err("Content must be an array of objects for CSV files".to_string());
    };
    let columns: Vec<String> = match records.first() {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        Some(_) => return Err("Content must be an array of objects for CSV files".to_string()),
        None => return Ok(String::new()),
    };

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| escape_csv_field(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for record in records {
        let Value::Object(record) = record else {
            return Err("Content must be an array of objects for CSV files".to_string());
        };
        let row = columns
            .iter()
            .map(|column| match record.get(column) {
                Some(Value::String(s)) => escape_csv_field(s),
                Some(Value::Null) | None => String::new(),
                Some(other) => escape_csv_field(&other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }

    Ok(out)
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(pairs: &[(&str, Value)]) -> ToolInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let path = path.to_string_lossy().to_string();

        let output = ReadFile
            .invoke(&input(&[("path", json!(path.clone()))]))
            .await;

        assert!(!output.success);
        assert_eq!(
            output.error.as_deref(),
            Some(format!("File not found: {}", path).as_str())
        );
    }

    #[tokio::test]
    async fn test_write_then_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt").to_string_lossy().to_string();

        let written = WriteFile
            .invoke(&input(&[
                ("path", json!(path.clone())),
                ("content", json!("hello\nworld")),
            ]))
            .await;
        assert!(written.success);

        let read = ReadFile.invoke(&input(&[("path", json!(path))])).await;
        assert!(read.success);
        assert_eq!(read.data.get("content").unwrap().as_str(), Some("hello\nworld"));
        assert_eq!(read.data.get("file_type").unwrap().as_str(), Some("text"));
    }

    #[tokio::test]
    async fn test_write_then_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json").to_string_lossy().to_string();

        let content = json!({"name": "pilot", "steps": [1, 2, 3]});
        let written = WriteFile
            .invoke(&input(&[
                ("path", json!(path.clone())),
                ("content", content.clone()),
            ]))
            .await;
        assert!(written.success);

        let read = ReadFile.invoke(&input(&[("path", json!(path))])).await;
        assert!(read.success);
        assert_eq!(read.data.get("content").unwrap(), &content);
        assert_eq!(read.data.get("file_type").unwrap().as_str(), Some("json"));
    }

    #[tokio::test]
    async fn test_write_then_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv").to_string_lossy().to_string();

        let content = json!([
            {"region": "north", "total": 12},
            {"region": "south, east", "total": 7}
        ]);
        let written = WriteFile
            .invoke(&input(&[
                ("path", json!(path.clone())),
                ("content", content.clone()),
            ]))
            .await;
        assert!(written.success);

        let read = ReadFile.invoke(&input(&[("path", json!(path))])).await;
        assert!(read.success);
        assert_eq!(read.data.get("content").unwrap(), &content);
        assert_eq!(read.data.get("rows").unwrap().as_u64(), Some(2));
        assert_eq!(
            read.data.get("columns").unwrap(),
            &json!(["region", "total"])
        );
    }

    #[tokio::test]
    async fn test_csv_write_rejects_non_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv").to_string_lossy().to_string();

        let output = WriteFile
            .invoke(&input(&[
                ("path", json!(path)),
                ("content", json!("just a string")),
            ]))
            .await;

        assert!(!output.success);
        assert!(output
            .error
            .as_deref()
            .unwrap()
            .contains("array of objects"));
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("nested/deeper/out.txt")
            .to_string_lossy()
            .to_string();

        let output = WriteFile
            .invoke(&input(&[
                ("path", json!(path.clone())),
                ("content", json!("x")),
            ]))
            .await;

        assert!(output.success);
        assert!(tokio::fs::try_exists(&path).await.unwrap());
    }

    #[test]
    fn test_split_csv_line_handles_quotes() {
        assert_eq!(
            split_csv_line(r#"a,"b,c","say ""hi""""#),
            vec!["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()]
        );
    }

    #[test]
    fn test_csv_row_width_mismatch() {
        let err = parse_csv("a,b\n1,2,3\n").unwrap_err();
        assert!(err.contains("row 2"));
    }

    #[tokio::test]
    async fn test_load_records_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json").to_string_lossy().to_string();
        tokio::fs::write(&path, r#"[{"id": "1"}, {"id": "2"}]"#)
            .await
            .unwrap();

        let records = load_records(&path).await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
