use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// A partition currently attached on the backend.
pub struct MountRecord {
    pub id: String,
    pub disk_path: String,
    pub name: Option<String>,
    pub start: Option<i64>,
    pub size: Option<i64>,
}

impl MountRecord {
    /// File name of the backing disk image, tolerating Windows separators.
    pub fn disk_base_name(&self) -> &str {
        self.disk_path
            .rsplit(['/', '\\'])
            .find(|part| !part.is_empty())
            .unwrap_or(self.disk_path.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountField {
    Id,
    DiskPath,
    Name,
    Start,
    Size,
}

// Casings seen across backend revisions, checked in order.
const MOUNT_FIELD_ALIASES: &[(MountField, &[&str])] = &[
    (MountField::Id, &["id", "ID", "Id"]),
    (
        MountField::DiskPath,
        &["diskPath", "disk_path", "DiskPath", "path", "Path"],
    ),
    (
        MountField::Name,
        &["name", "part_name", "partName", "PartName", "Name"],
    ),
    (MountField::Start, &["start", "Start"]),
    (MountField::Size, &["size", "Size"]),
];

fn aliased_field(object: &serde_json::Map<String, Value>, field: MountField) -> Option<&Value> {
    let (_, aliases) = MOUNT_FIELD_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == field)?;
    aliases
        .iter()
        .filter_map(|alias| object.get(*alias))
        .find(|value| !value.is_null())
}

fn aliased_text(object: &serde_json::Map<String, Value>, field: MountField) -> Option<String> {
    let text = match aliased_field(object, field)? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn aliased_integer(object: &serde_json::Map<String, Value>, field: MountField) -> Option<i64> {
    match aliased_field(object, field)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Normalizes one mount object; records without an id or disk path are dropped.
pub fn normalize_mount(value: &Value) -> Option<MountRecord> {
    let object = value.as_object()?;
    Some(MountRecord {
        id: aliased_text(object, MountField::Id)?,
        disk_path: aliased_text(object, MountField::DiskPath)?,
        name: aliased_text(object, MountField::Name),
        start: aliased_integer(object, MountField::Start),
        size: aliased_integer(object, MountField::Size),
    })
}

/// Normalizes a `/mounts` body. Anything but an array yields no mounts.
pub fn normalize_mounts(value: &Value) -> Vec<MountRecord> {
    value
        .as_array()
        .map(|rows| rows.iter().filter_map(normalize_mount).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_mount, normalize_mounts, MountRecord};

    #[test]
    fn unit_normalize_mount_accepts_each_casing() {
        let camel = normalize_mount(&json!({"id": "391A", "diskPath": "/d/A.mia"})).expect("camel");
        let snake = normalize_mount(&json!({"ID": "391A", "disk_path": "/d/A.mia"})).expect("snake");
        let pascal =
            normalize_mount(&json!({"Id": "391A", "DiskPath": "/d/A.mia"})).expect("pascal");
        assert_eq!(camel, snake);
        assert_eq!(snake, pascal);
    }

    #[test]
    fn functional_normalize_mount_reads_optional_geometry_from_numbers_or_strings() {
        let record = normalize_mount(&json!({
            "id": "392A",
            "disk_path": "C:\\discos\\B.mia",
            "part_name": "Part2",
            "start": 1024,
            "Size": "2048"
        }))
        .expect("record");
        assert_eq!(
            record,
            MountRecord {
                id: "392A".to_string(),
                disk_path: "C:\\discos\\B.mia".to_string(),
                name: Some("Part2".to_string()),
                start: Some(1024),
                size: Some(2048),
            }
        );
        assert_eq!(record.disk_base_name(), "B.mia");
    }

    #[test]
    fn regression_normalize_mounts_drops_incomplete_rows_and_non_arrays() {
        let rows = normalize_mounts(&json!([
            {"id": "391A", "diskPath": "/d/A.mia"},
            {"id": "", "diskPath": "/d/B.mia"},
            {"diskPath": "/d/C.mia"},
            "garbage"
        ]));
        assert_eq!(rows.len(), 1);
        assert!(normalize_mounts(&json!({"error": "no mounts"})).is_empty());
    }
}
