//! 直接读写共享存储的命令
use std::io::{Read, Write};

use handoff_core::api::{RecordInfo, Store};
use serde_json::Value;

use crate::commands::cli::{KeyArgs, ListArgs, PutArgs, UpdateArgs};
use crate::error::CliError;

pub fn handle_list(store: &Store, args: ListArgs, out: &mut dyn Write) -> Result<i32, CliError> {
    let keys = store.list();
    if keys.is_empty() {
        writeln!(out, "(no shared records in {})", store.dir().display())?;
        return Ok(0);
    }

    for key in keys {
        if !args.long {
            writeln!(out, "{key}")?;
            continue;
        }
        match store.info(&key) {
            RecordInfo::Present(meta) => {
                let modified = meta
                    .modified
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(out, "{key}\t{:.2} KB\t{modified}", meta.size_kb())?;
            }
            RecordInfo::Missing => writeln!(out, "{key}\t(deleted)")?,
            RecordInfo::Unreadable { reason } => writeln!(out, "{key}\t(unreadable: {reason})")?,
        }
    }
    Ok(0)
}

pub fn handle_get(store: &Store, args: KeyArgs, out: &mut dyn Write) -> Result<i32, CliError> {
    match store.get(&args.key) {
        Some(value) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(0)
        }
        None => {
            tracing::info!(key = %args.key, "record not found");
            Ok(1)
        }
    }
}

pub fn handle_put(store: &Store, args: PutArgs, out: &mut dyn Write) -> Result<i32, CliError> {
    let value = parse_value(&args.value)?;
    let path = store.try_save(&args.key, &value)?;
    writeln!(out, "saved {} -> {}", args.key, path.display())?;
    Ok(0)
}

pub fn handle_update(
    store: &Store,
    args: UpdateArgs,
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    let value = parse_value(&args.value)?;
    if store.update(&args.key, value, !args.replace) {
        writeln!(out, "updated {}", args.key)?;
        Ok(0)
    } else {
        Ok(1)
    }
}

pub fn handle_delete(store: &Store, args: KeyArgs, out: &mut dyn Write) -> Result<i32, CliError> {
    if store.delete(&args.key) {
        writeln!(out, "deleted {}", args.key)?;
        Ok(0)
    } else {
        Ok(1)
    }
}

pub fn handle_info(store: &Store, args: KeyArgs, out: &mut dyn Write) -> Result<i32, CliError> {
    let info = store.info(&args.key);
    writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
    Ok(if info.exists() { 0 } else { 1 })
}

/// `-` 表示从 stdin 读取
fn parse_value(raw: &str) -> Result<Value, CliError> {
    if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(serde_json::from_str(&buf)?);
    }
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn run<F>(f: F) -> (i32, String)
    where
        F: FnOnce(&mut dyn Write) -> Result<i32, CliError>,
    {
        let mut buf = Vec::new();
        let code = f(&mut buf).unwrap();
        (code, String::from_utf8(buf).unwrap())
    }

    fn key(k: &str) -> KeyArgs {
        KeyArgs { key: k.to_string() }
    }

    #[test]
    fn put_get_update_delete_cycle() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());

        let (code, _) = run(|out| {
            handle_put(
                &store,
                PutArgs {
                    key: "cfg".into(),
                    value: r#"{"a":1,"b":{"x":1}}"#.into(),
                },
                out,
            )
        });
        assert_eq!(code, 0);

        let (code, _) = run(|out| {
            handle_update(
                &store,
                UpdateArgs {
                    key: "cfg".into(),
                    value: r#"{"b":{"y":2}}"#.into(),
                    replace: false,
                },
                out,
            )
        });
        assert_eq!(code, 0);
        assert_eq!(store.get("cfg"), Some(json!({"a": 1, "b": {"y": 2}})));

        let (code, text) = run(|out| handle_get(&store, key("cfg"), out));
        assert_eq!(code, 0);
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"a": 1, "b": {"y": 2}}));

        assert_eq!(run(|out| handle_delete(&store, key("cfg"), out)).0, 0);
        assert_eq!(run(|out| handle_delete(&store, key("cfg"), out)).0, 1);
        assert_eq!(run(|out| handle_get(&store, key("cfg"), out)).0, 1);
    }

    #[test]
    fn put_rejects_malformed_json() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        let mut buf = Vec::new();
        let err = handle_put(
            &store,
            PutArgs {
                key: "x".into(),
                value: "{not json".into(),
            },
            &mut buf,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(store.list().is_empty());
    }

    #[test]
    fn list_long_and_info() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        store.save("users", &json!([{"id": 1}]));

        let (_, text) = run(|out| handle_list(&store, ListArgs { long: true }, out));
        assert!(text.starts_with("users\t"), "{text}");
        assert!(text.contains("KB"));

        let (code, text) = run(|out| handle_info(&store, key("users"), out));
        assert_eq!(code, 0);
        assert!(text.contains("\"state\": \"present\""), "{text}");

        assert_eq!(run(|out| handle_info(&store, key("nope"), out)).0, 1);
    }

    #[test]
    fn list_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("missing"));
        let (code, text) = run(|out| handle_list(&store, ListArgs { long: false }, out));
        assert_eq!(code, 0);
        assert!(text.contains("no shared records"));
    }
}
