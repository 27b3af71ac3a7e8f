//! Python driver run with `python3 -c`.
//!
//! argv: `<module path> <entry point>`. Replies are single JSON lines tagged
//! by `status`: `ready`, `load_error`, `missing_entry_point` once after import,
//! then `ok`, `error` or `unserializable` per input line.

pub(crate) const BOOTSTRAP: &str = r#"
import importlib.util
import json
import os
import sys

channel = sys.stdout
sys.stdout = sys.stderr


def send(reply):
    channel.write(json.dumps(reply) + "\n")
    channel.flush()


def describe(exc):
    return str(exc) or type(exc).__name__


path, entry_point = sys.argv[1], sys.argv[2]
sys.path.insert(0, os.path.dirname(os.path.abspath(path)))

try:
    spec = importlib.util.spec_from_file_location("function", path)
    module = importlib.util.module_from_spec(spec)
    sys.modules["function"] = module
    spec.loader.exec_module(module)
except BaseException as exc:
    send({"status": "load_error", "message": describe(exc)})
    sys.exit(0)

entry = getattr(module, entry_point, None)
if not callable(entry):
    send({"status": "missing_entry_point"})
    sys.exit(0)

send({"status": "ready"})

for line in iter(sys.stdin.readline, ""):
    try:
        result = entry(json.loads(line))
    except BaseException as exc:
        send({"status": "error", "message": describe(exc)})
        continue
    if not isinstance(result, (dict, list, str, int, float, bool, type(None))):
        result = str(result)
    try:
        reply = json.dumps({"status": "ok", "output": result}, allow_nan=False)
    except (TypeError, ValueError, RecursionError) as exc:
        send({"status": "unserializable", "message": describe(exc)})
        continue
    channel.write(reply + "\n")
    channel.flush()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_statuses_present() {
        for status in ["ready", "load_error", "missing_entry_point", "ok", "error", "unserializable"] {
            assert!(BOOTSTRAP.contains(&format!("\"{}\"", status)), "missing status {}", status);
        }
    }
}
