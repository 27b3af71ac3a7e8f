//! JavaScript snippets evaluated around the user module.

/// Console that records `[level, text]` pairs into `__console_logs`.
const CONSOLE_CAPTURE: &str = r#"
var __console_logs = [];
var console = (function () {
    function format(args) {
        var parts = [];
        for (var i = 0; i < args.length; i++) {
            var arg = args[i];
            if (typeof arg === 'string') {
                parts.push(arg);
            } else if (arg !== null && typeof arg === 'object') {
                try { parts.push(JSON.stringify(arg)); } catch (e) { parts.push(String(arg)); }
            } else {
                parts.push(String(arg));
            }
        }
        return parts.join(' ');
    }
    function level(name) {
        return function () { __console_logs.push([name, format(arguments)]); };
    }
    return {
        log: level('log'),
        info: level('info'),
        debug: level('debug'),
        warn: level('warn'),
        error: level('error')
    };
})();
"#;

const CONSOLE_SILENT: &str = r#"
var __console_logs = [];
var console = (function () {
    function noop() {}
    return { log: noop, info: noop, debug: noop, warn: noop, error: noop };
})();
"#;

const COMMONJS: &str = r#"
var module = { exports: {} };
var exports = module.exports;
function require(name) {
    throw new Error("Cannot find module '" + name + "'");
}
"#;

pub(crate) fn globals(capture_console: bool) -> String {
    let console = if capture_console {
        CONSOLE_CAPTURE
    } else {
        CONSOLE_SILENT
    };
    format!("{console}{COMMONJS}")
}

/// Wrap module source in a CommonJS function scope.
///
/// The header shares the first line with the user code so engine line
/// numbers match the file.
pub(crate) fn wrap_module(code: &str) -> String {
    format!("(function (module, exports, require) {{{code}\n}})(module, exports, require);")
}

pub(crate) fn entry_point_check(entry_point: &str) -> String {
    format!("typeof module.exports['{entry_point}'] === 'function';")
}

pub(crate) const DRAIN_CONSOLE: &str = "JSON.stringify(__console_logs.splice(0));";

/// Invoke the entry point and report an envelope tagged by `status`.
///
/// `input_literal` must be a JS string literal holding the input JSON text.
pub(crate) fn invocation(entry_point: &str, input_literal: &str) -> String {
    format!(
        r#"
(function () {{
    function message(e) {{
        if (e !== null && typeof e === 'object' && e.message !== undefined) {{
            return String(e.message);
        }}
        return String(e);
    }}
    var result;
    try {{
        result = module.exports['{entry_point}'](JSON.parse({input_literal}));
    }} catch (e) {{
        return JSON.stringify({{ status: 'error', message: message(e), logs: __console_logs.splice(0) }});
    }}
    var text;
    try {{
        text = JSON.stringify(result);
    }} catch (e) {{
        return JSON.stringify({{ status: 'unserializable', message: message(e), logs: __console_logs.splice(0) }});
    }}
    return '{{"status":"ok","logs":' + JSON.stringify(__console_logs.splice(0))
        + ',"output":' + (text === undefined ? 'null' : text) + '}}';
}})();
"#
    )
}
