//! Build script for physthread-runtime
//!
//! Merges pool configuration defaults:
//! 1. Start with library defaults
//! 2. If PHYS_CONFIG_RS names a file, read `pub const NAME: TYPE = VALUE;` lines from it
//! 3. Known names override the defaults, unknown names produce a cargo warning
//! 4. Write OUT_DIR/phys_merged_config.rs, included by `config::defaults`

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam { name: "NUM_THREADS", rust_type: "usize", default_value: "8" },
    ConfigParam { name: "THREAD_STACK_SIZE", rust_type: "usize", default_value: "256 * 1024" },
    ConfigParam { name: "PIN_THREADS", rust_type: "bool", default_value: "true" },
    ConfigParam { name: "ELEVATE_PRIORITY", rust_type: "bool", default_value: "true" },
    ConfigParam { name: "UNIQUE_NAME", rust_type: "&str", default_value: "\"physworker\"" },
    ConfigParam { name: "SCRATCH_BYTES", rust_type: "usize", default_value: "16 * 1024" },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("phys_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("PHYS_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);
        match fs::read_to_string(path) {
            Ok(content) => {
                for unknown in merge_overrides(&content, &mut config) {
                    println!("cargo:warning=Unknown config parameter: {}", unknown);
                }
                println!("cargo:warning=Using custom pool config: {}", path);
            }
            Err(e) => println!("cargo:warning=Failed to read PHYS_CONFIG_RS ({}): {}", path, e),
        }
    }
    println!("cargo:rerun-if-env-changed=PHYS_CONFIG_RS");

    let output = render(&config, user_path.as_deref());
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Apply overrides from a user config file; returns names that were not recognised
fn merge_overrides(content: &str, config: &mut HashMap<&'static str, String>) -> Vec<String> {
    let mut unknown = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };
        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => unknown.push(name),
        }
    }
    unknown
}

/// Parse `pub const NAME: TYPE = VALUE;` into (NAME, VALUE)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();
    let (name, rest) = rest.split_once(':')?;
    let (_, value) = rest.split_once('=')?;
    let value = value.trim().trim_end_matches(';').trim();
    if value.is_empty() {
        return None;
    }
    Some((name.trim().to_string(), value.to_string()))
}

fn render(config: &HashMap<&str, String>, user_path: Option<&str>) -> String {
    let mut output = String::from("// Auto-generated by build.rs - do not edit\n");
    match user_path {
        Some(p) => output.push_str(&format!("// Library defaults merged with {}\n\n", p)),
        None => output.push_str("// Library defaults\n\n"),
    }
    for param in CONFIG_PARAMS {
        let value = config.get(param.name).map(String::as_str).unwrap_or(param.default_value);
        let ty = if param.rust_type == "&str" { "&'static str" } else { param.rust_type };
        output.push_str(&format!("pub const {}: {} = {};\n", param.name, ty, value));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_const_line() {
        assert_eq!(
            parse_const_line("pub const NUM_THREADS: usize = 4;"),
            Some(("NUM_THREADS".into(), "4".into()))
        );
        assert_eq!(
            parse_const_line("pub const THREAD_STACK_SIZE: usize = 1024 * 1024;"),
            Some(("THREAD_STACK_SIZE".into(), "1024 * 1024".into()))
        );
        assert_eq!(parse_const_line("const NUM_THREADS: usize = 4;"), None);
        assert_eq!(parse_const_line("pub const NUM_THREADS: usize = ;"), None);
    }

    #[test]
    fn test_merge_overrides_reports_unknown() {
        let mut config: HashMap<&'static str, String> = HashMap::new();
        config.insert("NUM_THREADS", "8".into());

        let user = r#"
            // four workers on the build box
            pub const NUM_THREADS: usize = 4;
            pub const MYSTERY: u8 = 1;
        "#;

        let unknown = merge_overrides(user, &mut config);
        assert_eq!(config.get("NUM_THREADS"), Some(&"4".to_string()));
        assert_eq!(unknown, vec!["MYSTERY".to_string()]);
    }
}
