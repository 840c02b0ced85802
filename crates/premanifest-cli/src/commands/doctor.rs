use super::{json_pretty, Context, EXIT_FAILURE, EXIT_SUCCESS};
use console::Style;
use premanifest_core::RuntimeLayout;
use premanifest_tools::{check_compile_prereqs, check_signing_prereqs, MissingPrereq, ToolConfig};
use serde::Serialize;

pub fn run(ctx: &Context) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();

    match ctx.tools_config() {
        Ok(config) => {
            checks.push(Check::pass("tool_config", "Tool configuration loaded"));
            check_tools(&config, &mut checks);
        }
        Err(e) => checks.push(Check::fail("tool_config", &e)),
    }

    match ctx.compiler_config() {
        Ok(config) => check_runtime(&config.layout, &mut checks),
        Err(e) => checks.push(Check::fail("runtime_root", &e)),
    }

    let all_pass = checks.iter().all(|c| c.status != "fail");
    print_results(&checks, all_pass, ctx.json)
}

fn check_tools(config: &ToolConfig, checks: &mut Vec<Check>) {
    push_prereqs(
        checks,
        "compile_tools",
        "Compile tools available (ldd, openssl)",
        &check_compile_prereqs(config),
        Check::fail,
    );
    // Compilation works without the signing tools; only `build` needs them.
    push_prereqs(
        checks,
        "signing_tools",
        "Signing tools available",
        &check_signing_prereqs(config),
        Check::warn,
    );
}

fn push_prereqs(
    checks: &mut Vec<Check>,
    name: &str,
    ok: &str,
    missing: &[MissingPrereq],
    on_missing: fn(&str, &str) -> Check,
) {
    if missing.is_empty() {
        checks.push(Check::pass(name, ok));
    } else {
        let names: Vec<&str> = missing.iter().map(|m| m.name.as_str()).collect();
        checks.push(on_missing(name, &format!("Missing: {}", names.join(", "))));
    }
}

fn check_runtime(layout: &RuntimeLayout, checks: &mut Vec<Check>) {
    if !layout.runtime_dir().is_dir() {
        checks.push(Check::fail(
            "runtime_root",
            &format!(
                "No Runtime directory under {} (pass --graphene)",
                layout.root().display()
            ),
        ));
        return;
    }
    let missing = layout.missing_files();
    if missing.is_empty() {
        checks.push(Check::pass(
            "runtime_files",
            &format!("Runtime files present in {}", layout.runtime_dir().display()),
        ));
    } else {
        let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        checks.push(Check::fail(
            "runtime_files",
            &format!("Missing runtime files: {}", names.join(", ")),
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks,
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("premanifest doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => Style::new().green().apply_to("✓"),
                "fail" => Style::new().red().apply_to("✗"),
                "warn" => Style::new().yellow().apply_to("⚠"),
                _ => Style::new().dim().apply_to("ℹ"),
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &str, status: &'static str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn complete_runtime_passes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RuntimeLayout::new(dir.path());
        fs::create_dir_all(layout.runtime_dir()).unwrap();
        for f in [
            layout.loader(),
            layout.preload_shim(),
            layout.enclave_pal(),
            layout.dynamic_linker(),
        ] {
            fs::write(f, b"").unwrap();
        }
        let mut checks = Vec::new();
        check_runtime(&layout, &mut checks);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, "pass");
    }

    #[test]
    fn missing_runtime_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut checks = Vec::new();
        check_runtime(&RuntimeLayout::new(dir.path().join("nope")), &mut checks);
        assert_eq!(checks[0].status, "fail");
        assert!(checks[0].message.contains("--graphene"));
    }

    #[test]
    fn missing_signing_tools_only_warn() {
        let config = ToolConfig {
            signer: "/nonexistent/pal-sgx-sign".to_owned(),
            token_tool: "/nonexistent/pal-sgx-get-token".to_owned(),
            ..ToolConfig::default()
        };
        let mut checks = Vec::new();
        check_tools(&config, &mut checks);
        let signing = checks.iter().find(|c| c.name == "signing_tools").unwrap();
        assert_eq!(signing.status, "warn");
        assert!(signing.message.contains("/nonexistent/pal-sgx-sign"));
    }
}
