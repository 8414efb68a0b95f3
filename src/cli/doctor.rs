use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::config::{apply_env_overrides, default_config_path, load_config, Config};

#[derive(Debug)]
enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

impl CheckResult {
    fn label(&self) -> &'static str {
        match self {
            Self::Pass(_) => "PASS",
            Self::Fail(_) => "FAIL",
            Self::Skip(_) => "SKIP",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Pass(s) | Self::Fail(s) | Self::Skip(s) => s,
        }
    }

    fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let label = result.label();
    let detail = result.detail();
    println!("  {:<6} {:<30} {}", label, name, detail);
}

fn effective_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = load_config(config_path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

fn check_config_file(config_path: Option<&Path>) -> CheckResult {
    let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
    if path.exists() {
        CheckResult::Pass(format!("{}", path.display()))
    } else {
        CheckResult::Skip(format!("{} not found (defaults in effect)", path.display()))
    }
}

fn check_config_parses(config_path: Option<&Path>) -> CheckResult {
    match load_config(config_path) {
        Ok(_) => CheckResult::Pass("valid JSON".to_string()),
        Err(e) => CheckResult::Fail(format!("{}", e)),
    }
}

fn check_spool_root(config_path: Option<&Path>) -> CheckResult {
    let Ok(config) = effective_config(config_path) else {
        return CheckResult::Skip("config not available".to_string());
    };
    let path = config.spool_root();
    if let Err(e) = std::fs::create_dir_all(&path) {
        return CheckResult::Fail(format!("{} (cannot create: {})", path.display(), e));
    }
    let test_file = path.join(".doctor_test");
    match std::fs::write(&test_file, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&test_file);
            CheckResult::Pass(format!("{} (writable)", path.display()))
        }
        Err(e) => CheckResult::Fail(format!("{} (not writable: {})", path.display(), e)),
    }
}

// The token itself is never printed.
fn check_bot_token(config_path: Option<&Path>) -> CheckResult {
    let Ok(config) = effective_config(config_path) else {
        return CheckResult::Skip("config not available".to_string());
    };
    if config.telegram.token.is_empty() {
        CheckResult::Fail("empty (set telegram.token or MEDIARELAY_TELEGRAM_TOKEN)".to_string())
    } else {
        CheckResult::Pass("configured".to_string())
    }
}

fn check_allowed_origin(config_path: Option<&Path>) -> CheckResult {
    let Ok(config) = effective_config(config_path) else {
        return CheckResult::Skip("config not available".to_string());
    };
    if config.policy.allowed_origin.is_empty() {
        CheckResult::Skip("not set (submissions with browser headers are refused)".to_string())
    } else {
        CheckResult::Pass(config.policy.allowed_origin)
    }
}

fn check_caption(config_path: Option<&Path>) -> CheckResult {
    let Ok(config) = effective_config(config_path) else {
        return CheckResult::Skip("config not available".to_string());
    };
    if config.policy.caption.is_empty() {
        CheckResult::Skip("empty (no caption attached to relayed media)".to_string())
    } else {
        CheckResult::Pass(format!("{:?}", config.policy.caption))
    }
}

async fn check_api_reachability(config_path: Option<&Path>) -> CheckResult {
    let Ok(config) = effective_config(config_path) else {
        return CheckResult::Skip("config not available".to_string());
    };
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => return CheckResult::Fail(format!("cannot build client: {}", e)),
    };
    let base = config.telegram.api_base.trim_end_matches('/').to_string();
    let start = std::time::Instant::now();
    match client.get(&base).send().await {
        Ok(resp) => {
            let elapsed = start.elapsed();
            CheckResult::Pass(format!(
                "{} (HTTP {}, {:.0}ms)",
                base,
                resp.status().as_u16(),
                elapsed.as_secs_f64() * 1000.0
            ))
        }
        Err(e) => CheckResult::Fail(format!("{} ({})", base, e)),
    }
}

pub async fn doctor_command(config_path: Option<&Path>) -> Result<()> {
    println!("mediarelay doctor\n");
    println!("{}", "=".repeat(60));

    let mut pass_count = 0u32;
    let mut fail_count = 0u32;
    let mut skip_count = 0u32;

    let mut record = |name: &str, result: &CheckResult| {
        print_check(name, result);
        match result {
            CheckResult::Pass(_) => pass_count += 1,
            CheckResult::Fail(_) => fail_count += 1,
            CheckResult::Skip(_) => skip_count += 1,
        }
    };

    println!("\n  Core");
    println!("  {}", "-".repeat(56));

    let r = check_config_file(config_path);
    record("Config file", &r);

    let r = check_config_parses(config_path);
    record("Config parses", &r);

    let r = check_spool_root(config_path);
    record("Spool root", &r);

    println!("\n  Relay");
    println!("  {}", "-".repeat(56));

    let token_check = check_bot_token(config_path);
    record("Bot token", &token_check);

    let r = check_allowed_origin(config_path);
    record("Allowed origin", &r);

    let r = check_caption(config_path);
    record("Caption", &r);

    let r = check_api_reachability(config_path).await;
    record("API endpoint", &r);

    println!("\n{}", "=".repeat(60));
    println!(
        "  {} passed, {} failed, {} skipped",
        pass_count, fail_count, skip_count
    );

    if fail_count > 0 {
        println!("\n  Some checks failed. Review the output above.");
    } else {
        println!("\n  All checks passed!");
    }

    // No relay can happen without a token.
    if token_check.is_fail() {
        anyhow::bail!("critical checks failed");
    }

    Ok(())
}
