//! The `madrasa init` command: write a starter config.

use std::path::Path;

use anyhow::Result;

const STARTER_CONFIG: &str = r#"# madrasa client configuration
base_url = "http://localhost:8000"
request_timeout_secs = 30

# Sign in by filling in both fields; leave them out to take tests as a guest.
# A guest identity is derived from your display name and a per-device token,
# so the platform can still recognize retakes from this machine.
# email = "student@example.com"
# display_name = "Student Name"
"#;

pub fn execute() -> Result<()> {
    let path = Path::new("madrasa.toml");
    if path.exists() {
        println!("madrasa.toml already exists, skipping");
        return Ok(());
    }
    std::fs::write(path, STARTER_CONFIG)?;
    println!("Created madrasa.toml");
    println!("Edit base_url to point at your platform, then run: madrasa take --test-id <id>");
    Ok(())
}
