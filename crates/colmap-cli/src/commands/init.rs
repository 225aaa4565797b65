//! Initialize a new colmap project

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join("colmap.yaml").exists() {
        anyhow::bail!(
            "Directory '{}' already contains a colmap.yaml",
            project_dir.display()
        );
    }

    tracing::info!("Creating new colmap project: {}", project_name);

    fs::create_dir_all(project_dir.join("catalogs"))?;
    fs::create_dir_all(project_dir.join("sessions"))?;
    fs::create_dir_all(project_dir.join("patterns"))?;

    let config = format!(
        r#"# colmap Project Configuration
name: {project_name}
version: "0.1.0"

catalogs:
  dir: catalogs
  source: customers
  target: crm

preview:
  page_size: 10

patterns_dir: patterns
outbox_dir: outbox
"#
    );
    fs::write(project_dir.join("colmap.yaml"), config)?;

    // Source catalog: inferred types plus sample values for previews
    let source = r#"# Uploaded file: field name -> inferred type
file_id: 1

fields:
  cust_name: text
  cust_email: text
  cust_age: number
  signup_date: date
  newsletter: boolean

samples:
  cust_name: [Alice Johnson, Bob Smith, Carol Williams]
  cust_email: [alice@example.com, bob@example.com, carol@example.com]
  cust_age: ["34", "27", "45"]
"#;
    fs::write(project_dir.join("catalogs/customers.yaml"), source)?;

    let target = r#"# Target file columns
columns:
  - full_name
  - display_name
  - email
  - age
  - created_on
"#;
    fs::write(project_dir.join("catalogs/crm.yaml"), target)?;

    let session = r#"# Example session
- add:
    source: cust_name
    targets: [full_name, display_name]
- add:
    source: cust_email
    targets: [email]
- add:
    source: cust_age
    targets: [age]
    type: number
- add:
    source: signup_date
    targets: [created_on]
    type: date
- rename:
    from: display_name
    to: nickname
- save: Customers to CRM
"#;
    fs::write(project_dir.join("sessions/example.yaml"), session)?;

    let gitignore = r#"# colmap submissions
outbox/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  colmap validate              # Check configuration");
    tracing::info!("  colmap run example --save    # Replay the example session");

    Ok(())
}
