//! Integration tests for CLI commands

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run stevedore command
fn stevedore(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_stevedore"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute stevedore")
}

const COMPOSE: &str = r#"
name: blog
services:
  web:
    image: ghost:5.80
    ports:
      - "2368"
    environment:
      url: http://blog.local
      database__connection__password: secret
    depends_on:
      - db
    labels:
      stevedore.io/main-app: "true"
      stevedore.io/secrets: |
        - database__connection__password
      stevedore.io/ingress: |
        hostname: blog.local
  db:
    image: mysql:8
    environment:
      MYSQL_DATABASE: ghost
"#;

fn create_project(dir: &Path, compose: &str) {
    fs::write(dir.join("compose.yaml"), compose).unwrap();
}

mod convert_command {
    use super::*;

    #[test]
    fn test_convert_project() {
        let project = TempDir::new().unwrap();
        create_project(project.path(), COMPOSE);
        let chart = project.path().join("chart");

        let output = stevedore(&[
            "convert",
            "-c",
            project.path().join("compose.yaml").to_str().unwrap(),
            "-o",
            chart.to_str().unwrap(),
        ]);

        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Generated Files"));
        assert!(stdout.contains("templates/web/deployment.yaml"));

        assert!(chart.join("Chart.yaml").is_file());
        assert!(chart.join("templates/web/secret.yaml").is_file());
        assert!(chart.join("templates/web/ingress.yaml").is_file());
        assert!(chart.join("templates/db/configmap.yaml").is_file());

        let chart_yaml = fs::read_to_string(chart.join("Chart.yaml")).unwrap();
        assert!(chart_yaml.contains("name: blog"));
        assert!(chart_yaml.contains("appVersion: '5.80'") || chart_yaml.contains("appVersion: \"5.80\""));
    }

    #[test]
    fn test_convert_with_chart_options() {
        let project = TempDir::new().unwrap();
        create_project(project.path(), COMPOSE);
        let chart = project.path().join("chart");

        let output = stevedore(&[
            "convert",
            "-c",
            project.path().to_str().unwrap(),
            "-o",
            chart.to_str().unwrap(),
            "-n",
            "my-blog",
            "--chart-version",
            "1.0.0",
            "-a",
            "2.0.0",
            "--description",
            "A blog",
        ]);
        assert!(output.status.success());

        let chart_yaml = fs::read_to_string(chart.join("Chart.yaml")).unwrap();
        assert!(chart_yaml.contains("name: my-blog"));
        assert!(chart_yaml.contains("version: 1.0.0"));
        assert!(chart_yaml.contains("appVersion: 2.0.0"));
        assert!(chart_yaml.contains("description: A blog"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let project = TempDir::new().unwrap();
        create_project(project.path(), COMPOSE);
        let chart = project.path().join("chart");

        let output = stevedore(&[
            "convert",
            "-c",
            project.path().to_str().unwrap(),
            "-o",
            chart.to_str().unwrap(),
            "--dry-run",
        ]);
        assert!(output.status.success());
        assert!(!chart.exists());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Dry run mode"));
    }

    #[test]
    fn test_existing_output_requires_force() {
        let project = TempDir::new().unwrap();
        create_project(project.path(), COMPOSE);
        let chart = project.path().join("chart");
        fs::create_dir_all(&chart).unwrap();

        let args = [
            "convert",
            "-c",
            project.path().to_str().unwrap(),
            "-o",
            chart.to_str().unwrap(),
        ];
        let output = stevedore(&args);
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

        let mut forced = args.to_vec();
        forced.push("--force");
        assert!(stevedore(&forced).status.success());
        assert!(chart.join("Chart.yaml").is_file());
    }

    #[test]
    fn test_label_error_is_a_config_error() {
        let project = TempDir::new().unwrap();
        create_project(
            project.path(),
            r#"
services:
  web:
    image: nginx
    labels:
      stevedore.io/ports: "not-a-port"
"#,
        );
        let chart = project.path().join("chart");

        let output = stevedore(&[
            "convert",
            "-c",
            project.path().to_str().unwrap(),
            "-o",
            chart.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("stevedore.io/ports"));
        assert!(!chart.exists());
    }

    #[test]
    fn test_unknown_label_suggests() {
        let project = TempDir::new().unwrap();
        create_project(
            project.path(),
            r#"
services:
  web:
    image: nginx
    labels:
      stevedore.io/secret: "- FOO"
"#,
        );

        let output = stevedore(&[
            "convert",
            "-c",
            project.path().to_str().unwrap(),
            "-o",
            project.path().join("chart").to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("stevedore.io/secrets"));
    }

    #[test]
    fn test_missing_compose_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let output = stevedore(&[
            "convert",
            "-c",
            dir.path().to_str().unwrap(),
            "-o",
            dir.path().join("chart").to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod labels_command {
    use super::*;

    #[test]
    fn test_list_labels() {
        let output = stevedore(&["labels"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for label in ["ports", "ingress", "secrets", "map-env", "configmap-files", "ignore", "values"] {
            assert!(stdout.contains(&format!("stevedore.io/{}", label)), "missing {}", label);
        }
    }

    #[test]
    fn test_describe_label() {
        let output = stevedore(&["labels", "stevedore.io/ingress"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hostname"));
    }

    #[test]
    fn test_unknown_label() {
        let output = stevedore(&["labels", "portz"]);
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("ports"));
    }
}

mod version_command {
    use super::*;

    #[test]
    fn test_version() {
        let output = stevedore(&["version"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("stevedore"));
    }
}
