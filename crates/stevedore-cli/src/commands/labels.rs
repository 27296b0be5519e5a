//! Labels command - describe the label vocabulary

use console::style;
use stevedore_convert::{LabelKind, suggest_label};
use stevedore_core::LABEL_PREFIX;

use crate::error::{CliError, Result};

pub fn run(name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        print_all();
        return Ok(());
    };

    // accept both `ports` and `stevedore.io/ports`
    let bare = name
        .strip_prefix(LABEL_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name);

    match LabelKind::from_name(bare) {
        Some(kind) => {
            print_label(kind);
            Ok(())
        }
        None => Err(CliError::UnknownLabel {
            name: name.to_string(),
            help: suggest_label(bare).map(|kind| format!("did you mean '{}'?", kind.name())),
        }),
    }
}

fn print_all() {
    println!();
    println!("  {}", style("Labels").bold());
    println!("  {}", style("──────").dim());
    for kind in LabelKind::ALL {
        println!(
            "  {} {}",
            style(format!("{:<30}", kind.key())).cyan(),
            style(kind.summary()).dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Run `stevedore labels <name>` for the value format").dim()
    );
    println!();
}

fn print_label(kind: LabelKind) {
    println!();
    println!("  {}", style(kind.key()).bold().cyan());
    println!("  {}", kind.summary());
    println!();
    for line in kind.long_help().lines() {
        println!("    {}", line);
    }
    println!();
}
