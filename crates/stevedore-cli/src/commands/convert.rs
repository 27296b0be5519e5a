//! Convert command - generate a Helm chart from a compose project

use console::style;
use std::collections::BTreeMap;
use std::path::Path;
use stevedore_convert::{
    ConversionResult, ConversionWarning, ConvertOptions, WarningCategory, WarningSeverity,
    convert_with_options,
};

use crate::error::Result;

pub struct ConvertArgs<'a> {
    pub compose: &'a Path,
    pub output: &'a Path,
    pub options: ConvertOptions,
    pub verbose: bool,
}

pub fn run(args: ConvertArgs<'_>) -> Result<()> {
    let dry_run = args.options.dry_run;
    tracing::debug!(
        compose = %args.compose.display(),
        output = %args.output.display(),
        dry_run,
        "starting conversion"
    );
    print_header(args.compose, args.output);

    let result = convert_with_options(args.compose, args.output, args.options)?;

    print_files(&result, args.output);
    print_warnings(&result, args.verbose);
    print_summary(&result);
    print_next_steps(&result, args.output, dry_run);

    Ok(())
}

fn print_header(compose: &Path, output: &Path) {
    println!();
    println!(
        "  {} {} {}",
        style("Stevedore").bold().cyan(),
        style("─").dim(),
        style("compose → Helm").dim()
    );
    println!();
    println!(
        "  {} {}",
        style("Source:").dim(),
        style(compose.display()).cyan()
    );
    println!(
        "  {} {}",
        style("Target:").dim(),
        style(output.display()).green()
    );
    println!();
}

fn print_files(result: &ConversionResult, output: &Path) {
    println!("  {}", style("Generated Files").bold());
    println!("  {}", style("───────────────").dim());

    for file in &result.files {
        let rel_path = file.strip_prefix(output).unwrap_or(file);
        println!("  {} {}", style("✓").green().bold(), rel_path.display());
    }

    if !result.ignored.is_empty() {
        println!();
        println!("  {}", style("Ignored Services").bold().yellow());
        println!("  {}", style("────────────────").dim());
        for service in &result.ignored {
            println!("  {} {}", style("○").yellow(), service);
        }
    }

    println!();
}

fn print_warnings(result: &ConversionResult, verbose: bool) {
    let shown: Vec<&ConversionWarning> = result
        .warnings
        .iter()
        .filter(|w| verbose || w.severity != WarningSeverity::Info)
        .collect();

    let hidden = result.warnings.len() - shown.len();
    if shown.is_empty() {
        if hidden > 0 {
            println!(
                "  {} {} {} {}",
                style("ℹ").cyan(),
                hidden,
                style("notes").dim(),
                style("(use --verbose to see details)").dim()
            );
            println!();
        }
        return;
    }

    let mut by_category: BTreeMap<WarningCategory, Vec<&ConversionWarning>> = BTreeMap::new();
    for warning in shown {
        by_category.entry(warning.category).or_default().push(warning);
    }

    println!("  {}", style("Conversion Notes").bold());
    println!("  {}", style("────────────────").dim());
    println!();

    for (category, warnings) in by_category {
        println!("  {}", style(category.label()).yellow().bold());
        for warning in warnings {
            print_warning(warning);
        }
        println!();
    }
}

fn print_warning(warning: &ConversionWarning) {
    let icon = match warning.severity {
        WarningSeverity::Info => style(warning.severity.icon()).cyan(),
        WarningSeverity::Warning => style(warning.severity.icon()).yellow(),
    };

    println!(
        "    {} {} {}",
        icon,
        style(&warning.service).bold(),
        style(&warning.message).dim()
    );

    if let Some(ref suggestion) = warning.suggestion {
        println!("      {} {}", style("→").green(), suggestion);
    }
}

fn print_summary(result: &ConversionResult) {
    let warning_count = result
        .warnings
        .iter()
        .filter(|w| w.severity == WarningSeverity::Warning)
        .count();

    println!("  {}", style("Summary").bold());
    println!("  {}", style("───────").dim());
    println!(
        "  {} {} for chart {}",
        style(format!("{:>3}", result.resources)).green().bold(),
        style("manifests").dim(),
        style(&result.app_name).cyan()
    );

    if !result.ignored.is_empty() {
        println!(
            "  {} {} ignored",
            style(format!("{:>3}", result.ignored.len())).yellow().bold(),
            style("services").dim()
        );
    }

    if warning_count > 0 {
        println!(
            "  {} warning{} {}",
            style(format!("{:>3}", warning_count)).yellow().bold(),
            if warning_count == 1 { "" } else { "s" },
            style("(review recommended)").dim()
        );
    }

    println!();
}

fn print_next_steps(result: &ConversionResult, output: &Path, dry_run: bool) {
    if dry_run {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        );
        println!();
        return;
    }

    println!("  {}", style("Next Steps").bold());
    println!("  {}", style("──────────").dim());
    println!(
        "  {} {}",
        style("1.").dim(),
        style(format!("helm lint {}", output.display())).cyan()
    );
    println!("     {}", style("Validate the generated chart").dim());
    println!();
    println!(
        "  {} {}",
        style("2.").dim(),
        style(format!("helm template {} {}", result.app_name, output.display())).cyan()
    );
    println!("     {}", style("Render the manifests with the default values").dim());
    println!();
}
