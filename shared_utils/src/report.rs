//! Report Module
//!
//! Summary output for a finished batch run.

use crate::batch::BatchResult;
use crate::progress::format_duration;
use console::style;
use std::time::Duration;

pub fn print_summary_report(result: &BatchResult, duration: Duration, operation_name: &str) {
    println!();
    println!("╔════════════════════════════════════════════════════╗");
    println!("║  📊 {:<46} ║", format!("{} Summary Report", operation_name));
    println!("╠════════════════════════════════════════════════════╣");
    println!("║  📁 Textures Processed: {:>10}                 ║", result.total);
    println!("║  ✅ Succeeded:          {:>10}                 ║", result.succeeded);
    println!("║  ❌ Failed:             {:>10}                 ║", result.failed);
    println!("║  ⏭️  Skipped:            {:>10}                 ║", result.skipped);
    println!("║  📈 Success Rate:       {:>9.1}%                 ║", result.success_rate());
    println!("║  ⏱️  Total Time:         {:>10}                 ║", format_duration(duration));
    println!("╚════════════════════════════════════════════════════╝");

    if !result.errors.is_empty() {
        println!();
        println!("{}", style("❌ Errors encountered:").red().bold());
        for (path, error) in &result.errors {
            println!("   {} → {}", path.display(), error);
        }
    }
}

/// One-line tally on stderr, for runs whose stdout is machine-readable.
pub fn print_simple_summary(result: &BatchResult) {
    eprintln!(
        "\n✅ Complete: {} succeeded, {} failed, {} skipped (total: {})",
        result.succeeded, result.failed, result.skipped, result.total
    );
}
