//! Human and JSON rendering of a scenario report

use anyhow::{Context, Result};
use colored::Colorize;

use crate::scenario::{ScenarioReport, TradeResult};

pub fn to_json(report: &ScenarioReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

pub fn print(report: &ScenarioReport) {
    println!("{}", "=== Scenario Report ===".bright_green().bold());
    println!("{} {}", "Fund:".bright_cyan(), report.fund.address);
    println!("{} {}", "Starting version:".bright_cyan(), report.initial_version);

    if !report.trades.is_empty() {
        println!("\n{}", "Trades:".bright_yellow());
    }
    for trade in &report.trades {
        let id = trade
            .trade_id
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "-".to_string());
        let status = match trade.result {
            TradeResult::Settled => "settled".green(),
            TradeResult::Reverted => "reverted".red(),
            TradeResult::Rejected => "rejected".yellow(),
        };
        println!(
            "  {} {} {} {} -> >= {} {} ({} bidder {})",
            "├─".dimmed(),
            id,
            trade.sell_amount,
            trade.sell,
            trade.min_buy,
            trade.buy,
            trade.behavior,
            trade.bidder
        );
        match (trade.delivered, &trade.error) {
            (Some(delivered), _) => println!("  {}   {} received {} {}", "│".dimmed(), status, delivered, trade.buy),
            (None, Some(error)) => println!("  {}   {}: {}", "│".dimmed(), status, error),
            (None, None) => println!("  {}   {}", "│".dimmed(), status),
        }
        if let Some(note) = &trade.note {
            println!("  {}   {}", "│".dimmed(), note.dimmed());
        }
    }

    if let Some(migration) = &report.migration {
        println!("\n{}", "Migration:".bright_yellow());
        println!("  {} {}", "Spell:".bright_cyan(), migration.spell);
        println!("  {} {}", "Caller:".bright_cyan(), migration.caller);
        if migration.cast {
            println!(
                "  {} {} -> {}",
                "✓".green(),
                migration.from_version,
                migration.to_version
            );
            println!(
                "  {} {} member(s) migrated: {}",
                "Roles:".bright_cyan(),
                migration.migrated_members.len(),
                migration.migrated_members.join(", ")
            );
        } else {
            let error = migration.error.as_deref().unwrap_or("unknown failure");
            println!("  {} {}", "✗".red(), error);
        }
    }

    println!("\n{}", "Final state:".bright_yellow());
    println!("  {} {}", "Version:".bright_cyan(), report.fund.version);
    println!("  {} {}", "Trade approval role:".bright_cyan(), report.fund.trade_approval_role);
    println!("  {} {}", "Proxy owner:".bright_cyan(), report.fund.proxy_owner);
    for (token, amount) in &report.fund.holdings {
        println!("  {} {} {}", "Holds:".bright_cyan(), amount, token);
    }
    for (role, members) in &report.fund.roles {
        println!("  {} {} [{}]", "Role:".bright_cyan(), role, members.join(", "));
    }
}
