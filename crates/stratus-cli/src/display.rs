use colored::Colorize;
use stratus_core::{Mismatch, PriceScorer, RankedTemplate, TemplateCandidate};
use stratus_utils::{format_elapsed, format_price, CidrBlock, PollOutcome, PollState};

/// Table formatting utilities
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_widths: Vec<usize>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        let max_widths = headers.iter().map(|h| h.chars().count()).collect();
        Self {
            headers,
            rows: Vec::new(),
            max_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.max_widths.len() {
                self.max_widths[i] = self.max_widths[i].max(cell.chars().count());
            }
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        self.print_separator('┌', '┬', '┐');
        self.print_header();
        self.print_separator('├', '┼', '┤');

        for row in &self.rows {
            self.print_row(row);
        }

        self.print_separator('└', '┴', '┘');
    }

    fn print_separator(&self, left: char, middle: char, right: char) {
        let segments: Vec<String> = self
            .max_widths
            .iter()
            .map(|&width| "─".repeat(width + 2))
            .collect();
        println!("{}{}{}", left, segments.join(&middle.to_string()), right);
    }

    fn print_header(&self) {
        print!("│");
        for (i, header) in self.headers.iter().enumerate() {
            print!(" {:<width$} │", header.bold(), width = self.max_widths[i]);
        }
        println!();
    }

    fn print_row(&self, row: &[String]) {
        print!("│");
        for (i, cell) in row.iter().enumerate() {
            let width = self.max_widths.get(i).copied().unwrap_or(0);
            print!(" {:<width$} │", cell, width = width);
        }
        println!();
    }
}

/// Display host ranges of parsed CIDR blocks
pub fn display_host_ranges(blocks: &[CidrBlock]) {
    let mut table = Table::new(vec![
        "CIDR".to_string(),
        "Netmask".to_string(),
        "First host".to_string(),
        "Last host".to_string(),
        "Hosts".to_string(),
    ]);

    for block in blocks {
        let range = block.host_range();
        table.add_row(vec![
            block.to_string(),
            block.netmask().to_string(),
            range.first().to_string(),
            range.last().to_string(),
            range.len().to_string(),
        ]);
    }

    table.print();
}

/// Display ranked templates; the price column follows the given price scorer
pub fn display_ranked_templates(ranked: &[RankedTemplate], pricing: &PriceScorer) {
    if ranked.is_empty() {
        println!("{}", "No template satisfies the requirement.".yellow());
        return;
    }

    let price_header = match pricing.commitment_months {
        Some(months) => format!("$/mo ({}m)", months),
        None => "$/hr".to_string(),
    };

    let mut table = Table::new(vec![
        "Rank".to_string(),
        "ID".to_string(),
        "Name".to_string(),
        "Arch".to_string(),
        "CPU".to_string(),
        "RAM (GB)".to_string(),
        "GPU".to_string(),
        "GPU RAM (GB)".to_string(),
        price_header,
        "Score".to_string(),
    ]);

    for (i, entry) in ranked.iter().enumerate() {
        let c = &entry.candidate;
        let rank = if i == 0 {
            "1".green().bold().to_string()
        } else {
            (i + 1).to_string()
        };

        table.add_row(vec![
            rank,
            c.id.clone(),
            c.name.clone(),
            c.architecture.to_string(),
            format!("{} @ {:.1}GHz", c.resources.cpu_cores, c.resources.cpu_frequency_ghz),
            format!("{:.0}", c.resources.memory_gb),
            c.resources.gpu_count.to_string(),
            format!("{:.0}", c.resources.gpu_memory_gb),
            format_price(pricing.effective_price(c)),
            format_score(entry.score),
        ]);
    }

    table.print();
}

/// Display why each excluded template failed the requirement
pub fn display_exclusions(excluded: &[(&TemplateCandidate, Vec<Mismatch>)]) {
    if excluded.is_empty() {
        return;
    }

    println!("\n{}", "Excluded templates:".bold());
    for (candidate, mismatches) in excluded {
        let reasons: Vec<String> = mismatches.iter().map(|m| m.to_string()).collect();
        println!(
            "  {} {} ({})",
            "✗".red(),
            candidate.id.bold(),
            reasons.join("; ")
        );
    }
}

/// Display the outcome of labelled polls
pub fn display_poll_outcomes<T, E: std::fmt::Display>(outcomes: &[(String, PollOutcome<T, E>)]) {
    let mut table = Table::new(vec![
        "Probe".to_string(),
        "State".to_string(),
        "Attempts".to_string(),
        "Elapsed".to_string(),
        "Last error".to_string(),
    ]);

    for (label, outcome) in outcomes {
        let state = match outcome.state() {
            PollState::Converged => "converged".green().to_string(),
            PollState::TimedOut => "timed out".red().to_string(),
            PollState::Cancelled => "cancelled".yellow().to_string(),
        };
        let last_error = match (&outcome.result, outcome.error()) {
            (None, _) => "no attempt completed".to_string(),
            (_, Some(e)) => e.to_string(),
            _ => "-".to_string(),
        };

        table.add_row(vec![
            label.clone(),
            state,
            outcome.attempts.to_string(),
            format_elapsed(outcome.elapsed),
            last_error,
        ]);
    }

    table.print();
}

fn format_score(score: f64) -> String {
    if score.is_finite() {
        format!("{:.2}", score)
    } else {
        "∞".to_string()
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
