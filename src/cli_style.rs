use crate::checks::CheckReport;
use crate::pipeline::PhaseReport;
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Blue)));
    let good = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const ACCENT: Color = Color::Rgb {
        r: 100,
        g: 149,
        b: 237,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 200,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
}

mod box_chars {
    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// Status Lines
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let left = SECTION_WIDTH.saturating_sub(title_len + 2) / 2;
    let right = SECTION_WIDTH.saturating_sub(title_len + 2 + left);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::TOP_LEFT.with(colors::ACCENT),
        box_chars::HORIZONTAL.repeat(left).with(colors::ACCENT),
        title.with(colors::ACCENT).bold().attribute(Attribute::Italic),
        box_chars::HORIZONTAL.repeat(right).with(colors::ACCENT),
        box_chars::TOP_RIGHT.with(colors::ACCENT),
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::BOTTOM_LEFT.with(colors::ACCENT),
        box_chars::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::ACCENT),
        box_chars::BOTTOM_RIGHT.with(colors::ACCENT),
    );
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn col_widths(&self) -> &[usize] {
        &self.col_widths
    }

    fn border(&self, left: &str, junction: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| box_chars::HORIZONTAL.repeat(w + 2))
            .collect();
        format!("{}{}{}", left, segments.join(junction), right)
    }

    fn line(&self, cells: &[String]) -> String {
        let mut line = String::from(box_chars::VERTICAL);
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = width.saturating_sub(cell.width());
            line.push_str(&format!(" {}{} {}", cell, " ".repeat(padding), box_chars::VERTICAL));
        }
        line
    }

    /// Plain text lines of the table, without colors.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.border(box_chars::TOP_LEFT, box_chars::T_TOP, box_chars::TOP_RIGHT),
            self.line(&self.headers),
            self.border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT),
        ];
        lines.extend(self.rows.iter().map(|row| self.line(row)));
        lines.push(self.border(
            box_chars::BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::BOTTOM_RIGHT,
        ));
        lines
    }

    pub fn print(&self) {
        for (i, line) in self.lines().into_iter().enumerate() {
            // Header row stands out, the rest is plain
            if i == 1 {
                println!("{}", line.with(colors::ACCENT).bold());
            } else {
                println!("{}", line);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_phase_reports(reports: &[PhaseReport]) {
    for report in reports {
        print_section_header(&format!(
            "{} ({} UTC)",
            report.phase,
            report.started_at.format("%H:%M:%S")
        ));
        let mut table = TableBuilder::new(&["statement", "rows", "elapsed"]);
        for statement in &report.statements {
            table.add_row(vec![
                statement.label.clone(),
                statement.rows_affected.to_string(),
                format!("{:.2?}", statement.elapsed),
            ]);
        }
        table.print();
        println!(
            "  {}",
            format!(
                "{} rows in {:.2?}",
                report.total_rows(),
                report.elapsed()
            )
            .with(colors::DIM)
        );
        print_section_footer();
    }
}

pub fn print_check_report(report: &CheckReport) {
    print_section_header("data quality");
    let mut table = TableBuilder::new(&["check", "violations", "status"]);
    for result in &report.results {
        let status = if result.passed() { "ok" } else { "FAILED" };
        table.add_row(vec![
            result.name.clone(),
            result.violations.to_string(),
            status.to_string(),
        ]);
    }
    table.print();
    print_section_footer();

    if report.passed() {
        print_success("All data quality checks passed");
    } else {
        for failure in report.failures() {
            print_error(&format!(
                "{}: {} ({} violations)",
                failure.name, failure.description, failure.violations
            ));
        }
    }
}
