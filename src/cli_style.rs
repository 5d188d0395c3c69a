//! Terminal styling and ASCII art for BeatBrains

use owo_colors::OwoColorize;

/// Check if terminal supports colors
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Get the BeatBrains ASCII art banner
pub fn get_banner() -> &'static str {
    r#"
  ____             _   ____            _
 | __ )  ___  __ _| |_| __ ) _ __ __ _(_)_ __  ___
 |  _ \ / _ \/ _` | __|  _ \| '__/ _` | | '_ \/ __|
 | |_) |  __/ (_| | |_| |_) | | | (_| | | | | \__ \
 |____/ \___|\__,_|\__|____/|_|  \__,_|_|_| |_|___/

            ♪  Text to Song with Bark AI Singing  ♪
"#
}

/// Print the banner with gradient colors
pub fn print_banner() {
    let banner = get_banner();

    if supports_color() {
        for (i, line) in banner.lines().enumerate() {
            match i % 6 {
                0 => println!("{}", line.bright_magenta()),
                1 => println!("{}", line.magenta()),
                2 => println!("{}", line.bright_blue()),
                3 => println!("{}", line.blue()),
                4 => println!("{}", line.cyan()),
                _ => println!("{}", line.bright_cyan()),
            }
        }
    } else {
        println!("{}", banner);
    }
}

/// Print a styled box with title
pub fn print_box(title: &str, content: &[(&str, String)]) {
    let width: usize = 60;
    let title_width = title.chars().count() + 4;
    let padding = width.saturating_sub(title_width) / 2;

    println!("╔{}╗", "═".repeat(width));
    if supports_color() {
        println!("║{}{}", " ".repeat(padding), title.bright_cyan().bold());
    } else {
        println!("║{}{}", " ".repeat(padding), title);
    }
    println!("╠{}╣", "═".repeat(width));

    for (label, value) in content {
        let plain = format!("  {}: {}", label, value);
        let spaces = width.saturating_sub(plain.chars().count());
        if supports_color() {
            println!("║  {}: {}{}║", label.bright_blue(), value, " ".repeat(spaces));
        } else {
            println!("║{}{}║", plain, " ".repeat(spaces));
        }
    }

    println!("╚{}╝", "═".repeat(width));
}

/// Print a section header
pub fn print_section(title: &str) {
    if supports_color() {
        println!("\n{}", "━".repeat(60).bright_black());
        println!("  {}", title.bright_cyan().bold());
        println!("{}", "━".repeat(60).bright_black());
    } else {
        println!("\n{}", "━".repeat(60));
        println!("  {}", title);
        println!("{}", "━".repeat(60));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    if supports_color() {
        println!("{} {}", "✓".bright_green().bold(), message.green());
    } else {
        println!("[OK] {}", message);
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    if supports_color() {
        eprintln!("{} {}", "✗".bright_red().bold(), message.red());
    } else {
        eprintln!("[ERR] {}", message);
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    if supports_color() {
        println!("{} {}", "⚠".bright_yellow().bold(), message.yellow());
    } else {
        println!("[WARN] {}", message);
    }
}

/// Print an info message
pub fn print_info(message: &str) {
    if supports_color() {
        println!("{} {}", "ℹ".bright_blue().bold(), message.bright_white());
    } else {
        println!("[INFO] {}", message);
    }
}

/// Print startup info for server
pub fn print_server_startup(host: &str, port: u16, content: &[(&str, String)]) {
    print_banner();
    print_box("Server Configuration", content);

    println!();
    print_success(&format!("Server ready at http://{}:{}/", host, port));
    println!();

    if supports_color() {
        println!("{}", "Press Ctrl+C to stop".bright_black());
    } else {
        println!("Press Ctrl+C to stop");
    }
}
